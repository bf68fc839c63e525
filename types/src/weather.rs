use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse weather classification shown by the weather widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherKind {
    Cloudy,

    Overcast,

    Rain,

    Sunny,
}

impl WeatherKind {
    /// Classify a WMO weather interpretation code.
    ///
    /// Codes without an icon of their own (fog, snow, storms) fall back to
    /// `Sunny`, which draws nothing.
    #[must_use]
    pub const fn from_wmo(code: i64) -> Self {
        match code {
            1 | 2 => Self::Cloudy,
            3 => Self::Overcast,
            51 | 53 | 55 | 56 | 57 | 61 | 63 | 65 | 66 | 67 => Self::Rain,
            _ => Self::Sunny,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cloudy => "cloudy",
            Self::Overcast => "overcast",
            Self::Rain => "rain",
            Self::Sunny => "sunny",
        }
    }
}

impl fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_wmo() {
        assert_eq!(WeatherKind::from_wmo(0), WeatherKind::Sunny);
        assert_eq!(WeatherKind::from_wmo(1), WeatherKind::Cloudy);
        assert_eq!(WeatherKind::from_wmo(2), WeatherKind::Cloudy);
        assert_eq!(WeatherKind::from_wmo(3), WeatherKind::Overcast);
        assert_eq!(WeatherKind::from_wmo(61), WeatherKind::Rain);
        assert_eq!(WeatherKind::from_wmo(57), WeatherKind::Rain);
        assert_eq!(WeatherKind::from_wmo(67), WeatherKind::Rain);
    }

    #[test]
    fn test_unknown_codes_are_sunny() {
        // fog, snow and thunderstorms have no icon
        for code in [45, 71, 95, 99, -1, 1000] {
            assert_eq!(WeatherKind::from_wmo(code), WeatherKind::Sunny);
        }
    }

    #[test]
    fn test_serde_names_match_asset_names() {
        let json = serde_json::to_string(&WeatherKind::Overcast).unwrap();
        assert_eq!(json, "\"overcast\"");
        assert_eq!(WeatherKind::Rain.to_string(), "rain");
    }
}
