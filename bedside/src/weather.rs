use std::time::Duration;

use serde::Deserialize;
use types::WeatherKind;

use crate::config::Location;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("weather payload has no weather code for today")]
    MissingCode,
}

/// Anything that can tell today's weather at a location.
pub trait WeatherSource: Send + Sync {
    fn lookup(
        &self,
        location: Location,
    ) -> impl Future<Output = Result<WeatherKind, WeatherError>> + Send;
}

/// An Open-Meteo daily forecast response.
#[derive(Debug, Deserialize)]
pub struct Forecast {
    daily: Daily,
}

#[derive(Debug, Deserialize)]
struct Daily {
    weather_code: Vec<Option<i64>>,
}

impl Forecast {
    /// Classify the first forecast day.
    ///
    /// # Errors
    ///
    /// `WeatherError::MissingCode` if there is no code for that day.
    pub fn weather_kind(&self) -> Result<WeatherKind, WeatherError> {
        let code = self
            .daily
            .weather_code
            .first()
            .copied()
            .flatten()
            .ok_or(WeatherError::MissingCode)?;
        Ok(WeatherKind::from_wmo(code))
    }
}

/// Daily weather codes from the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
}

impl WeatherClient {
    /// # Errors
    ///
    /// If the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("bedside/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl WeatherSource for WeatherClient {
    async fn lookup(
        &self,
        location: Location,
    ) -> Result<WeatherKind, WeatherError> {
        let forecast = self
            .http
            .get(format!("{}/v1/forecast", self.base_url))
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("daily", "weather_code".to_string()),
                ("timezone", "auto".to_string()),
                ("forecast_days", "1".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<Forecast>()
            .await?;

        let kind = forecast.weather_kind()?;
        tracing::debug!(weather = %kind, "weather lookup complete");
        Ok(kind)
    }
}
