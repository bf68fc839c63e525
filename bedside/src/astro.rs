//! Sunrise and sunset times from the sunrise equation.
//!
//! Accurate to a minute or two away from the poles, which is plenty for
//! swapping an icon.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

use crate::config::Location;

/// Julian date of 2000-01-01 12:00 UTC.
const J2000: f64 = 2_451_545.0;
/// Julian date of the Unix epoch.
const UNIX_EPOCH: f64 = 2_440_587.5;
/// Solar altitude at rise and set: refraction plus the sun's radius.
const HORIZON: f64 = -0.833;
/// Obliquity of the ecliptic.
const OBLIQUITY: f64 = 23.4397;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AstroError {
    #[error("no sunrise or sunset around {date} at latitude {latitude}")]
    NoEvent { date: NaiveDate, latitude: f64 },
}

/// Sunrise and sunset, in that order, for one solar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

/// The next sunrise and the next sunset, both strictly after some instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunEvents {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

impl SunEvents {
    /// The sun is up when it sets before it next rises.
    #[must_use]
    pub fn is_day(&self) -> bool {
        self.sunset < self.sunrise
    }

    #[must_use]
    pub fn last(&self) -> DateTime<Utc> {
        self.sunrise.max(self.sunset)
    }
}

/// Sunrise and sunset around local noon of `date`. `None` when the sun
/// stays above or below the horizon all day.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sun_times(date: NaiveDate, location: Location) -> Option<SunTimes> {
    let days = (date - NaiveDate::from_ymd_opt(2000, 1, 1)?).num_days() as f64;
    let mean_solar_time = days - location.longitude / 360.0;

    let anomaly = 0.985_600_28f64
        .mul_add(mean_solar_time, 357.5291)
        .rem_euclid(360.0);
    let m = anomaly.to_radians();
    let center = 1.9148 * m.sin()
        + 0.0200 * (2.0 * m).sin()
        + 0.0003 * (3.0 * m).sin();
    let ecliptic_longitude = (anomaly + center + 180.0 + 102.9372)
        .rem_euclid(360.0)
        .to_radians();

    let transit = J2000 + mean_solar_time + 0.0053 * m.sin()
        - 0.0069 * (2.0 * ecliptic_longitude).sin();

    let declination =
        (ecliptic_longitude.sin() * OBLIQUITY.to_radians().sin()).asin();
    let latitude = location.latitude.to_radians();
    let cos_hour_angle = latitude.sin().mul_add(
        -declination.sin(),
        HORIZON.to_radians().sin(),
    ) / (latitude.cos() * declination.cos());

    if !(-1.0..=1.0).contains(&cos_hour_angle) {
        return None;
    }

    let half_day = cos_hour_angle.acos().to_degrees() / 360.0;
    Some(SunTimes {
        sunrise: from_julian(transit - half_day)?,
        sunset: from_julian(transit + half_day)?,
    })
}

/// The next sunrise and sunset strictly after `now`.
///
/// # Errors
///
/// `AstroError::NoEvent` when either is missing in the coming days, as
/// happens near the poles.
pub fn next_sun_events(
    now: DateTime<Utc>,
    location: Location,
) -> Result<SunEvents, AstroError> {
    let today = now.date_naive();
    let days: Vec<SunTimes> = (-1..=2)
        .filter_map(|offset| today.checked_add_signed(TimeDelta::days(offset)))
        .filter_map(|date| sun_times(date, location))
        .collect();

    let next = |pick: fn(&SunTimes) -> DateTime<Utc>| {
        days.iter().map(pick).filter(|t| *t > now).min()
    };

    match (next(|d| d.sunrise), next(|d| d.sunset)) {
        (Some(sunrise), Some(sunset)) => Ok(SunEvents { sunrise, sunset }),
        _ => Err(AstroError::NoEvent {
            date: today,
            latitude: location.latitude,
        }),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn from_julian(julian: f64) -> Option<DateTime<Utc>> {
    let millis = ((julian - UNIX_EPOCH) * 86_400_000.0).round();
    DateTime::from_timestamp_millis(millis as i64)
}
