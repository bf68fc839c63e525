use types::{WeatherKind, Widget};

use super::ProducerError;
use crate::{assets::AssetStore, config::Location, weather::WeatherSource};

/// The slot shared by the weather icon and the night overlay.
pub const WEATHER: &str = "weather";
pub const WEATHER_Z: i32 = -99;

const NIGHT_ASSET: &str = "weather/night";

pub struct WeatherProducer<W> {
    source: W,
    assets: AssetStore,
    location: Location,
}

impl<W: WeatherSource> WeatherProducer<W> {
    pub const fn new(source: W, assets: AssetStore, location: Location) -> Self {
        Self {
            source,
            assets,
            location,
        }
    }

    #[must_use]
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Look up today's weather and draw its icon.
    ///
    /// # Errors
    ///
    /// If the lookup fails or the icon cannot be loaded.
    pub async fn current(&self) -> Result<Widget, ProducerError> {
        let kind = self.source.lookup(self.location).await?;
        tracing::info!(weather = %kind, "weather updated");
        self.icon(kind)
    }

    /// The icon for `kind`. Sunny skies draw nothing.
    ///
    /// # Errors
    ///
    /// If the icon cannot be loaded.
    pub fn icon(&self, kind: WeatherKind) -> Result<Widget, ProducerError> {
        if kind == WeatherKind::Sunny {
            return Ok(Widget::empty(WEATHER, WEATHER_Z));
        }
        self.assets
            .widget(WEATHER, WEATHER_Z, &format!("weather/{kind}"))
    }

    /// The night overlay, drawn in the weather slot so the next weather
    /// update replaces it.
    ///
    /// # Errors
    ///
    /// If the overlay cannot be loaded.
    pub fn night(&self) -> Result<Widget, ProducerError> {
        self.assets.widget(WEATHER, WEATHER_Z, NIGHT_ASSET)
    }
}
