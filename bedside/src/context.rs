use bedside_app::{BoxError, ContextProvider};
use tracing::info;

use crate::{assets::AssetStore, config::Config, weather::WeatherClient};

#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub assets: AssetStore,
    pub weather: WeatherClient,
}

impl ContextProvider<Config> for AppContext {
    async fn new(config: Config) -> Result<Self, BoxError> {
        config.validate()?;

        let weather =
            WeatherClient::new(&config.weather_url, config.http_timeout())?;
        let assets = AssetStore::new(&config.assets_dir);

        info!(
            latitude = config.latitude,
            longitude = config.longitude,
            assets = %assets.root().display(),
            "configuration loaded"
        );

        Ok(Self {
            config,
            assets,
            weather,
        })
    }
}
