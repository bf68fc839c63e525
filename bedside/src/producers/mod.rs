//! Widget producers.
//!
//! Each producer owns whatever state it needs and turns it into a widget,
//! or into nothing when the display does not need to change. Producers are
//! driven by scheduler jobs and never touch the live set directly.

mod background;
mod clock;
mod mewo;
mod tree;
mod weather;

use bedside_core::queue::QueueError;
use types::WidgetError;

pub use background::{BACKGROUND, BACKGROUND_Z, background};
pub use clock::{CLOCK, CLOCK_Z, ClockFace};
pub use mewo::{MEWO, Mewo, Pose};
pub use tree::{BERT, BERT_Z, Season, bert};
pub use weather::{WEATHER, WEATHER_Z, WeatherProducer};

use crate::{assets::AssetError, astro::AstroError, weather::WeatherError};

#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Weather(#[from] WeatherError),
    #[error(transparent)]
    Astro(#[from] AstroError),
    #[error(transparent)]
    Widget(#[from] WidgetError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}
