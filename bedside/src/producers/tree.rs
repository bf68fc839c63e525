use chrono::{Datelike, NaiveDate};
use types::Widget;

use super::ProducerError;
use crate::assets::AssetStore;

pub const BERT: &str = "bert";
pub const BERT_Z: i32 = -99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Summer,
    Autumn,
    Winter,
    Spring,
}

impl Season {
    /// Meteorological season on `date` in the hemisphere of `latitude`.
    #[must_use]
    pub fn of(date: NaiveDate, latitude: f64) -> Self {
        let month = if latitude >= 0.0 {
            (date.month() + 5) % 12 + 1
        } else {
            date.month()
        };

        match month {
            12 | 1 | 2 => Self::Summer,
            3..=5 => Self::Autumn,
            6..=8 => Self::Winter,
            _ => Self::Spring,
        }
    }

    /// Which tree sprite fits the season.
    #[must_use]
    pub const fn foliage(self) -> &'static str {
        match self {
            Self::Spring | Self::Summer => "bloom",
            Self::Autumn | Self::Winter => "leafless",
        }
    }
}

/// Bert the tree, dressed for the season.
///
/// # Errors
///
/// If the sprite cannot be loaded.
pub fn bert(
    assets: &AssetStore,
    date: NaiveDate,
    latitude: f64,
) -> Result<Widget, ProducerError> {
    let season = Season::of(date, latitude);
    tracing::debug!(?season, "drawing bert");
    assets.widget(BERT, BERT_Z, &format!("bert/{}", season.foliage()))
}
