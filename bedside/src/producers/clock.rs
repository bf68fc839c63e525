use chrono::{NaiveTime, Timelike};
use image::imageops;
use types::Widget;

use super::ProducerError;
use crate::assets::AssetStore;

pub const CLOCK: &str = "clock";
pub const CLOCK_Z: i32 = -50;

/// Draws `HH:MM` from the glyph sprites `clock/0` to `clock/9` and
/// `clock/colon`, left to right from `(x, y)`.
#[derive(Debug, Clone)]
pub struct ClockFace {
    assets: AssetStore,
    x: u32,
    y: u32,
}

impl ClockFace {
    #[must_use]
    pub const fn new(assets: AssetStore, x: u32, y: u32) -> Self {
        Self { assets, x, y }
    }

    /// # Errors
    ///
    /// If a glyph is missing.
    pub fn render(&self, time: NaiveTime) -> Result<Widget, ProducerError> {
        let text = format!("{:02}:{:02}", time.hour(), time.minute());
        let mut canvas = types::blank();
        let mut x = i64::from(self.x);

        for ch in text.chars() {
            let glyph = match ch {
                ':' => self.assets.load("clock/colon")?,
                digit => self.assets.load(&format!("clock/{digit}"))?,
            };
            imageops::replace(&mut canvas, &glyph, x, i64::from(self.y));
            x += i64::from(glyph.width());
        }

        Ok(Widget::primary(CLOCK, CLOCK_Z, canvas)?)
    }
}
