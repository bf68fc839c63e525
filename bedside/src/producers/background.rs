use types::Widget;

use super::ProducerError;
use crate::assets::AssetStore;

pub const BACKGROUND: &str = "background";
pub const BACKGROUND_Z: i32 = -100;

/// The static scene everything else is drawn on.
///
/// # Errors
///
/// If the `background` asset is missing or unusable.
pub fn background(assets: &AssetStore) -> Result<Widget, ProducerError> {
    assets.widget(BACKGROUND, BACKGROUND_Z, BACKGROUND)
}
