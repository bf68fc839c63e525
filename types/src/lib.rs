use std::sync::Arc;

use image::{Rgba, RgbaImage};

mod weather;

pub use weather::WeatherKind;

/// Error type for jobs and application setup, where any failure is just
/// reported.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Width of the panel, in pixels.
pub const WIDTH: u32 = 800;

/// Height of the panel, in pixels.
pub const HEIGHT: u32 = 480;

/// The colour of an untouched canvas pixel: white, fully transparent.
pub const TRANSPARENT: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// A fully transparent layer covering the whole panel.
#[must_use]
pub fn blank() -> RgbaImage {
    RgbaImage::from_pixel(WIDTH, HEIGHT, TRANSPARENT)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WidgetError {
    #[error(
        "{layer} layer of widget {name} is {width}x{height}, expected {}x{}",
        WIDTH,
        HEIGHT
    )]
    LayerSize {
        name: String,
        layer: &'static str,
        width: u32,
        height: u32,
    },
}

/// One visual element of the display.
///
/// A widget carries two full-panel layers: the primary (black ink) layer and
/// the accent (red ink) layer. Transparent pixels leave whatever is below
/// them visible. Widgets are immutable once built; the layers are shared
/// behind an `Arc` so the same widget can sit in a queue and in the live set
/// without copying pixels.
#[derive(Debug, Clone)]
pub struct Widget {
    name: String,
    z: i32,
    primary: Arc<RgbaImage>,
    accent: Arc<RgbaImage>,
}

impl Widget {
    /// Build a widget from both layers.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::LayerSize` if either layer does not cover the
    /// panel exactly.
    pub fn new(
        name: impl Into<String>,
        z: i32,
        primary: RgbaImage,
        accent: RgbaImage,
    ) -> Result<Self, WidgetError> {
        let name = name.into();
        check_size(&name, "primary", &primary)?;
        check_size(&name, "accent", &accent)?;

        Ok(Self {
            name,
            z,
            primary: Arc::new(primary),
            accent: Arc::new(accent),
        })
    }

    /// Build a widget that only draws black ink.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::LayerSize` if `primary` does not cover the
    /// panel exactly.
    pub fn primary(
        name: impl Into<String>,
        z: i32,
        primary: RgbaImage,
    ) -> Result<Self, WidgetError> {
        Self::new(name, z, primary, blank())
    }

    /// A widget that draws nothing. Used to clear a slot.
    #[must_use]
    pub fn empty(name: impl Into<String>, z: i32) -> Self {
        Self {
            name: name.into(),
            z,
            primary: Arc::new(blank()),
            accent: Arc::new(blank()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }

    #[must_use]
    pub fn primary_layer(&self) -> &RgbaImage {
        &self.primary
    }

    #[must_use]
    pub fn accent_layer(&self) -> &RgbaImage {
        &self.accent
    }
}

fn check_size(
    name: &str,
    layer: &'static str,
    image: &RgbaImage,
) -> Result<(), WidgetError> {
    if image.dimensions() == (WIDTH, HEIGHT) {
        return Ok(());
    }

    Err(WidgetError::LayerSize {
        name: name.to_string(),
        layer,
        width: image.width(),
        height: image.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_transparent_everywhere() {
        let canvas = blank();
        assert_eq!(canvas.dimensions(), (WIDTH, HEIGHT));
        assert!(canvas.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_widget_rejects_cropped_layer() {
        let cropped = RgbaImage::new(100, 100);
        let err = Widget::primary("mewo", -99, cropped).unwrap_err();
        assert_eq!(
            err,
            WidgetError::LayerSize {
                name: "mewo".to_string(),
                layer: "primary",
                width: 100,
                height: 100,
            }
        );
    }

    #[test]
    fn test_widget_rejects_cropped_accent() {
        let err = Widget::new("sun", 0, blank(), RgbaImage::new(800, 479))
            .unwrap_err();
        assert!(matches!(err, WidgetError::LayerSize { layer: "accent", .. }));
    }

    #[test]
    fn test_clone_shares_layers() {
        let widget = Widget::primary("background", -100, blank()).unwrap();
        let copy = widget.clone();
        assert!(Arc::ptr_eq(&widget.primary, &copy.primary));
        assert_eq!(copy.name(), "background");
        assert_eq!(copy.z(), -100);
    }
}
