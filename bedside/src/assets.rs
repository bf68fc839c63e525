//! Bundled images, looked up by logical name.
//!
//! A logical name such as `mewo/desk` maps to `<root>/mewo/desk.bmp`, or
//! `<root>/mewo/desk.png` when there is no bitmap. An optional
//! `<name>.accent` image next to it supplies the red layer of a widget.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use types::Widget;

use crate::producers::ProducerError;

const EXTENSIONS: [&str; 2] = ["bmp", "png"];

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset {name} not found under {}", .root.display())]
    Missing { name: String, root: PathBuf },
    #[error("failed to decode asset {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load an image as RGBA.
    ///
    /// # Errors
    ///
    /// `AssetError::Missing` if there is no file for `name`, or
    /// `AssetError::Decode` if it is not a readable image.
    pub fn load(&self, name: &str) -> Result<RgbaImage, AssetError> {
        self.try_load(name)?.ok_or_else(|| AssetError::Missing {
            name: name.to_string(),
            root: self.root.clone(),
        })
    }

    /// Like [`load`](Self::load), but a missing file is not an error.
    ///
    /// # Errors
    ///
    /// If the file exists and cannot be decoded.
    pub fn try_load(&self, name: &str) -> Result<Option<RgbaImage>, AssetError> {
        let Some(path) = self.find(name) else {
            return Ok(None);
        };

        tracing::debug!(asset = name, path = %path.display(), "loading asset");
        let image = image::open(&path).map_err(|source| AssetError::Decode {
            name: name.to_string(),
            source,
        })?;
        Ok(Some(image.to_rgba8()))
    }

    /// Build a widget from an asset and its optional accent layer.
    ///
    /// # Errors
    ///
    /// If the asset is missing or unreadable, or does not cover the panel.
    pub fn widget(
        &self,
        widget: &str,
        z: i32,
        asset: &str,
    ) -> Result<Widget, ProducerError> {
        let primary = self.load(asset)?;
        let accent = self
            .try_load(&format!("{asset}.accent"))?
            .unwrap_or_else(types::blank);
        Ok(Widget::new(widget, z, primary, accent)?)
    }

    fn find(&self, name: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{name}.{ext}")))
            .find(|path| path.is_file())
    }
}
