//! A display that writes each frame to a PNG file instead of a panel.

use std::{io::Cursor, path::PathBuf};

use bedside_core::sink::{DisplaySink, SinkError, unpack};
use image::{GrayImage, ImageFormat, Rgb, RgbImage};
use tracing::info;

pub const FRAME_FILE: &str = "frame.png";

const RED: Rgb<u8> = Rgb([255, 0, 0]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Show both ink planes the way the panel would: red over black over
/// white paper.
#[must_use]
pub fn combine(primary: &GrayImage, accent: &GrayImage) -> RgbImage {
    RgbImage::from_fn(primary.width(), primary.height(), |x, y| {
        if accent.get_pixel(x, y)[0] == 0 {
            RED
        } else if primary.get_pixel(x, y)[0] == 0 {
            BLACK
        } else {
            WHITE
        }
    })
}

#[derive(Debug)]
pub struct PreviewSink {
    width: u32,
    height: u32,
    output_dir: PathBuf,
    awake: bool,
}

impl PreviewSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            width: types::WIDTH,
            height: types::HEIGHT,
            output_dir: output_dir.into(),
            awake: false,
        }
    }

    #[must_use]
    pub fn frame_path(&self) -> PathBuf {
        self.output_dir.join(FRAME_FILE)
    }
}

impl DisplaySink for PreviewSink {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    async fn init(&mut self) -> Result<(), SinkError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        self.awake = true;
        info!(path = %self.frame_path().display(), "preview display init");
        Ok(())
    }

    async fn clear(&mut self) -> Result<(), SinkError> {
        info!("preview display clear");
        Ok(())
    }

    async fn display(
        &mut self,
        primary: &[u8],
        accent: &[u8],
    ) -> Result<(), SinkError> {
        if !self.awake {
            return Err(SinkError::NotInitialized);
        }

        let frame = combine(
            &unpack(primary, self.width, self.height)?,
            &unpack(accent, self.width, self.height)?,
        );

        let mut png = Cursor::new(Vec::new());
        frame.write_to(&mut png, ImageFormat::Png)?;
        tokio::fs::write(self.frame_path(), png.into_inner()).await?;

        info!(path = %self.frame_path().display(), "frame written");
        Ok(())
    }

    async fn sleep(&mut self) -> Result<(), SinkError> {
        self.awake = false;
        info!("preview display sleep");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.awake = false;
        info!("preview display closed");
        Ok(())
    }
}
