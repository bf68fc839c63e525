//! Display device contract.
//!
//! The compositor is the only user of a sink. Every frame goes through
//! `init`, `clear`, `buffer` (once per plane), `display` and `sleep`, in that
//! order. `close` releases the device and is called once at teardown.

mod memory;

use image::{GrayImage, Luma};

pub use memory::{MemorySink, SinkCall, SinkLog};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("display is not initialised")]
    NotInitialized,
    #[error("bitmap is {width}x{height}, display is {expected_width}x{expected_height}")]
    BitmapSize {
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },
    #[error("buffer is {actual} bytes, expected {expected}")]
    BufferSize { actual: usize, expected: usize },
    #[error("display I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode frame: {0}")]
    Image(#[from] image::ImageError),
    #[error("display device error: {0}")]
    Device(String),
}

pub trait DisplaySink: Send {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Wake the device and prepare it for a frame.
    fn init(&mut self) -> impl Future<Output = Result<(), SinkError>> + Send;

    fn clear(&mut self) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Convert a single-bit bitmap into the device's native buffer.
    ///
    /// The default packs eight pixels per byte, most significant bit first,
    /// with a set bit meaning "no ink".
    ///
    /// # Errors
    ///
    /// If the bitmap does not match the panel size.
    fn buffer(&self, bitmap: &GrayImage) -> Result<Vec<u8>, SinkError> {
        pack(bitmap, self.width(), self.height())
    }

    /// Write both planes to the panel.
    fn display(
        &mut self,
        primary: &[u8],
        accent: &[u8],
    ) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Put the panel into its low-power state.
    fn sleep(&mut self) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Release the device. The sink is not used afterwards.
    fn close(&mut self) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Bytes in one packed row.
#[must_use]
pub const fn row_bytes(width: u32) -> usize {
    width.div_ceil(8) as usize
}

/// Size of a packed buffer for a `width` × `height` panel.
#[must_use]
pub const fn buffer_len(width: u32, height: u32) -> usize {
    row_bytes(width) * height as usize
}

/// Pack a bitmap into one bit per pixel. Pixels at or above 128 are paper
/// (bit set), darker pixels are ink (bit clear).
///
/// # Errors
///
/// `SinkError::BitmapSize` if the bitmap is not `width` × `height`.
pub fn pack(
    bitmap: &GrayImage,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, SinkError> {
    if bitmap.dimensions() != (width, height) {
        return Err(SinkError::BitmapSize {
            width: bitmap.width(),
            height: bitmap.height(),
            expected_width: width,
            expected_height: height,
        });
    }

    let stride = row_bytes(width);
    let mut buffer = vec![0_u8; buffer_len(width, height)];
    for (x, y, Luma([value])) in bitmap.enumerate_pixels() {
        if *value >= 128 {
            buffer[y as usize * stride + (x / 8) as usize] |= 0x80 >> (x % 8);
        }
    }

    Ok(buffer)
}

/// Inverse of [`pack`]: paper becomes 255, ink becomes 0.
///
/// # Errors
///
/// `SinkError::BufferSize` if `buffer` has the wrong length.
pub fn unpack(
    buffer: &[u8],
    width: u32,
    height: u32,
) -> Result<GrayImage, SinkError> {
    let expected = buffer_len(width, height);
    if buffer.len() != expected {
        return Err(SinkError::BufferSize {
            actual: buffer.len(),
            expected,
        });
    }

    let stride = row_bytes(width);
    Ok(GrayImage::from_fn(width, height, |x, y| {
        let byte = buffer[y as usize * stride + (x / 8) as usize];
        if byte & (0x80 >> (x % 8)) == 0 {
            Luma([0])
        } else {
            Luma([255])
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_sets_paper_bits() {
        let mut bitmap = GrayImage::from_pixel(16, 2, Luma([255]));
        bitmap.put_pixel(0, 0, Luma([0]));
        bitmap.put_pixel(9, 1, Luma([0]));

        let buffer = pack(&bitmap, 16, 2).unwrap();
        assert_eq!(buffer, vec![0b0111_1111, 0xFF, 0xFF, 0b1011_1111]);
    }

    #[test]
    fn test_pack_pads_partial_bytes() {
        let bitmap = GrayImage::from_pixel(10, 1, Luma([255]));
        let buffer = pack(&bitmap, 10, 1).unwrap();
        assert_eq!(buffer, vec![0xFF, 0b1100_0000]);
    }

    #[test]
    fn test_pack_rejects_wrong_size() {
        let bitmap = GrayImage::new(8, 8);
        assert!(matches!(
            pack(&bitmap, 16, 8),
            Err(SinkError::BitmapSize { width: 8, .. })
        ));
    }

    #[test]
    fn test_unpack_restores_bitmap() {
        let mut bitmap = GrayImage::from_pixel(24, 3, Luma([255]));
        bitmap.put_pixel(23, 2, Luma([0]));
        bitmap.put_pixel(5, 0, Luma([0]));

        let buffer = pack(&bitmap, 24, 3).unwrap();
        assert_eq!(unpack(&buffer, 24, 3).unwrap(), bitmap);
    }

    #[test]
    fn test_unpack_rejects_short_buffer() {
        assert!(matches!(
            unpack(&[0; 3], 16, 2),
            Err(SinkError::BufferSize {
                actual: 3,
                expected: 4
            })
        ));
    }
}
