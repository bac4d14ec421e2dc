use image::RgbImage;
use serde::Serialize;

use crate::error::{GrabError, Result};

/// A single decoded video frame: raw RGB24 pixel data, row-major.
#[derive(Clone)]
pub struct Frame {
    pub buffer: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Position in the sampled output sequence, starting at 0.
    pub index: u64,
    /// Presentation time of the frame in the source stream.
    pub timestamp_ms: f64,
}

impl Frame {
    pub fn new(buffer: Vec<u8>, width: u32, height: u32, index: u64, timestamp_ms: f64) -> Self {
        Self { buffer, width, height, index, timestamp_ms }
    }

    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Converts the raw buffer into an `image::RgbImage`, consuming the frame.
    pub fn into_image(self) -> Result<RgbImage> {
        let (width, height, got) = (self.width, self.height, self.buffer.len());
        RgbImage::from_raw(width, height, self.buffer)
            .ok_or(GrabError::BufferSize { got, width, height })
    }
}

/// Stream properties probed from an opened video source.
#[derive(Clone, Debug, Serialize)]
pub struct VideoMeta {
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame_count: u64,
    pub duration_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_image_dimensions() {
        let frame = Frame::new(vec![0u8; 4 * 2 * 3], 4, 2, 0, 0.0);
        let img = frame.into_image().unwrap();
        assert_eq!(img.width(), 4);
        assert_eq!(img.height(), 2);
    }

    #[test]
    fn test_into_image_rejects_short_buffer() {
        let frame = Frame::new(vec![0u8; 5], 4, 2, 0, 0.0);
        assert!(matches!(
            frame.into_image(),
            Err(GrabError::BufferSize { got: 5, width: 4, height: 2 })
        ));
    }
}
