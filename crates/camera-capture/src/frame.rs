//! Video frame types and processing

use crate::CameraError;
use image::{imageops::FilterType, ImageFormat, RgbImage};
use std::io::Cursor;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds since the source was opened)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Result<Self, CameraError> {
        let expected = (width as usize) * (height as usize) * 3;
        if data.len() != expected {
            return Err(CameraError::InvalidBuffer {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        })
    }

    /// Create a frame from a decoded image
    pub fn from_rgb_image(img: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Solid-colour frame, mostly useful for tests and dry runs
    pub fn blank(width: u32, height: u32, sequence: u32) -> Self {
        Self {
            data: vec![0; (width as usize) * (height as usize) * 3],
            width,
            height,
            timestamp_ns: 0,
            sequence,
        }
    }

    /// Borrow the pixel data as an image buffer
    pub fn to_rgb_image(&self) -> Result<RgbImage, CameraError> {
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            CameraError::InvalidBuffer {
                expected: (self.width as usize) * (self.height as usize) * 3,
                actual: self.data.len(),
            },
        )
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Resize to a working resolution. No-op when the size already matches.
    pub fn resize(&self, new_width: u32, new_height: u32) -> Result<VideoFrame, CameraError> {
        if new_width == self.width && new_height == self.height {
            return Ok(self.clone());
        }
        let img = self.to_rgb_image()?;
        let resized = image::imageops::resize(&img, new_width, new_height, FilterType::Triangle);
        Ok(VideoFrame::from_rgb_image(
            resized,
            self.timestamp_ns,
            self.sequence,
        ))
    }

    /// Encode the frame as JPEG
    pub fn encode_jpeg(&self) -> Result<Vec<u8>, CameraError> {
        let img = self.to_rgb_image()?;
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg)
            .map_err(|e| CameraError::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }
}
