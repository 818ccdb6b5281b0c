//! Conversion of raw capture buffers to RGB

use crate::CameraError;
use image::{ImageFormat, RgbImage};

/// Decode one captured buffer in the given FourCC layout
pub fn decode_captured(
    fourcc: &str,
    data: &[u8],
    width: u32,
    height: u32,
) -> Result<RgbImage, CameraError> {
    match fourcc {
        "MJPG" => image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map(|img| img.to_rgb8())
            .map_err(|e| CameraError::Decode {
                path: "MJPG buffer".to_string(),
                reason: e.to_string(),
            }),
        "YUYV" => yuyv_to_rgb(data, width, height),
        other => Err(CameraError::UnsupportedFormat(other.to_string())),
    }
}

/// YUV 4:2:2 (`Y0 U Y1 V` per pixel pair) to RGB, BT.601
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<RgbImage, CameraError> {
    let pixels = (width * height) as usize;
    let expected = pixels * 2;
    if yuyv.len() < expected {
        return Err(CameraError::InvalidBuffer {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    for chunk in yuyv[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0] as f32, chunk[2] as f32] {
            rgb.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
            rgb.push((y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8);
            rgb.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
        }
    }

    RgbImage::from_raw(width, height, rgb).ok_or(CameraError::InvalidBuffer {
        expected: pixels * 3,
        actual: 0,
    })
}
