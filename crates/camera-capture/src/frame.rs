//! Video frame types and processing

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::CameraError;

/// Channel order of a packed 3-byte pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    #[default]
    Rgb24,
    /// Blue-green-red, the order most capture backends hand out
    Bgr24,
}

/// Packed 8-bit, 3-channel video frame (height x width x 3)
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// Pixel data (width * height * 3), row-major
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Channel order of `data`
    pub format: PixelFormat,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw packed data
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Result<Self, CameraError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(CameraError::Format(format!(
                "{}x{} frame needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            format,
            timestamp_ns,
            sequence,
        })
    }

    /// All-black frame of the given size
    pub fn blank(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data: vec![0; width as usize * height as usize * 3],
            width,
            height,
            format,
            timestamp_ns: 0,
            sequence: 0,
        }
    }

    /// (height, width, channels)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, 3)
    }

    /// Get the raw pixel at (x, y), in the frame's own channel order
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize * self.width as usize) + x as usize) * 3;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Horizontally flipped copy (selfie view)
    pub fn mirrored(&self) -> VideoFrame {
        let row_len = self.width as usize * 3;
        let mut data = Vec::with_capacity(self.data.len());
        for row in self.data.chunks_exact(row_len.max(1)) {
            for pixel in row.chunks_exact(3).rev() {
                data.extend_from_slice(pixel);
            }
        }

        VideoFrame {
            data,
            width: self.width,
            height: self.height,
            format: self.format,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        }
    }

    /// Copy into an RGB image buffer, swapping channels if needed
    pub fn to_rgb_image(&self) -> Result<RgbImage, CameraError> {
        let data = match self.format {
            PixelFormat::Rgb24 => self.data.clone(),
            PixelFormat::Bgr24 => swap_red_blue(&self.data),
        };

        RgbImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| CameraError::Format("Failed to create image buffer".into()))
    }

    /// Build a frame in `format` from an RGB image buffer
    pub fn from_rgb_image(
        image: RgbImage,
        format: PixelFormat,
        timestamp_ns: u64,
        sequence: u32,
    ) -> VideoFrame {
        let (width, height) = image.dimensions();
        let raw = image.into_raw();
        let data = match format {
            PixelFormat::Rgb24 => raw,
            PixelFormat::Bgr24 => swap_red_blue(&raw),
        };

        VideoFrame {
            data,
            width,
            height,
            format,
            timestamp_ns,
            sequence,
        }
    }

    /// Decode an image file into a frame of the requested channel order
    pub fn from_file(
        path: &std::path::Path,
        format: PixelFormat,
        sequence: u32,
    ) -> Result<VideoFrame, image::ImageError> {
        let rgb = image::open(path)?.to_rgb8();
        Ok(Self::from_rgb_image(rgb, format, 0, sequence))
    }

    /// Encode the frame to an image file (format picked from the extension)
    pub fn save(&self, path: &std::path::Path) -> Result<(), CameraError> {
        let rgb = self.to_rgb_image()?;
        rgb.save(path)
            .map_err(|e| CameraError::Stream(format!("{}: {}", path.display(), e)))
    }
}

fn swap_red_blue(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for pixel in data.chunks_exact(3) {
        out.extend_from_slice(&[pixel[2], pixel[1], pixel[0]]);
    }
    out
}
