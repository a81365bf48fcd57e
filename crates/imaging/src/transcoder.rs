use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, RgbImage};
use tracing::debug;

use gallery_core::config::UploadConfig;
use gallery_core::GalleryError;

/// Normalizes any supported raster image to a fixed-size RGB JPEG.
///
/// The aspect ratio is not preserved: output is always exactly
/// `width`×`height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTranscoder {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl Default for ImageTranscoder {
    fn default() -> Self {
        Self::new(150, 150, 95)
    }
}

impl ImageTranscoder {
    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        Self {
            width,
            height,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.icon_width, config.icon_height, config.jpeg_quality)
    }

    pub fn transcode(&self, source: &Path) -> Result<Vec<u8>, GalleryError> {
        let reader = ImageReader::open(source)
            .map_err(|e| GalleryError::Transcode(format!("{}: {}", source.display(), e)))?
            .with_guessed_format()
            .map_err(|e| GalleryError::Transcode(format!("{}: {}", source.display(), e)))?;
        let image = reader
            .decode()
            .map_err(|e| GalleryError::Transcode(format!("unsupported image {}: {}", source.display(), e)))?;

        let out = self.encode(image)?;
        debug!(source = %source.display(), bytes = out.len(), "image transcoded");
        Ok(out)
    }

    /// Same as [`transcode`](Self::transcode) for an image already in memory.
    pub fn transcode_bytes(&self, data: &[u8]) -> Result<Vec<u8>, GalleryError> {
        let image = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| GalleryError::Transcode(e.to_string()))?
            .decode()
            .map_err(|e| GalleryError::Transcode(format!("unsupported image: {}", e)))?;
        self.encode(image)
    }

    pub fn transcode_to_file(&self, source: &Path, target: &Path) -> Result<(), GalleryError> {
        let bytes = self.transcode(source)?;
        fs::write(target, bytes)?;
        debug!(target = %target.display(), "transcoded image written");
        Ok(())
    }

    fn encode(&self, image: DynamicImage) -> Result<Vec<u8>, GalleryError> {
        let rgb: RgbImage = image.to_rgb8();
        let resized = imageops::resize(&rgb, self.width, self.height, FilterType::Lanczos3);

        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, self.quality)
            .encode_image(&resized)
            .map_err(|e| GalleryError::Transcode(format!("jpeg encoding failed: {}", e)))?;
        Ok(buf)
    }
}
