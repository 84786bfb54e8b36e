//! Image decoding, metadata derivation, and thumbnail rendering.

use crate::errors::{MediaError, MediaResult};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType};

/// Everything derived from a decoded image in one pass.
#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    pub width: u32,
    pub height: u32,
    /// Dominant color as `#rrggbb`. Absent when extraction failed; a missing
    /// color never fails the analysis as a whole.
    pub color: Option<String>,
    /// JPEG thumbnail, longer dimension scaled to the configured edge.
    pub thumbnail: Vec<u8>,
}

/// Decodes images and derives metadata plus a thumbnail.
#[derive(Debug, Clone, Copy)]
pub struct ImageAnalyzer {
    thumbnail_edge: u32,
    jpeg_quality: u8,
}

impl ImageAnalyzer {
    pub fn new(thumbnail_edge: u32, jpeg_quality: u8) -> Self {
        Self {
            thumbnail_edge,
            jpeg_quality,
        }
    }

    /// Decode `bytes` and derive dimensions, dominant color, and thumbnail.
    ///
    /// Decoding is CPU-bound, so the work runs on the blocking pool.
    /// Undecodable input fails with [`MediaError::Unprocessable`].
    pub async fn analyze(&self, bytes: Bytes) -> MediaResult<ImageAnalysis> {
        let edge = self.thumbnail_edge;
        let quality = self.jpeg_quality;
        tokio::task::spawn_blocking(move || analyze_blocking(&bytes, edge, quality))
            .await
            .map_err(|err| MediaError::Unprocessable(format!("analysis task failed: {err}")))?
    }
}

fn analyze_blocking(bytes: &[u8], edge: u32, quality: u8) -> MediaResult<ImageAnalysis> {
    let img = image::load_from_memory(bytes)
        .map_err(|err| MediaError::Unprocessable(err.to_string()))?;

    let color = dominant_color(&img);
    if color.is_none() {
        tracing::debug!("dominant color extraction produced nothing");
    }

    let thumbnail = encode_thumbnail(&img, edge, quality)?;

    Ok(ImageAnalysis {
        width: img.width(),
        height: img.height(),
        color,
        thumbnail,
    })
}

/// Average RGB over a downsampled copy, as a lowercase `#rrggbb` string.
/// Isolated sub-step: any failure yields `None` rather than an error.
fn dominant_color(img: &DynamicImage) -> Option<String> {
    let sample = img.resize(50, 50, FilterType::Nearest).to_rgb8();
    let count = sample.pixels().len() as u64;
    if count == 0 {
        return None;
    }

    let mut sums = [0u64; 3];
    for pixel in sample.pixels() {
        sums[0] += u64::from(pixel[0]);
        sums[1] += u64::from(pixel[1]);
        sums[2] += u64::from(pixel[2]);
    }

    Some(format!(
        "#{:02x}{:02x}{:02x}",
        (sums[0] / count) as u8,
        (sums[1] / count) as u8,
        (sums[2] / count) as u8
    ))
}

/// Scale so the longer dimension hits `edge` (aspect ratio preserved) and
/// re-encode as JPEG at the fixed quality.
fn encode_thumbnail(img: &DynamicImage, edge: u32, quality: u8) -> MediaResult<Vec<u8>> {
    let scaled = img.resize(edge, edge, FilterType::Lanczos3).to_rgb8();

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder
        .encode(
            scaled.as_raw(),
            scaled.width(),
            scaled.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|err| MediaError::Unprocessable(err.to_string()))?;

    Ok(buf)
}
