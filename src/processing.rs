use crate::constants::{
    DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, LIBDEFLATER_HIGH_LEVEL,
    LIBDEFLATER_LOW_LEVEL, ZOPFLI_ITERATIONS,
};
use crate::error::{Result, UploadError};
use crate::file::{FileCategory, FileHandle};
use crate::formats::{is_decodable_mime, OutputFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use oxipng::{Deflaters, Options};
use std::num::NonZeroU8;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub struct CompressionOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// Encoder quality in (0, 1].
    pub quality: f32,
    pub format: OutputFormat,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            quality: DEFAULT_QUALITY,
            format: OutputFormat::Jpeg,
        }
    }
}

impl CompressionOptions {
    pub fn new(
        quality: Option<f32>,
        max_width: Option<u32>,
        max_height: Option<u32>,
        format: Option<&str>,
    ) -> Result<Self> {
        let quality = quality.unwrap_or(DEFAULT_QUALITY);
        if !(quality > 0.0 && quality <= 1.0) {
            return Err(UploadError::InvalidQuality(quality));
        }

        let format = match format {
            Some(fmt) => OutputFormat::from_str(fmt)?,
            None => OutputFormat::Jpeg,
        };

        Ok(Self {
            max_width: max_width.filter(|&w| w > 0).unwrap_or(DEFAULT_MAX_WIDTH),
            max_height: max_height.filter(|&h| h > 0).unwrap_or(DEFAULT_MAX_HEIGHT),
            quality,
            format,
        })
    }

    /// Quality on the 1..=100 scale the encoders expect.
    pub fn encoder_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Whether the batch pipeline should run `file` through the compressor.
///
/// Only decodable raster images qualify; GIF and SVG go up untouched.
pub fn should_compress(file: &FileHandle) -> bool {
    file.category() == FileCategory::Image && is_decodable_mime(file.mime_type())
}

/// Largest size that fits inside `max_width` x `max_height` with the same
/// aspect ratio. Never upscales, and never returns a zero dimension.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 || (width <= max_width && height <= max_height) {
        return (width, height);
    }

    let scale = (max_width as f64 / width as f64)
        .min(max_height as f64 / height as f64)
        .min(1.0);

    let new_width = ((width as f64 * scale).round() as u32).clamp(1, max_width.max(1));
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, max_height.max(1));
    (new_width, new_height)
}

pub fn resize_image(img: &mut DynamicImage, options: &CompressionOptions) {
    let (width, height) = img.dimensions();
    let (new_width, new_height) = fit_within(width, height, options.max_width, options.max_height);

    if (new_width, new_height) != (width, height) {
        tracing::debug!(width, height, new_width, new_height, "Resizing image");
        *img = img.resize_exact(new_width, new_height, FilterType::Lanczos3);
    }
}

pub fn encode_image(img: &DynamicImage, options: &CompressionOptions) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    match options.format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(
                &mut buffer,
                options.encoder_quality(),
            ))?;
        }
        OutputFormat::Png => {
            img.write_with_encoder(PngEncoder::new(&mut buffer))?;
            buffer = optimize_png(buffer, options.encoder_quality());
        }
        OutputFormat::WebP => {
            let pixels = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            pixels.write_with_encoder(WebPEncoder::new_lossless(&mut buffer))?;
        }
    }

    Ok(buffer)
}

/// Runs oxipng over an encoded PNG, keeping the original bytes if it fails.
fn optimize_png(png: Vec<u8>, quality: u8) -> Vec<u8> {
    let mut oxipng_options = Options::from_preset(4);
    oxipng_options.force = true;

    oxipng_options.deflate = match NonZeroU8::new(ZOPFLI_ITERATIONS) {
        Some(iterations) if quality >= 90 => Deflaters::Zopfli { iterations },
        _ if quality >= 70 => Deflaters::Libdeflater {
            compression: LIBDEFLATER_HIGH_LEVEL,
        },
        _ => Deflaters::Libdeflater {
            compression: LIBDEFLATER_LOW_LEVEL,
        },
    };

    match oxipng::optimize_from_memory(&png, &oxipng_options) {
        Ok(optimized) if !optimized.is_empty() && optimized.len() < png.len() => optimized,
        Ok(_) => png,
        Err(e) => {
            tracing::warn!(error = %e, "PNG optimization failed, keeping unoptimized output");
            png
        }
    }
}

/// Decode -> fit -> re-encode, all synchronous. Used from the blocking pool.
pub fn compress_bytes(data: &[u8], options: &CompressionOptions) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Err(UploadError::Decode("Image has no data".to_string()));
    }

    let mut img = image::load_from_memory(data)
        .map_err(|e| UploadError::Decode(format!("Failed to decode image: {}", e)))?;
    resize_image(&mut img, options);

    let encoded = encode_image(&img, options)?;
    if encoded.is_empty() {
        return Err(UploadError::Decode("Encoder produced no data".to_string()));
    }
    Ok(encoded)
}

/// Scales `file` down to fit the configured bounds and re-encodes it.
///
/// The returned handle keeps the original name and carries the output MIME
/// type. Decoding runs on the blocking pool and is abandoned as soon as
/// `cancel` fires.
pub async fn compress_image(
    file: &FileHandle,
    options: &CompressionOptions,
    cancel: &CancellationToken,
) -> Result<FileHandle> {
    if cancel.is_cancelled() {
        return Err(UploadError::Cancelled);
    }

    let data = file.data().clone();
    let task_options = options.clone();
    let handle = tokio::task::spawn_blocking(move || compress_bytes(&data, &task_options));

    let encoded = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(UploadError::Cancelled),
        joined = handle => joined
            .map_err(|e| UploadError::Decode(format!("Compression task failed: {}", e)))??,
    };

    tracing::debug!(
        file = %file.name(),
        original = file.size_bytes(),
        compressed = encoded.len(),
        format = %options.format,
        "Image compressed"
    );

    Ok(FileHandle::new(
        file.name(),
        options.format.mime_type(),
        encoded,
    ))
}
