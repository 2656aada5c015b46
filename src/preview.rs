//! Lightweight previews for files waiting in a batch.
//!
//! Images become data URLs straight away, videos get a single captured frame,
//! and everything else maps to an icon identifier without touching the data.

use crate::constants::{
    AUDIO_ICON, DOCUMENT_ICON, PREVIEW_JPEG_QUALITY, UNKNOWN_ICON, VIDEO_PREVIEW_OFFSET_SECS,
};
use crate::error::{Result, UploadError};
use crate::file::{FileCategory, FileHandle};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use serde::Serialize;
use std::io::{Cursor, Write};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PreviewResult {
    Image {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        width: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        height: Option<u32>,
    },
    Video {
        url: String,
        duration: f64,
        width: u32,
        height: u32,
    },
    Other {
        icon: String,
    },
}

impl PreviewResult {
    pub fn url(&self) -> Option<&str> {
        match self {
            PreviewResult::Image { url, .. } | PreviewResult::Video { url, .. } => Some(url),
            PreviewResult::Other { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProbe {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

/// Access to decoded video frames.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    async fn probe(&self, source: &Path) -> Result<VideoProbe>;

    /// Captures the frame at `offset_secs`, or `None` if the stream has no
    /// frame there.
    async fn frame_at(&self, source: &Path, offset_secs: f64) -> Result<Option<DynamicImage>>;
}

/// Frame extraction through the `ffprobe` / `ffmpeg` executables.
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl Default for FfmpegFrameExtractor {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl FfmpegFrameExtractor {
    pub fn new(ffmpeg_path: impl Into<String>, ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn probe(&self, source: &Path) -> Result<VideoProbe> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "-select_streams",
                "v:0",
            ])
            .arg(source)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| UploadError::Decode(format!("Failed to execute ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(UploadError::Decode(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        parse_probe_output(&output.stdout)
    }

    async fn frame_at(&self, source: &Path, offset_secs: f64) -> Result<Option<DynamicImage>> {
        let output = Command::new(&self.ffmpeg_path)
            .args(["-v", "error", "-ss", &format!("{:.3}", offset_secs), "-i"])
            .arg(source)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| UploadError::Decode(format!("Failed to execute ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(UploadError::Decode(format!(
                "ffmpeg failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        if output.stdout.is_empty() {
            return Ok(None);
        }

        image::load_from_memory(&output.stdout)
            .map(Some)
            .map_err(|e| UploadError::Decode(format!("Failed to decode captured frame: {}", e)))
    }
}

fn parse_probe_output(stdout: &[u8]) -> Result<VideoProbe> {
    let probe_data: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| UploadError::Decode(format!("Failed to parse ffprobe output: {}", e)))?;

    let stream = probe_data["streams"]
        .get(0)
        .ok_or_else(|| UploadError::Decode("No video stream found".to_string()))?;

    let duration = probe_data["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| UploadError::Decode("Could not parse duration".to_string()))?;

    let width = stream["width"]
        .as_u64()
        .ok_or_else(|| UploadError::Decode("Could not parse width".to_string()))? as u32;
    let height = stream["height"]
        .as_u64()
        .ok_or_else(|| UploadError::Decode("Could not parse height".to_string()))? as u32;

    Ok(VideoProbe {
        duration,
        width,
        height,
    })
}

/// Where to grab the poster frame: one second in, or the clip's end when it
/// is shorter than that.
pub fn seek_offset(duration: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 {
        return 0.0;
    }
    VIDEO_PREVIEW_OFFSET_SECS.min(duration)
}

pub fn to_data_url(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

pub fn icon_for(category: FileCategory) -> &'static str {
    match category {
        FileCategory::Document => DOCUMENT_ICON,
        FileCategory::Audio => AUDIO_ICON,
        _ => UNKNOWN_ICON,
    }
}

#[derive(Clone)]
pub struct PreviewGenerator {
    extractor: Arc<dyn FrameExtractor>,
}

impl Default for PreviewGenerator {
    fn default() -> Self {
        Self::new(Arc::new(FfmpegFrameExtractor::default()))
    }
}

impl PreviewGenerator {
    pub fn new(extractor: Arc<dyn FrameExtractor>) -> Self {
        Self { extractor }
    }

    /// Builds a preview for `file`.
    ///
    /// Unknown types never fail; they fall back to an icon. Only unreadable
    /// video data produces an error.
    pub async fn generate_preview(
        &self,
        file: &FileHandle,
        cancel: &CancellationToken,
    ) -> Result<PreviewResult> {
        match file.category() {
            FileCategory::Image => image_preview(file, cancel).await,
            FileCategory::Video => self.video_preview(file, cancel).await,
            category => Ok(PreviewResult::Other {
                icon: icon_for(category).to_string(),
            }),
        }
    }

    async fn video_preview(
        &self,
        file: &FileHandle,
        cancel: &CancellationToken,
    ) -> Result<PreviewResult> {
        // Dropping the temp file removes it, on every return path below.
        let media = write_temp_media(file).await?;

        let probe = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            probe = self.extractor.probe(media.path()) => probe?,
        };

        let offset = seek_offset(probe.duration);
        let frame = match self.capture(media.path(), offset, cancel).await? {
            Some(frame) => frame,
            None if offset > 0.0 => {
                tracing::debug!(file = %file.name(), offset, "No frame at offset, retrying at start");
                self.capture(media.path(), 0.0, cancel)
                    .await?
                    .ok_or_else(|| UploadError::Decode("Video has no decodable frames".to_string()))?
            }
            None => return Err(UploadError::Decode("Video has no decodable frames".to_string())),
        };

        let mut still = Vec::new();
        DynamicImage::ImageRgb8(frame.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(&mut still, PREVIEW_JPEG_QUALITY))?;

        tracing::debug!(file = %file.name(), duration = probe.duration, offset, "Video preview captured");

        Ok(PreviewResult::Video {
            url: to_data_url("image/jpeg", &still),
            duration: probe.duration,
            width: probe.width,
            height: probe.height,
        })
    }

    async fn capture(
        &self,
        source: &Path,
        offset: f64,
        cancel: &CancellationToken,
    ) -> Result<Option<DynamicImage>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UploadError::Cancelled),
            frame = self.extractor.frame_at(source, offset) => frame,
        }
    }
}

/// Encoding a large image is CPU-bound, so it runs on the blocking pool.
async fn image_preview(file: &FileHandle, cancel: &CancellationToken) -> Result<PreviewResult> {
    let file = file.clone();
    let task = tokio::task::spawn_blocking(move || encode_image_preview(&file));

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(UploadError::Cancelled),
        preview = task => preview
            .map_err(|e| UploadError::Decode(format!("Image preview task failed: {}", e))),
    }
}

fn encode_image_preview(file: &FileHandle) -> PreviewResult {
    let dimensions = ImageReader::new(Cursor::new(file.data().as_ref()))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());

    PreviewResult::Image {
        url: to_data_url(file.mime_type(), file.data()),
        width: dimensions.map(|(w, _)| w),
        height: dimensions.map(|(_, h)| h),
    }
}

async fn write_temp_media(file: &FileHandle) -> Result<NamedTempFile> {
    let data = file.data().clone();
    let suffix = file
        .name()
        .rsplit_once('.')
        .map(|(_, ext)| format!(".{}", ext))
        .unwrap_or_default();

    tokio::task::spawn_blocking(move || -> Result<NamedTempFile> {
        let mut temp = tempfile::Builder::new()
            .prefix("media-preview-")
            .suffix(&suffix)
            .tempfile()?;
        temp.write_all(&data)?;
        temp.flush()?;
        Ok(temp)
    })
    .await
    .map_err(|e| UploadError::Decode(format!("Failed to stage video: {}", e)))?
}
