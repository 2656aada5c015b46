use crate::constants::{
    AUDIO_MAX_SIZE, CATEGORY_MIME_TYPES, DOCUMENT_MAX_SIZE, EXTENSION_MIME_TYPES,
    FALLBACK_MAX_SIZE, FALLBACK_MIME, IMAGE_MAX_SIZE, MIME_ALIASES, VIDEO_MAX_SIZE,
};
use crate::error::{Result, UploadError};
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Broad media family of a file, derived from its MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Video,
    Document,
    Audio,
    Unknown,
}

impl FileCategory {
    /// First table entry whose MIME list contains `mime_type` wins.
    pub fn from_mime(mime_type: &str) -> Self {
        let normalized = mime_type.trim().to_ascii_lowercase();
        CATEGORY_MIME_TYPES
            .iter()
            .find(|(_, mimes)| mimes.contains(&normalized.as_str()))
            .map(|(category, _)| *category)
            .unwrap_or(FileCategory::Unknown)
    }

    /// Default per-file size limit in bytes.
    pub fn max_size(&self) -> u64 {
        match self {
            FileCategory::Image => IMAGE_MAX_SIZE,
            FileCategory::Video => VIDEO_MAX_SIZE,
            FileCategory::Document => DOCUMENT_MAX_SIZE,
            FileCategory::Audio => AUDIO_MAX_SIZE,
            FileCategory::Unknown => FALLBACK_MAX_SIZE,
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileCategory::Image => "image",
            FileCategory::Video => "video",
            FileCategory::Document => "document",
            FileCategory::Audio => "audio",
            FileCategory::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Every MIME type that belongs to a known category.
pub fn known_mime_types() -> impl Iterator<Item = &'static str> {
    CATEGORY_MIME_TYPES
        .iter()
        .flat_map(|(_, mimes)| mimes.iter().copied())
}

/// Immutable reference to a file's content and attributes.
///
/// The content lives in a shared [`Bytes`] buffer, so cloning a handle (as the
/// batch pipeline does when it fans files out to uploads) never copies data.
#[derive(Clone, PartialEq, Eq)]
pub struct FileHandle {
    name: String,
    mime_type: String,
    data: Bytes,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Reads a file from disk, sniffing its MIME type from content first and
    /// falling back to the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(UploadError::FileNotFound(path.to_path_buf()));
        }

        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| UploadError::UnsupportedFormat("Invalid file name".to_string()))?;
        let mime_type = detect_mime_type(path, &data);

        tracing::debug!(file = %name, mime = %mime_type, size = data.len(), "Loaded file");
        Ok(Self::new(name, mime_type, data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn category(&self) -> FileCategory {
        FileCategory::from_mime(&self.mime_type)
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

/// Sniffed content wins when it lands in a known category that agrees with the
/// extension's table entry. Otherwise the extension decides.
pub fn detect_mime_type(path: &Path, data: &[u8]) -> String {
    let by_extension = extension_mime_type(path);

    if let Some(kind) = infer::get(data) {
        let sniffed = canonical_mime_type(kind.mime_type());
        let category = FileCategory::from_mime(sniffed);
        let agrees = by_extension
            .map(|mime| FileCategory::from_mime(mime) == category)
            .unwrap_or(true);

        if category != FileCategory::Unknown && agrees {
            return sniffed.to_string();
        }
        if by_extension.is_none() {
            return sniffed.to_string();
        }
    }

    by_extension.unwrap_or(FALLBACK_MIME).to_string()
}

/// Maps an alias such as `audio/x-wav` onto the name the category table uses.
pub fn canonical_mime_type(mime_type: &str) -> &str {
    MIME_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(mime_type))
        .map(|(_, canonical)| *canonical)
        .unwrap_or(mime_type)
}

fn extension_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    EXTENSION_MIME_TYPES
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime)| *mime)
}
