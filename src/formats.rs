/// Image format utilities and type-safe format handling
///
/// Output formats the compressor can re-encode to, addressed either by MIME
/// type (`image/webp`) or by short name (`webp`).
use crate::error::{Result, UploadError};
use std::fmt;
use std::str::FromStr;

/// Supported output image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JPEG format with lossy compression
    Jpeg,
    /// PNG format with lossless compression
    Png,
    /// WebP format, encoded losslessly
    WebP,
}

impl OutputFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }

    /// Get format names for CLI help text
    pub fn format_names() -> Vec<&'static str> {
        vec!["jpeg", "png", "webp"]
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::WebP => "WebP",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for OutputFormat {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        let name = lower.strip_prefix("image/").unwrap_or(&lower);
        match name {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "heic" | "heif" | "avif" | "jxl" => Err(UploadError::UnsupportedFormat(format!(
                "{} output is not supported. Use one of: {}",
                s,
                OutputFormat::format_names().join(", ")
            ))),
            _ => Err(UploadError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Source MIME types the compressor can decode.
pub fn is_decodable_mime(mime_type: &str) -> bool {
    matches!(
        mime_type.to_ascii_lowercase().as_str(),
        "image/jpeg" | "image/jpg" | "image/png" | "image/webp" | "image/bmp" | "image/tiff"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("jpeg").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_str("jpg").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_str("PNG").unwrap(), OutputFormat::Png);
        assert_eq!(OutputFormat::from_str("webp").unwrap(), OutputFormat::WebP);

        assert!(OutputFormat::from_str("unsupported").is_err());
    }

    #[test]
    fn test_output_format_from_mime() {
        assert_eq!(OutputFormat::from_str("image/jpeg").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_str("image/webp").unwrap(), OutputFormat::WebP);
        assert!(OutputFormat::from_str("video/mp4").is_err());
    }

    #[test]
    fn test_modern_formats_get_helpful_message() {
        let result = OutputFormat::from_str("heic");
        if let Err(UploadError::UnsupportedFormat(msg)) = result {
            assert!(msg.contains("not supported"));
            assert!(msg.contains("webp"));
        } else {
            panic!("expected UnsupportedFormat");
        }
    }

    #[test]
    fn test_output_format_mime() {
        assert_eq!(OutputFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(OutputFormat::Png.mime_type(), "image/png");
        assert_eq!(OutputFormat::WebP.mime_type(), "image/webp");
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(format!("{}", OutputFormat::Jpeg), "JPEG");
        assert_eq!(format!("{}", OutputFormat::Png), "PNG");
        assert_eq!(format!("{}", OutputFormat::WebP), "WebP");
    }

    #[test]
    fn test_is_decodable_mime() {
        assert!(is_decodable_mime("image/jpeg"));
        assert!(is_decodable_mime("image/PNG"));
        assert!(!is_decodable_mime("image/gif"));
        assert!(!is_decodable_mime("image/svg+xml"));
    }
}
