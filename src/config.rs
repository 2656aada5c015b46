use crate::batch::BatchOptions;
use crate::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_FIELD_NAME, DEFAULT_MAX_FILES, DEFAULT_MAX_HEIGHT,
    DEFAULT_MAX_WIDTH, DEFAULT_METHOD, DEFAULT_OUTPUT_MIME, DEFAULT_QUALITY,
};
use crate::error::{Result, UploadError};
use crate::processing::CompressionOptions;
use crate::upload::{HttpMethod, TransportOptions};
use crate::validation::BatchPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Upload settings, loadable from TOML. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_files: usize,
    pub allowed_types: Vec<String>,
    pub max_size: Option<u64>,
    pub max_total_size: Option<u64>,
    pub concurrency: usize,
    pub timeout_secs: Option<u64>,
    pub compress: bool,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: f32,
    pub format: String,
    pub field_name: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            allowed_types: Vec::new(),
            max_size: None,
            max_total_size: None,
            concurrency: DEFAULT_CONCURRENCY,
            timeout_secs: None,
            compress: false,
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            quality: DEFAULT_QUALITY,
            format: DEFAULT_OUTPUT_MIME.to_string(),
            field_name: DEFAULT_FIELD_NAME.to_string(),
            method: DEFAULT_METHOD.to_string(),
            headers: BTreeMap::new(),
        }
    }
}

impl UploadConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| UploadError::Config(e.to_string()))
    }

    pub async fn from_toml_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(UploadError::FileNotFound(path.to_path_buf()));
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded upload configuration");
        Ok(config)
    }

    pub fn to_policy(&self) -> BatchPolicy {
        BatchPolicy {
            max_files: self.max_files,
            allowed_types: self.allowed_types.clone(),
            max_size: self.max_size,
            max_total_size: self.max_total_size,
        }
    }

    pub fn to_compression_options(&self) -> Result<CompressionOptions> {
        CompressionOptions::new(
            Some(self.quality),
            Some(self.max_width),
            Some(self.max_height),
            Some(&self.format),
        )
    }

    pub fn to_transport_options(&self) -> Result<TransportOptions> {
        if self.field_name.trim().is_empty() {
            return Err(UploadError::Config("field_name must not be empty".to_string()));
        }

        Ok(TransportOptions {
            method: HttpMethod::from_str(&self.method)?,
            field_name: self.field_name.clone(),
            headers: self
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        })
    }

    pub fn to_batch_options(&self) -> Result<BatchOptions> {
        let compression = if self.compress {
            Some(self.to_compression_options()?)
        } else {
            None
        };

        Ok(BatchOptions {
            concurrency: self.concurrency,
            compression,
            transport: self.to_transport_options()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::OutputFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = UploadConfig::default();
        assert_eq!(config.max_files, 10);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.quality, 0.8);
        assert_eq!(config.format, "image/jpeg");

        let options = config.to_batch_options().unwrap();
        assert!(options.compression.is_none());
        assert_eq!(options.transport.method, HttpMethod::Post);
        assert_eq!(options.transport.field_name, "file");
        assert!(options.transport.timeout.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = UploadConfig::from_toml_str(
            r#"
            concurrency = 5
            compress = true
            format = "webp"
            timeout_secs = 30
            method = "put"

            [headers]
            Authorization = "Bearer abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_files, 10);
        let options = config.to_batch_options().unwrap();
        assert_eq!(options.concurrency, 5);
        assert_eq!(options.compression.unwrap().format, OutputFormat::WebP);
        assert_eq!(options.transport.method, HttpMethod::Put);
        assert_eq!(options.transport.timeout, Some(Duration::from_secs(30)));
        assert_eq!(
            options.transport.headers,
            vec![("Authorization".to_string(), "Bearer abc".to_string())]
        );
    }

    #[test]
    fn test_policy_conversion() {
        let config = UploadConfig {
            max_files: 2,
            allowed_types: vec!["image/png".to_string()],
            max_total_size: Some(1024),
            ..UploadConfig::default()
        };
        let policy = config.to_policy();
        assert_eq!(policy.max_files, 2);
        assert_eq!(policy.allowed_types, vec!["image/png"]);
        assert_eq!(policy.max_total_size, Some(1024));
        assert_eq!(policy.max_size, None);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            UploadConfig::from_toml_str("concurrency = \"many\""),
            Err(UploadError::Config(_))
        ));

        let bad_method = UploadConfig {
            method: "DELETE".to_string(),
            ..UploadConfig::default()
        };
        assert!(bad_method.to_transport_options().is_err());

        let bad_quality = UploadConfig {
            compress: true,
            quality: 1.5,
            ..UploadConfig::default()
        };
        assert!(matches!(
            bad_quality.to_batch_options(),
            Err(UploadError::InvalidQuality(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_files = 3\nfield_name = \"attachment\"").unwrap();

        let config = UploadConfig::from_toml_file(file.path()).await.unwrap();
        assert_eq!(config.max_files, 3);
        assert_eq!(config.field_name, "attachment");

        let missing = UploadConfig::from_toml_file(Path::new("/nonexistent/upload.toml")).await;
        assert!(matches!(missing, Err(UploadError::FileNotFound(_))));
    }
}
