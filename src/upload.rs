use crate::constants::{DEFAULT_FIELD_NAME, UPLOAD_CHUNK_SIZE};
use crate::error::{Result, TransportError, UploadError};
use crate::file::FileHandle;
use crate::utils::percent_of;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Upload progress callback: `(percent, bytes_sent, bytes_total)`.
pub type ProgressFn = Arc<dyn Fn(f64, u64, u64) + Send + Sync>;

/// Body returned by the endpoint: parsed JSON when possible, raw text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerResponse {
    Json(serde_json::Value),
    Text(String),
}

impl ServerResponse {
    fn from_body(body: String) -> Self {
        match serde_json::from_str(&body) {
            Ok(value) => ServerResponse::Json(value),
            Err(_) => ServerResponse::Text(body),
        }
    }
}

impl fmt::Display for ServerResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerResponse::Json(value) => write!(f, "{}", value),
            ServerResponse::Text(text) => write!(f, "{}", text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Post,
    Put,
    Patch,
}

impl HttpMethod {
    fn as_reqwest(&self) -> reqwest::Method {
        match self {
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            _ => Err(UploadError::Config(format!("Unsupported upload method: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportOptions {
    pub method: HttpMethod,
    pub field_name: String,
    pub headers: Vec<(String, String)>,
    /// Per-upload deadline. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            method: HttpMethod::Post,
            field_name: DEFAULT_FIELD_NAME.to_string(),
            headers: Vec::new(),
            timeout: None,
        }
    }
}

/// Sends one file to one endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn upload(
        &self,
        file: &FileHandle,
        endpoint: &str,
        options: &TransportOptions,
        on_progress: ProgressFn,
        cancel: &CancellationToken,
    ) -> std::result::Result<ServerResponse, TransportError>;
}

/// Multipart/form-data upload over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn upload(
        &self,
        file: &FileHandle,
        endpoint: &str,
        options: &TransportOptions,
        on_progress: ProgressFn,
        cancel: &CancellationToken,
    ) -> std::result::Result<ServerResponse, TransportError> {
        let total = file.size_bytes();
        let part = Part::stream_with_length(progress_body(file.data().clone(), on_progress.clone()), total)
            .file_name(file.name().to_string())
            .mime_str(file.mime_type())?;
        let form = Form::new().part(options.field_name.clone(), part);

        let mut request = self
            .client
            .request(options.method.as_reqwest(), endpoint)
            .multipart(form);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        tracing::debug!(file = %file.name(), endpoint, size = total, "Starting upload");

        let send = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, TransportError>((status, body))
        };

        let exchange = async {
            match options.timeout {
                Some(limit) => match tokio::time::timeout(limit, send).await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout(limit)),
                },
                None => send.await,
            }
        };

        let (status, body) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Aborted),
            result = exchange => result?,
        };

        if !status.is_success() {
            return Err(TransportError::Status {
                code: status.as_u16(),
                body,
            });
        }

        if total == 0 {
            on_progress(100.0, 0, 0);
        }

        Ok(ServerResponse::from_body(body))
    }
}

/// Streams `data` in fixed-size chunks, reporting each chunk as it is pulled
/// by the connection.
fn progress_body(data: Bytes, on_progress: ProgressFn) -> reqwest::Body {
    let total = data.len() as u64;
    let chunks: Vec<Bytes> = (0..data.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| data.slice(start..(start + UPLOAD_CHUNK_SIZE).min(data.len())))
        .collect();

    let mut sent = 0u64;
    let stream = futures::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len() as u64;
        on_progress(percent_of(sent, total), sent, total);
        Ok::<Bytes, std::io::Error>(chunk)
    });

    reqwest::Body::wrap_stream(stream)
}
