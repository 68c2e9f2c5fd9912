//! Outbound request to the analysis endpoint.
//!
//! The renderer only needs "send this request, give me the body as a byte
//! stream", so that is all [`Transport`] exposes. [`HttpTransport`] does it
//! with a multipart POST over reqwest.

use crate::config::GlanceConfig;
use crate::error::{GlanceError, Result};
use crate::types::{AnalyzeRequest, ImageSource};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::multipart::{Form, Part};
use std::path::Path;

/// Response body as it arrives from the network
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the response body as a chunk stream
    async fn open(&self, request: &AnalyzeRequest) -> Result<ByteStream>;
}

/// Multipart HTTP transport
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// Create a transport posting to the full analysis URL.
    ///
    /// The client has no total timeout: an analysis runs until the server
    /// finishes or the connection fails.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &GlanceConfig) -> Result<Self> {
        Self::new(config.analyze_url())
    }

    /// Build the multipart form for a request
    pub async fn build_form(request: &AnalyzeRequest) -> Result<Form> {
        let form = Form::new()
            .text("prompt", request.prompt.clone())
            .text("image_source", request.source.as_str().to_string());

        let form = match &request.source {
            ImageSource::File(path) => form.part("image_file", file_part(path).await?),
            ImageSource::Url(url) => form.text("image_url", url.clone()),
        };

        Ok(form)
    }
}

async fn file_part(path: &Path) -> Result<Part> {
    let data = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    tracing::debug!(
        "Attaching {} ({}, {} bytes)",
        file_name,
        mime,
        data.len()
    );

    Ok(Part::bytes(data)
        .file_name(file_name)
        .mime_str(mime.as_ref())?)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: &AnalyzeRequest) -> Result<ByteStream> {
        let form = Self::build_form(request).await?;

        tracing::info!(
            "Sending analysis request to {} (source: {})",
            self.url,
            request.source.as_str()
        );

        let response = self.client.post(&self.url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            // The body is still shown as-is; the server puts its error there
            tracing::warn!("Analysis endpoint returned status {}", status);
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(GlanceError::from))
            .boxed())
    }
}
