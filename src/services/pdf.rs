//! PDF rendering via an external headless-browser service. The service takes
//! an HTML document and returns PDF bytes; everything layout-related lives in
//! the HTML, so this module is deliberately thin.

use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("pdf renderer unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("pdf renderer returned {status}: {detail}")]
    Service { status: u16, detail: String },
}

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}

pub struct HttpPdfRenderer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPdfRenderer {
    pub fn new(endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self { client, endpoint }
    }

    pub fn from_env() -> Self {
        let endpoint = std::env::var("PDF_RENDERER_URL")
            .unwrap_or_else(|_| "http://localhost:9222/render".to_string());
        Self::new(endpoint)
    }
}

#[async_trait]
impl PdfRenderer for HttpPdfRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "html": html,
                "options": {"format": "A4", "printBackground": true}
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RenderError::Service {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
