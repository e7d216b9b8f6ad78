//! Result exporters: structured console stream and chat-webhook notifier.

pub mod console;
pub mod webhook;

pub use console::ConsoleExporter;
pub use webhook::WebhookExporter;

use async_trait::async_trait;

use crate::metrics::Collection;

/// Export failures. These are surfaced to the caller for logging only; the
/// next scheduled tick is the only retry.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The webhook endpoint answered outside the 2xx range.
    #[error("webhook returned status {status}: {body}")]
    Protocol { status: u16, body: String },

    #[error("webhook url is empty")]
    EmptyUrl,

    #[error("post to webhook: {0}")]
    Http(#[from] reqwest::Error),

    #[error("encode payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("write console record: {0}")]
    Io(#[from] std::io::Error),
}

/// Consumer of a completed [`Collection`].
#[async_trait]
pub trait Exporter: Send + Sync {
    async fn export(&self, collection: &Collection) -> Result<(), ExportError>;
}
