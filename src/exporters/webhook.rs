//! Rate-limited chat-webhook exporter.
//!
//! Formats a collection as a readable text block and POSTs it as a
//! `{"content": ...}` JSON payload. A configurable minimum interval gates
//! sends; a gated call is a silent success, and a failed send leaves the gate
//! open so the next scheduled tick retries.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

use crate::exporters::{ExportError, Exporter};
use crate::metrics::{Collection, Sample};

/// Width of the visible separator line heading each message.
const SEPARATOR_LEN: usize = 74;

/// At most this much of an error response body is kept for diagnostics.
const RESPONSE_BODY_LIMIT: usize = 4 * 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Webhook notifier with a stateful send gate.
pub struct WebhookExporter {
    url: String,
    client: reqwest::Client,
    min_interval: Duration,
    last_sent: Mutex<Option<Instant>>,
}

impl WebhookExporter {
    /// Build an exporter for `url`. A zero `min_interval` disables the gate.
    pub fn new(url: impl Into<String>, min_interval: Duration) -> Result<Self, ExportError> {
        let url = url.into();
        if url.is_empty() {
            return Err(ExportError::EmptyUrl);
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            url,
            client,
            min_interval,
            last_sent: Mutex::new(None),
        })
    }

    fn too_soon(&self, now: Instant) -> bool {
        if self.min_interval.is_zero() {
            return false;
        }
        let last = self.last_sent.lock().unwrap_or_else(PoisonError::into_inner);
        last.is_some_and(|prev| now.duration_since(prev) < self.min_interval)
    }

    #[cfg(test)]
    fn mark_sent(&self, at: Instant) {
        *self.last_sent.lock().unwrap() = Some(at);
    }
}

#[async_trait]
impl Exporter for WebhookExporter {
    async fn export(&self, collection: &Collection) -> Result<(), ExportError> {
        let now = Instant::now();
        if self.too_soon(now) {
            debug!("webhook send gated by minimum interval; skipping");
            return Ok(());
        }

        let message = format_message(collection);

        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { content: &message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let body = String::from_utf8_lossy(&body[..body.len().min(RESPONSE_BODY_LIMIT)])
                .into_owned();
            return Err(ExportError::Protocol {
                status: status.as_u16(),
                body,
            });
        }

        // Only a confirmed delivery closes the gate.
        *self.last_sent.lock().unwrap_or_else(PoisonError::into_inner) = Some(now);
        Ok(())
    }
}

/// Render a collection as the webhook message text.
pub fn format_message(collection: &Collection) -> String {
    let collected_at = collection
        .samples
        .iter()
        .find_map(|s| s.timestamp)
        .unwrap_or_else(Utc::now);

    let mut message = format!(
        "{}\nMetrics (collected at {}):",
        "-".repeat(SEPARATOR_LEN),
        collected_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );

    if let Some(block) = cpu_utilization_block(&collection.samples) {
        message.push('\n');
        message.push_str(&block);
    }

    for sample in &collection.samples {
        if sample.name == "cpu_utilization" {
            continue;
        }
        message.push('\n');
        message.push_str(&format_sample_line(sample));
    }

    if !collection.errors.is_empty() {
        message.push_str("\nErrors:");
        for err in &collection.errors {
            message.push_str(&format!("\n- {}: {}", err.collector_id, err.message));
        }
    }

    message
}

/// Dedicated block for utilization samples: the aggregate first, then cores
/// sorted lexicographically by identifier.
fn cpu_utilization_block(samples: &[Sample]) -> Option<String> {
    let mut overall: Option<&Sample> = None;
    let mut per_core: Vec<&Sample> = Vec::new();

    for sample in samples.iter().filter(|s| s.name == "cpu_utilization") {
        match sample.label("cpu") {
            None | Some("") | Some("total") => overall = Some(sample),
            Some(_) => per_core.push(sample),
        }
    }

    if overall.is_none() && per_core.is_empty() {
        return None;
    }

    let mut block = String::from("CPU Utilization:");
    if let Some(sample) = overall {
        block.push_str(&format!("\n- overall: {:.2}%", sample.value));
    }

    per_core.sort_by(|a, b| a.label("cpu").cmp(&b.label("cpu")));
    for sample in &per_core {
        block.push_str(&format!(
            "\n- {}: {:.2}%",
            sample.label("cpu").unwrap_or_default(),
            sample.value
        ));
    }

    Some(block)
}

fn format_sample_line(sample: &Sample) -> String {
    match sample.unit.as_str() {
        "bytes" => format!(
            "{}: {}",
            sample.name,
            format_bytes_as_gigabytes(sample.value)
        ),
        "celsius" => format!("{}: {:.3} celsius", sample.name, sample.value),
        "" => format!("{}: {:.3} (no unit)", sample.name, sample.value),
        unit => format!("{}: {:.3} {}", sample.name, sample.value, unit),
    }
}

/// Decimal gigabytes (1 GB = 1,000,000,000 bytes) with the raw count kept.
fn format_bytes_as_gigabytes(value: f64) -> String {
    let value = value.max(0.0);
    format!(
        "{:.3} gigabytes ({:.3} bytes)",
        value / 1_000_000_000.0,
        value
    )
}
