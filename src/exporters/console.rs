//! JSON Lines console exporter.
//!
//! Emits one self-contained JSON record per collection pass, suitable for
//! piping into `jq` or a log shipper. Records are never batched.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::exporters::{ExportError, Exporter};
use crate::metrics::{Collection, CollectorError, Sample};

/// One emitted line: collection time plus the pass outcome.
#[derive(Serialize)]
struct ConsoleRecord<'a> {
    collected_at: DateTime<Utc>,
    samples: &'a [Sample],
    #[serde(skip_serializing_if = "slice_is_empty")]
    errors: &'a [CollectorError],
}

fn slice_is_empty(errors: &&[CollectorError]) -> bool {
    errors.is_empty()
}

/// Line writer over any output sink.
pub struct ConsoleExporter<W: Write + Send> {
    out: Mutex<W>,
}

impl ConsoleExporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleExporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Recover the underlying sink (used by tests to inspect output).
    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<W: Write + Send> Exporter for ConsoleExporter<W> {
    async fn export(&self, collection: &Collection) -> Result<(), ExportError> {
        let record = ConsoleRecord {
            collected_at: Utc::now(),
            samples: &collection.samples,
            errors: &collection.errors,
        };

        let line = serde_json::to_string(&record)?;

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}
