//! Scalar metrics logging.
//!
//! Per-epoch scalars (train loss, validation loss, learning rate) are written
//! as JSON lines so downstream tooling can ingest them without parsing the
//! text log.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One logged scalar value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalarRecord {
    pub tag: String,
    pub value: f64,
    pub step: usize,
}

/// Sink for per-epoch scalar metrics.
pub trait MetricsSink {
    fn log_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()>;
}

/// Appends scalar records to `metrics.jsonl` in the log directory.
pub struct JsonlMetricsWriter {
    writer: BufWriter<File>,
}

impl JsonlMetricsWriter {
    pub fn new(log_dir: &Path) -> Result<Self> {
        fs::create_dir_all(log_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("metrics.jsonl"))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl MetricsSink for JsonlMetricsWriter {
    fn log_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        let record = ScalarRecord {
            tag: tag.to_string(),
            value,
            step,
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Discards all scalars. Used when metrics logging is disabled.
pub struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn log_scalar(&mut self, _tag: &str, _value: f64, _step: usize) -> Result<()> {
        Ok(())
    }
}
