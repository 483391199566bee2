//! Trace file loading and saving.
//!
//! Traces arrive either as a bare JSON array of records or as an object
//! holding a `traceEvents` array plus optional `metadata`, possibly wrapped
//! in a gzip container. Saving writes one record per line so a very large
//! trace never has to exist as a single in-memory string, and stays
//! diff-friendly.

use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use serde_json::Value;
use thiserror::Error;

use crate::model::{AssembledProfile, TraceRecord};

const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to read trace: {0}")]
    NotReadable(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected top-level key {0:?} (only traceEvents and metadata are allowed)")]
    UnrecognizedTraceShape(String),
    #[error("no traceEvents array")]
    NoTraceEventsArray,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A loaded trace: the record array plus optional top-level metadata.
#[derive(Debug, Clone, Default)]
pub struct TraceFile {
    pub trace_events: Vec<TraceRecord>,
    pub metadata: Option<Value>,
}

/// Load a trace from disk, transparently inflating a gzip container.
pub fn load_trace_file(path: &Path) -> Result<TraceFile, LoadError> {
    let data = fs::read(path)?;
    parse_trace_bytes(&data)
}

/// Parse raw trace bytes: gzip sniff, then either top-level shape.
pub fn parse_trace_bytes(data: &[u8]) -> Result<TraceFile, LoadError> {
    if data.starts_with(&GZIP_MAGIC) {
        let mut inflated = Vec::new();
        GzDecoder::new(data).read_to_end(&mut inflated)?;
        return parse_trace_json(&inflated);
    }
    parse_trace_json(data)
}

fn parse_trace_json(data: &[u8]) -> Result<TraceFile, LoadError> {
    let value: Value = serde_json::from_slice(data)?;
    let (events, metadata) = match value {
        Value::Array(_) => (value, None),
        Value::Object(mut object) => {
            let events = object
                .remove("traceEvents")
                .ok_or(LoadError::NoTraceEventsArray)?;
            let metadata = object.remove("metadata");
            if let Some(stray) = object.keys().next() {
                return Err(LoadError::UnrecognizedTraceShape(stray.clone()));
            }
            (events, metadata)
        }
        _ => return Err(LoadError::NoTraceEventsArray),
    };

    let trace_events: Vec<TraceRecord> = serde_json::from_value(events)?;
    if trace_events.is_empty() {
        return Err(LoadError::NoTraceEventsArray);
    }
    Ok(TraceFile {
        trace_events,
        metadata,
    })
}

/// Serialize a trace with one record per line inside the `traceEvents`
/// array, followed by pretty-printed `metadata` when present.
pub fn write_trace<W: Write>(mut out: W, trace: &TraceFile) -> Result<(), SaveError> {
    out.write_all(b"{\"traceEvents\": [\n")?;
    for (index, record) in trace.trace_events.iter().enumerate() {
        if index > 0 {
            out.write_all(b",\n")?;
        }
        out.write_all(b"  ")?;
        serde_json::to_writer(&mut out, record)?;
    }
    out.write_all(b"\n]")?;
    if let Some(metadata) = &trace.metadata {
        out.write_all(b",\n\"metadata\": ")?;
        serde_json::to_writer_pretty(&mut out, metadata)?;
    }
    out.write_all(b"}\n")?;
    Ok(())
}

pub fn save_trace_file(path: &Path, trace: &TraceFile) -> Result<(), SaveError> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    write_trace(&mut out, trace)?;
    out.flush()?;
    Ok(())
}

/// Serialize an assembled profile as a `.cpuprofile` file. These are small
/// relative to traces, so a single-shot write is fine.
pub fn save_cpuprofile(path: &Path, profile: &AssembledProfile) -> Result<(), SaveError> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer(&mut out, profile)?;
    out.flush()?;
    Ok(())
}
