use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::profile::ProfileNode;

/// One timestamped entry in a performance trace log.
///
/// Field names follow the on-disk JSON (`name`, `cat`, `ph`, `ts`, `dur`,
/// `pid`, `tid`, `id`, `args`). Fields the core does not interpret are kept
/// in `extra` so a load → save round trip does not shed them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    #[serde(default)]
    pub name: String,
    /// Comma-joined category tags.
    #[serde(default)]
    pub cat: String,
    /// Single-character phase code (`B`, `E`, `X`, `I`, `M`, `b`, `e`, `n`, …).
    #[serde(default)]
    pub ph: String,
    /// Timestamp in microseconds. Not unique — records routinely share one.
    #[serde(default)]
    pub ts: i64,
    /// Wall duration in microseconds; only meaningful for `X` records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dur: Option<i64>,
    #[serde(default)]
    pub pid: u64,
    #[serde(default)]
    pub tid: u64,
    /// Flow id correlating a `Profile` header with its `ProfileChunk`s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    /// Uninterpreted fields (`tts`, `s`, `scope`, …), passed through as is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl TraceRecord {
    /// Substring match over the comma-joined category list.
    pub fn has_category(&self, tag: &str) -> bool {
        self.cat.contains(tag)
    }

    pub fn is_phase(&self, phase: &str) -> bool {
        self.ph == phase
    }

    /// Typed view of `args`, keyed by the record name. Payloads that do not
    /// match their record's expected shape fall back to `Opaque`.
    pub fn payload(&self) -> RecordPayload {
        match (self.name.as_str(), &self.args) {
            ("Profile", Some(args)) => {
                match serde_json::from_value::<ArgsData<ProfileHeaderData>>(args.clone()) {
                    Ok(wrapped) => RecordPayload::ProfileHeader(wrapped.data),
                    Err(_) => RecordPayload::Opaque(self.args.clone()),
                }
            }
            ("ProfileChunk", Some(args)) => {
                match serde_json::from_value::<ArgsData<ProfileChunkData>>(args.clone()) {
                    Ok(wrapped) => RecordPayload::ProfileChunk(wrapped.data),
                    Err(_) => RecordPayload::Opaque(self.args.clone()),
                }
            }
            _ => RecordPayload::Opaque(self.args.clone()),
        }
    }
}

/// The known payload shapes, with an opaque fallback for everything else.
#[derive(Debug)]
pub enum RecordPayload {
    /// `name == "Profile"` — the capture's initial metadata.
    ProfileHeader(ProfileHeaderData),
    /// `name == "ProfileChunk"` — one bounded slice of the sample stream.
    ProfileChunk(ProfileChunkData),
    Opaque(Option<Value>),
}

#[derive(Debug, Deserialize)]
struct ArgsData<T> {
    data: T,
}

/// Fields a `Profile` header may declare up front. Everything is optional;
/// whatever is present overlays the assembly defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileHeaderData {
    #[serde(rename = "startTime")]
    pub start_time: Option<i64>,
    #[serde(rename = "endTime")]
    pub end_time: Option<i64>,
    pub nodes: Option<Vec<ProfileNode>>,
    pub samples: Option<Vec<u64>>,
    #[serde(rename = "timeDeltas")]
    pub time_deltas: Option<Vec<i64>>,
}

/// One `ProfileChunk` payload. Nodes and samples arrive inside the
/// `cpuProfile` sub-object while `timeDeltas` sits beside it — that
/// asymmetry is the emitter's, and it round-trips unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChunkData {
    #[serde(rename = "cpuProfile", default)]
    pub cpu_profile: ChunkCpuProfile,
    #[serde(rename = "timeDeltas", default)]
    pub time_deltas: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkCpuProfile {
    #[serde(default)]
    pub nodes: Vec<ProfileNode>,
    #[serde(default)]
    pub samples: Vec<u64>,
    #[serde(rename = "endTime")]
    pub end_time: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> TraceRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn round_trip_preserves_unknown_fields() {
        let raw = json!({
            "name": "RunTask", "cat": "toplevel", "ph": "X",
            "ts": 100, "dur": 5, "pid": 1, "tid": 2,
            "tts": 42, "s": "t"
        });
        let parsed = record(raw.clone());
        assert_eq!(parsed.extra.get("tts"), Some(&json!(42)));

        let back = serde_json::to_value(&parsed).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn header_payload_is_typed() {
        let header = record(json!({
            "name": "Profile", "cat": "disabled-by-default-v8.cpu_profiler",
            "ph": "P", "ts": 100, "pid": 10, "tid": 1, "id": "0x2",
            "args": {"data": {"startTime": 100}}
        }));
        match header.payload() {
            RecordPayload::ProfileHeader(data) => {
                assert_eq!(data.start_time, Some(100));
                assert_eq!(data.end_time, None);
            }
            other => panic!("expected header payload, got {other:?}"),
        }
    }

    #[test]
    fn chunk_payload_keeps_deltas_outside_cpu_profile() {
        let chunk = record(json!({
            "name": "ProfileChunk", "cat": "disabled-by-default-v8.cpu_profiler",
            "ph": "P", "ts": 200, "pid": 10, "tid": 1, "id": "0x2",
            "args": {"data": {
                "cpuProfile": {"nodes": [], "samples": [1, 1]},
                "timeDeltas": [10, 20]
            }}
        }));
        match chunk.payload() {
            RecordPayload::ProfileChunk(data) => {
                assert_eq!(data.cpu_profile.samples, vec![1, 1]);
                assert_eq!(data.time_deltas, vec![10, 20]);
            }
            other => panic!("expected chunk payload, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_payload_falls_back_to_opaque() {
        let broken = record(json!({
            "name": "ProfileChunk", "ph": "P", "ts": 0, "pid": 1, "tid": 1,
            "args": {"data": 5}
        }));
        assert!(matches!(broken.payload(), RecordPayload::Opaque(_)));

        let plain = record(json!({
            "name": "RunTask", "ph": "X", "ts": 0, "pid": 1, "tid": 1
        }));
        assert!(matches!(plain.payload(), RecordPayload::Opaque(None)));
    }

    #[test]
    fn category_match_is_substring() {
        let event = record(json!({
            "name": "Profile", "cat": "disabled-by-default-v8.cpu_profiler",
            "ph": "P", "ts": 0, "pid": 1, "tid": 1
        }));
        assert!(event.has_category("v8.cpu_profiler"));
        assert!(!event.has_category("netlog"));
    }
}
