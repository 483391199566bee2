use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Function-identity descriptor attached to a profile node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallFrame {
    #[serde(rename = "functionName", default)]
    pub function_name: String,
    /// String in saved `.cpuprofile` files, number in trace chunks.
    #[serde(rename = "scriptId", default, skip_serializing_if = "Option::is_none")]
    pub script_id: Option<Value>,
    /// Normalized to `Some("")` during assembly; viewers require the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "lineNumber", default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i64>,
    #[serde(rename = "columnNumber", default, skip_serializing_if = "Option::is_none")]
    pub column_number: Option<i64>,
}

/// One node of a sampling profile's call tree.
///
/// Canonical profiles carry `children`; chunked profiles encode the tree as
/// `parent` pointers only, repaired later by `rebuild_children`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileNode {
    pub id: u64,
    #[serde(rename = "callFrame")]
    pub call_frame: CallFrame,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
    #[serde(rename = "hitCount", default, skip_serializing_if = "Option::is_none")]
    pub hit_count: Option<u64>,
    /// Uninterpreted fields (`positionTicks`, `deoptReason`, …).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Identity of one profiler capture within a trace.
///
/// Chunks are matched to their header by flow id and pid only; the platform
/// may emit them from a different thread than the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProfileKey {
    pub flow_id: Option<String>,
    pub pid: u64,
    pub tid: u64,
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.flow_id {
            Some(flow) => write!(f, "pid {} tid {} flow {}", self.pid, self.tid, flow),
            None => write!(f, "pid {} tid {}", self.pid, self.tid),
        }
    }
}

/// A sampling profile reassembled from a header and its chunks.
///
/// Serializes to the `Profiler.Profile` shape of a `.cpuprofile` file.
/// `samples` and `time_deltas` are parallel arrays and stay the same length
/// through assembly, repair, and cropping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledProfile {
    #[serde(skip)]
    pub key: ProfileKey,
    pub nodes: Vec<ProfileNode>,
    pub start_time: i64,
    pub end_time: i64,
    pub samples: Vec<u64>,
    pub time_deltas: Vec<i64>,
}

impl AssembledProfile {
    pub fn duration(&self) -> i64 {
        self.end_time - self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_serializes_with_wire_names() {
        let profile = AssembledProfile {
            key: ProfileKey {
                flow_id: Some("0x1".to_string()),
                pid: 1,
                tid: 1,
            },
            nodes: vec![ProfileNode {
                id: 1,
                call_frame: CallFrame {
                    function_name: "(root)".to_string(),
                    script_id: None,
                    url: Some(String::new()),
                    line_number: None,
                    column_number: None,
                },
                children: Some(vec![]),
                parent: None,
                hit_count: None,
                extra: serde_json::Map::new(),
            }],
            start_time: 100,
            end_time: 200,
            samples: vec![1],
            time_deltas: vec![100],
        };

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(
            value,
            json!({
                "nodes": [{"id": 1, "callFrame": {"functionName": "(root)", "url": ""}, "children": []}],
                "startTime": 100,
                "endTime": 200,
                "samples": [1],
                "timeDeltas": [100]
            })
        );
    }

    #[test]
    fn node_round_trips_parent_pointer_encoding() {
        let raw = json!({
            "id": 2,
            "callFrame": {"functionName": "work", "scriptId": 0, "url": "app.js"},
            "parent": 1
        });
        let node: ProfileNode = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(node.parent, Some(1));
        assert!(node.children.is_none());
        assert_eq!(serde_json::to_value(&node).unwrap(), raw);
    }
}
