use std::collections::HashSet;

use thiserror::Error;

use crate::model::{AssembledProfile, ProfileKey, RecordPayload, TraceRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error("no Profile header record for {0}")]
    MissingProfileHeader(ProfileKey),
    #[error("no ProfileChunk records for {0}")]
    NoChunkEventsFound(ProfileKey),
}

/// Reassemble every sampling profile found in `records`.
///
/// One result per distinct `(flow id, pid, tid)` triple. Headers declare the
/// triple; chunks match their header on flow id and pid only, because the
/// platform may emit them from a different thread than the header. A failed
/// capture never aborts its siblings.
///
/// Chunk arrays are appended in the order the caller passes them — run the
/// records through `filtered_trace_sort` first if causal order matters.
pub fn assemble_profiles(records: &[TraceRecord]) -> Vec<Result<AssembledProfile, AssembleError>> {
    let mut keys: Vec<ProfileKey> = Vec::new();
    let mut seen: HashSet<ProfileKey> = HashSet::new();

    // Header triples in appearance order, then orphan chunk triples so a
    // chunk whose header is missing still surfaces as an error.
    for record in records {
        if record.name == "Profile" {
            let key = key_of(record);
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
    }
    for record in records {
        if record.name == "ProfileChunk"
            && !keys
                .iter()
                .any(|k| k.flow_id == record.id && k.pid == record.pid)
        {
            let key = key_of(record);
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
    }

    keys.into_iter()
        .map(|key| assemble_one(records, key))
        .collect()
}

fn key_of(record: &TraceRecord) -> ProfileKey {
    ProfileKey {
        flow_id: record.id.clone(),
        pid: record.pid,
        tid: record.tid,
    }
}

fn assemble_one(
    records: &[TraceRecord],
    key: ProfileKey,
) -> Result<AssembledProfile, AssembleError> {
    let header = records
        .iter()
        .find(|r| {
            r.name == "Profile" && r.id == key.flow_id && r.pid == key.pid && r.tid == key.tid
        })
        .ok_or_else(|| AssembleError::MissingProfileHeader(key.clone()))?;

    let chunks: Vec<&TraceRecord> = records
        .iter()
        .filter(|r| r.name == "ProfileChunk" && r.id == key.flow_id && r.pid == key.pid)
        .collect();
    if chunks.is_empty() {
        return Err(AssembleError::NoChunkEventsFound(key));
    }

    let mut profile = AssembledProfile {
        key,
        nodes: Vec::new(),
        start_time: -1,
        end_time: -1,
        samples: Vec::new(),
        time_deltas: Vec::new(),
    };

    // Overlay whatever the header declares on top of the defaults.
    if let RecordPayload::ProfileHeader(head) = header.payload() {
        if let Some(t) = head.start_time {
            profile.start_time = t;
        }
        if let Some(t) = head.end_time {
            profile.end_time = t;
        }
        if let Some(nodes) = head.nodes {
            profile.nodes = nodes;
        }
        if let Some(samples) = head.samples {
            profile.samples = samples;
        }
        if let Some(deltas) = head.time_deltas {
            profile.time_deltas = deltas;
        }
    }

    for chunk in &chunks {
        match chunk.payload() {
            RecordPayload::ProfileChunk(data) => {
                profile.nodes.extend(data.cpu_profile.nodes);
                profile.samples.extend(data.cpu_profile.samples);
                profile.time_deltas.extend(data.time_deltas);
                // A zero endTime is as good as absent.
                if let Some(end) = data.cpu_profile.end_time
                    && end != 0
                {
                    profile.end_time = end;
                }
            }
            _ => {
                log::warn!(
                    "malformed ProfileChunk payload for {}; treating as empty",
                    profile.key
                );
            }
        }
    }

    // No chunk declared an end time: derive it from the sample stream.
    if profile.end_time == -1 {
        profile.end_time = profile.start_time + profile.time_deltas.iter().sum::<i64>();
    }

    // Viewers require a url on every call frame.
    for node in &mut profile.nodes {
        if node.call_frame.url.is_none() {
            node.call_frame.url = Some(String::new());
        }
    }

    // Samples and deltas are parallel arrays; a truncated capture can leave
    // them ragged, so clip both to the shorter length.
    if profile.samples.len() != profile.time_deltas.len() {
        let keep = profile.samples.len().min(profile.time_deltas.len());
        log::warn!(
            "{}: {} samples vs {} timeDeltas, clipping to {keep}",
            profile.key,
            profile.samples.len(),
            profile.time_deltas.len()
        );
        profile.samples.truncate(keep);
        profile.time_deltas.truncate(keep);
    }

    Ok(profile)
}
