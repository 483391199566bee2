use crate::model::AssembledProfile;

/// Drop samples whose timestamp falls outside the open interval
/// `(min_ts, max_ts)`, together with their time deltas.
///
/// Sample times are stored as deltas, so the walk runs backward from
/// `end_time`: each sample's membership is tested against the running time
/// *before* stepping over its own delta. Nodes, `start_time`, and `end_time`
/// are returned as they were — whether the overall bounds should shrink is
/// the caller's decision.
pub fn crop_samples(profile: &AssembledProfile, min_ts: i64, max_ts: i64) -> AssembledProfile {
    let len = profile.samples.len().min(profile.time_deltas.len());

    let mut kept = vec![false; len];
    let mut current_time = profile.end_time;
    for index in (0..len).rev() {
        kept[index] = current_time > min_ts && current_time < max_ts;
        current_time -= profile.time_deltas[index];
    }

    let mut samples = Vec::with_capacity(len);
    let mut time_deltas = Vec::with_capacity(len);
    for index in 0..len {
        if kept[index] {
            samples.push(profile.samples[index]);
            time_deltas.push(profile.time_deltas[index]);
        }
    }

    let mut cropped = profile.clone();
    cropped.samples = samples;
    cropped.time_deltas = time_deltas;
    cropped
}
