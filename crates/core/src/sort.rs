//! Stable, phase-aware sort for trace records.
//!
//! Timestamps in a trace are not unique, and the order of records sharing
//! one decides whether a viewer sees them as properly nested. Within a run
//! of identical timestamps, `E` records must come first (they close spans
//! opened earlier), then `B`/`X` records longest-first (an enclosing span
//! must open before the spans it contains), then everything else.

use std::cmp::Ordering;

use crate::model::TraceRecord;

/// Filter `records` with `keep`, then sort them by timestamp with the
/// phase-aware tie-break applied to every run of identical timestamps.
///
/// Filtering happens first: dropped records never influence the order of the
/// ones that remain. The result is a new sequence; ties not covered by the
/// phase rules preserve arrival order, so the sort is deterministic and
/// idempotent.
pub fn filtered_trace_sort<F>(records: &[TraceRecord], keep: F) -> Vec<TraceRecord>
where
    F: Fn(&TraceRecord) -> bool,
{
    let mut sorted: Vec<&TraceRecord> = records.iter().filter(|r| keep(r)).collect();
    sorted.sort_by_key(|r| r.ts); // stable: equal timestamps keep arrival order

    let mut out: Vec<&TraceRecord> = Vec::with_capacity(sorted.len());
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start + 1;
        while end < sorted.len() && sorted[end].ts == sorted[start].ts {
            end += 1;
        }
        if end - start == 1 {
            out.push(sorted[start]);
        } else {
            rank_timestamp_group(&sorted, start, end, &mut out);
        }
        start = end;
    }

    out.into_iter().cloned().collect()
}

/// Re-rank one run of records sharing a timestamp: `E` first, then `B`/`X`
/// by descending effective duration, then the rest. Within each bucket,
/// arrival order breaks ties.
fn rank_timestamp_group<'a>(
    sorted: &[&'a TraceRecord],
    start: usize,
    end: usize,
    out: &mut Vec<&'a TraceRecord>,
) {
    let mut enders: Vec<usize> = Vec::new();
    // (position, effective duration); `None` duration = never closed.
    let mut spans: Vec<(usize, Option<i64>)> = Vec::new();
    let mut rest: Vec<usize> = Vec::new();

    for (position, record) in sorted.iter().enumerate().take(end).skip(start) {
        match record.ph.as_str() {
            "E" => enders.push(position),
            "X" => spans.push((position, Some(record.dur.unwrap_or(0)))),
            "B" => spans.push((position, begin_duration(sorted, position, end))),
            _ => rest.push(position),
        }
    }

    // Longest span first; a span that never closes outranks any bounded one.
    spans.sort_by(|a, b| match (a.1, b.1) {
        (None, None) => a.0.cmp(&b.0),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => y.cmp(&x).then(a.0.cmp(&b.0)),
    });

    out.extend(enders.iter().map(|&i| sorted[i]));
    out.extend(spans.iter().map(|&(i, _)| sorted[i]));
    out.extend(rest.iter().map(|&i| sorted[i]));
}

/// Effective duration of the `B` record at `at`, found by scanning the
/// timestamp-sorted sequence past the current tie run for the `E` that
/// closes it. A same-name `B` on the same (pid, tid) opens a nested pair,
/// so only an `E` seen at nesting depth zero is the closing one.
fn begin_duration(sorted: &[&TraceRecord], at: usize, scan_from: usize) -> Option<i64> {
    let begin = sorted[at];
    let mut depth: u32 = 0;
    for other in &sorted[scan_from..] {
        if other.name != begin.name || other.pid != begin.pid || other.tid != begin.tid {
            continue;
        }
        match other.ph.as_str() {
            "B" => depth += 1,
            "E" if depth == 0 => return Some(other.ts - begin.ts),
            "E" => depth -= 1,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(name: &str, ph: &str, ts: i64, dur: Option<i64>) -> TraceRecord {
        let mut value = json!({
            "name": name, "cat": "test", "ph": ph, "ts": ts, "pid": 1, "tid": 1
        });
        if let Some(d) = dur {
            value["dur"] = json!(d);
        }
        serde_json::from_value(value).unwrap()
    }

    fn names(records: &[TraceRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn enders_precede_openers_precede_the_rest() {
        let records = vec![
            record("instant", "I", 100, None),
            record("opener", "X", 100, Some(5)),
            record("closer", "E", 100, None),
        ];
        let sorted = filtered_trace_sort(&records, |_| true);
        assert_eq!(names(&sorted), vec!["closer", "opener", "instant"]);
    }

    #[test]
    fn tie_group_orders_by_effective_duration() {
        // X lasts 5µs; the B is closed by its E at ts 150, so it spans 50µs
        // and must open first even though it arrived later.
        let records = vec![
            record("short", "X", 100, Some(5)),
            record("long", "B", 100, None),
            record("done", "E", 100, None),
            record("long", "E", 150, None),
        ];
        let sorted = filtered_trace_sort(&records, |_| true);
        assert_eq!(names(&sorted), vec!["done", "long", "short", "long"]);
    }

    #[test]
    fn unclosed_begin_ranks_ahead_of_any_bounded_span() {
        let records = vec![
            record("bounded", "X", 100, Some(1_000_000)),
            record("unbounded", "B", 100, None),
        ];
        let sorted = filtered_trace_sort(&records, |_| true);
        assert_eq!(names(&sorted), vec!["unbounded", "bounded"]);
    }

    #[test]
    fn nested_same_name_pairs_do_not_close_the_outer_begin() {
        // The E at ts 120 closes the nested B at ts 110, not the one in the
        // tie group; the outer B spans 100µs and ranks below the 150µs X.
        let records = vec![
            record("task", "B", 100, None),
            record("wide", "X", 100, Some(150)),
            record("task", "B", 110, None),
            record("task", "E", 120, None),
            record("task", "E", 200, None),
        ];
        let sorted = filtered_trace_sort(&records, |_| true);
        assert_eq!(names(&sorted)[..2], ["wide", "task"]);
    }

    #[test]
    fn begin_only_matches_its_own_thread_and_name() {
        let mut other_thread = record("task", "E", 150, None);
        other_thread.tid = 2;
        let records = vec![
            record("task", "B", 100, None),
            record("wide", "X", 100, Some(10)),
            other_thread,
        ];
        // The only E is on another thread, so the B never closes and wins.
        let sorted = filtered_trace_sort(&records, |_| true);
        assert_eq!(names(&sorted)[..2], ["task", "wide"]);
    }

    #[test]
    fn filter_applies_before_sorting() {
        let records = vec![
            record("drop", "E", 100, None),
            record("keep", "X", 100, Some(5)),
        ];
        let sorted = filtered_trace_sort(&records, |r| r.name == "keep");
        assert_eq!(names(&sorted), vec!["keep"]);
    }

    #[test]
    fn output_is_a_permutation_and_sorting_is_idempotent() {
        let records = vec![
            record("c", "I", 300, None),
            record("a", "X", 100, Some(5)),
            record("a2", "B", 100, None),
            record("b", "E", 100, None),
            record("a2", "E", 180, None),
            record("m", "M", 0, None),
        ];
        let once = filtered_trace_sort(&records, |_| true);
        assert_eq!(once.len(), records.len());

        let twice = filtered_trace_sort(&once, |_| true);
        assert_eq!(names(&once), names(&twice));
        let ts_once: Vec<i64> = once.iter().map(|r| r.ts).collect();
        let ts_twice: Vec<i64> = twice.iter().map(|r| r.ts).collect();
        assert_eq!(ts_once, ts_twice);
    }

    #[test]
    fn already_sorted_tie_free_input_is_untouched() {
        let records = vec![
            record("a", "X", 10, Some(1)),
            record("b", "X", 20, Some(1)),
            record("c", "X", 30, Some(1)),
        ];
        let sorted = filtered_trace_sort(&records, |_| true);
        assert_eq!(names(&sorted), vec!["a", "b", "c"]);
    }
}
