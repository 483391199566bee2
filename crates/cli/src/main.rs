use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use tracekit_core::cpuprofile::{assemble_profiles, crop_samples, rebuild_children};
use tracekit_core::io::{TraceFile, load_trace_file, save_cpuprofile, save_trace_file};
use tracekit_core::model::{ProfileKey, TraceRecord};
use tracekit_core::sort::filtered_trace_sort;

#[derive(Parser)]
#[command(
    name = "tracekit",
    version,
    about = "Inspect, winnow, and convert browser performance traces"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-save a trace with one record per line.
    Format { trace: PathBuf },
    /// Filter and causally re-sort a trace, then re-save it.
    Winnow {
        trace: PathBuf,
        /// Keep only records after this timestamp (µs); metadata and
        /// profiler records always survive.
        #[arg(long)]
        min_ts: Option<i64>,
        /// Keep only records before this timestamp (µs).
        #[arg(long)]
        max_ts: Option<i64>,
        /// Drop records with this exact name. Repeatable.
        #[arg(long = "drop-name")]
        drop_names: Vec<String>,
    },
    /// Reassemble embedded CPU profiles into .cpuprofile files.
    Extract {
        trace: PathBuf,
        /// Crop the sample stream to after this timestamp (µs).
        #[arg(long)]
        min_ts: Option<i64>,
        /// Crop the sample stream to before this timestamp (µs).
        #[arg(long)]
        max_ts: Option<i64>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Format { trace } => format_trace(&trace),
        Command::Winnow {
            trace,
            min_ts,
            max_ts,
            drop_names,
        } => winnow_trace(&trace, min_ts, max_ts, &drop_names),
        Command::Extract {
            trace,
            min_ts,
            max_ts,
        } => extract_profiles(&trace, min_ts, max_ts),
    }
}

fn format_trace(path: &Path) -> Result<()> {
    let trace = load_trace_file(path)?;
    log::info!("reformatting {} records", trace.trace_events.len());
    let out = with_suffix(path, "formatted");
    save_trace_file(&out, &trace)?;
    log::info!("written: {}", out.display());
    Ok(())
}

fn winnow_trace(
    path: &Path,
    min_ts: Option<i64>,
    max_ts: Option<i64>,
    drop_names: &[String],
) -> Result<()> {
    let trace = load_trace_file(path)?;
    let before = trace.trace_events.len();

    let sorted = filtered_trace_sort(&trace.trace_events, |record| {
        keep_record(record, min_ts, max_ts, drop_names)
    });
    log::info!("record count: {before} ==> {}", sorted.len());

    let out = with_suffix(path, "winnowed");
    save_trace_file(
        &out,
        &TraceFile {
            trace_events: sorted,
            metadata: trace.metadata,
        },
    )?;
    log::info!("written: {}", out.display());
    Ok(())
}

/// The winnow keep-predicate. With no window set this keeps everything not
/// explicitly dropped. With a window, records outside it are shed except the
/// ones a viewer needs to still make sense of the file: metadata, the time
/// origin, and profiler records (their samples get cropped by `extract`, not
/// here).
fn keep_record(
    record: &TraceRecord,
    min_ts: Option<i64>,
    max_ts: Option<i64>,
    drop_names: &[String],
) -> bool {
    if drop_names.iter().any(|name| name == &record.name) {
        return false;
    }
    if min_ts.is_none() && max_ts.is_none() {
        return true;
    }
    record.ts == 0
        || record.cat == "__metadata"
        || record.name.starts_with("Profile")
        || (min_ts.is_none_or(|min| record.ts > min) && max_ts.is_none_or(|max| record.ts < max))
}

fn extract_profiles(path: &Path, min_ts: Option<i64>, max_ts: Option<i64>) -> Result<()> {
    let trace = load_trace_file(path)?;
    let profiler_records: Vec<TraceRecord> = trace
        .trace_events
        .iter()
        .filter(|record| record.has_category("v8.cpu_profiler"))
        .cloned()
        .collect();
    if profiler_records.is_empty() {
        bail!("no v8.cpu_profiler records in {}", path.display());
    }

    let mut written = 0usize;
    for result in assemble_profiles(&profiler_records) {
        let mut profile = match result {
            Ok(profile) => profile,
            Err(error) => {
                log::warn!("skipping capture: {error}");
                continue;
            }
        };
        if let Err(error) = rebuild_children(&mut profile.nodes) {
            log::warn!("skipping capture {}: {error}", profile.key);
            continue;
        }
        if min_ts.is_some() || max_ts.is_some() {
            profile = crop_samples(
                &profile,
                min_ts.unwrap_or(i64::MIN),
                max_ts.unwrap_or(i64::MAX),
            );
        }

        let out = cpuprofile_path(path, &profile.key);
        save_cpuprofile(&out, &profile)?;
        log::info!(
            "written: {} ({} nodes, {} samples)",
            out.display(),
            profile.nodes.len(),
            profile.samples.len()
        );
        written += 1;
    }

    if written == 0 {
        bail!("no profiles could be assembled from {}", path.display());
    }
    Ok(())
}

fn with_suffix(path: &Path, tag: &str) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "trace".to_string(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!("{name}.{tag}.json"))
}

fn cpuprofile_path(path: &Path, key: &ProfileKey) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(|| "trace".to_string(), |s| s.to_string_lossy().into_owned());
    path.with_file_name(format!("{stem}-{}-{}.cpuprofile", key.pid, key.tid))
}
