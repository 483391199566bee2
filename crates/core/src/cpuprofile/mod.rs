//! Reassembly of sampling-profiler captures embedded in a trace.
//!
//! A capture arrives as one `Profile` header record plus any number of
//! `ProfileChunk` records, each carrying a bounded slice of nodes, samples,
//! and time deltas. `assemble` stitches them back into one profile per
//! capture, `call_tree` rebuilds children arrays from parent pointers, and
//! `crop` trims the sample stream to a time window.

pub mod assemble;
pub mod call_tree;
pub mod crop;

pub use assemble::{AssembleError, assemble_profiles};
pub use call_tree::{CallTreeError, rebuild_children};
pub use crop::crop_samples;
