//! tracekit — inspect, winnow, and convert browser performance traces.
//!
//! The pipeline: load a trace ([`io`]), optionally filter and causally
//! re-sort its records ([`sort`]), reassemble any embedded CPU-sampling
//! profiles ([`cpuprofile`]), and save the result back out ([`io`]).

pub mod cpuprofile;
pub mod io;
pub mod model;
pub mod sort;
