//! Observability: compile counters and the sink they flow through.
//!
//! Compiler code never touches `metrics` directly; it records
//! `CompileEvent`s and the active sink decides what to do with them.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{CompileReport, ModelCounters};
pub use sink::{CompileEvent, CompileSink, compile_report, compile_reset_all, with_compile_sink};

pub(crate) use sink::record;
