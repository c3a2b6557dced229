//! Compile sink boundary.
//!
//! All instrumentation flows through `CompileEvent` and `CompileSink`. The
//! default sink folds events into the thread-local `CompileReport`; tests
//! can install a scoped override.

use crate::{
    obs::metrics::{self, CompileReport},
    statement::StatementKind,
};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn CompileSink>>> = RefCell::new(None);
}

///
/// CompileEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompileEvent<'a> {
    StatementCompiled { kind: StatementKind, model: &'a str },
    JoinNodeCreated { model: &'a str },
    ExistsSubquery { model: &'a str },
    CompileFailed { kind: StatementKind },
}

///
/// CompileSink
///

pub trait CompileSink {
    fn record(&self, event: CompileEvent<'_>);
}

/// GlobalCompileSink
/// Writes into the thread-local counters when no override is installed.

pub(crate) struct GlobalCompileSink;

impl CompileSink for GlobalCompileSink {
    fn record(&self, event: CompileEvent<'_>) {
        metrics::with_state_mut(|m| match event {
            CompileEvent::StatementCompiled { kind, model } => {
                m.ops.bump_kind(kind);
                let entry = m.models.entry(model.to_string()).or_default();
                entry.statements = entry.statements.saturating_add(1);
            }
            CompileEvent::JoinNodeCreated { model } => {
                m.ops.join_nodes = m.ops.join_nodes.saturating_add(1);
                let entry = m.models.entry(model.to_string()).or_default();
                entry.joined = entry.joined.saturating_add(1);
            }
            CompileEvent::ExistsSubquery { model } => {
                m.ops.exists_subqueries = m.ops.exists_subqueries.saturating_add(1);
                let entry = m.models.entry(model.to_string()).or_default();
                entry.exists_subqueries = entry.exists_subqueries.saturating_add(1);
            }
            CompileEvent::CompileFailed { .. } => {
                m.ops.failures = m.ops.failures.saturating_add(1);
            }
        });
    }
}

pub(crate) const GLOBAL_COMPILE_SINK: GlobalCompileSink = GlobalCompileSink;

pub(crate) fn record(event: CompileEvent<'_>) {
    let current = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match current {
        Some(sink) => sink.record(event),
        None => GLOBAL_COMPILE_SINK.record(event),
    }
}

/// Snapshot the counters of the current thread.
#[must_use]
pub fn compile_report() -> CompileReport {
    metrics::report()
}

/// Clear the counters of the current thread.
pub fn compile_reset_all() {
    metrics::reset_all();
}

/// Run a closure with `sink` receiving every event recorded on this thread.
/// The previous sink is restored on exit, including unwinds.
pub fn with_compile_sink<T>(sink: Rc<dyn CompileSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn CompileSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| *cell.borrow_mut() = prev);
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///
