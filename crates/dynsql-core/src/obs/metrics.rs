use crate::statement::StatementKind;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// CompileReport
/// Ephemeral, thread-local counters for compile calls.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CompileReport {
    pub ops: CompileOps,
    pub models: BTreeMap<String, ModelCounters>,
}

///
/// CompileOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CompileOps {
    // Statement entrypoints
    pub query_calls: u64,
    pub count_calls: u64,
    pub exists_calls: u64,
    pub aggregate_calls: u64,
    pub recursive_calls: u64,
    pub vector_search_calls: u64,
    pub delete_where_calls: u64,

    // Graph shape
    pub join_nodes: u64,
    pub exists_subqueries: u64,

    pub failures: u64,
}

impl CompileOps {
    pub(crate) const fn bump_kind(&mut self, kind: StatementKind) {
        let slot = match kind {
            StatementKind::Query => &mut self.query_calls,
            StatementKind::Count => &mut self.count_calls,
            StatementKind::Exists => &mut self.exists_calls,
            StatementKind::Aggregate => &mut self.aggregate_calls,
            StatementKind::Recursive | StatementKind::RecursiveCount => &mut self.recursive_calls,
            StatementKind::VectorSearch => &mut self.vector_search_calls,
            StatementKind::DeleteWhere => &mut self.delete_where_calls,
        };
        *slot = slot.saturating_add(1);
    }
}

///
/// ModelCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ModelCounters {
    pub statements: u64,
    /// Times the model was joined into another model's statement.
    pub joined: u64,
    pub exists_subqueries: u64,
}

thread_local! {
    static COMPILE_STATE: RefCell<CompileReport> = RefCell::new(CompileReport::default());
}

/// Borrow counters immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&CompileReport) -> R) -> R {
    COMPILE_STATE.with(|m| f(&m.borrow()))
}

/// Borrow counters mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut CompileReport) -> R) -> R {
    COMPILE_STATE.with(|m| f(&mut m.borrow_mut()))
}

pub(crate) fn report() -> CompileReport {
    with_state(Clone::clone)
}

pub(crate) fn reset_all() {
    with_state_mut(|m| *m = CompileReport::default());
}
