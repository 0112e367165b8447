use super::purge::OrphanCounts;
use super::report::ActiveSession;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntryCounts {
    pub total: i64,
    pub open: i64,
    pub operation: i64,
    pub task: i64,
    pub general: i64,
    pub last_punch_in: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationCounts {
    pub total: i64,
    pub linked_to_work_order: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub done: i64,
}

/// Line inventory of one work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkOrderLines {
    pub work_order_id: i64,
    pub doc_number: String,
    pub status: String,
    pub lines: i64,
    pub punchable_tasks: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub entries: EntryCounts,
    pub open_sessions: Vec<ActiveSession>,
    pub operations: OperationCounts,
    pub work_orders: Vec<WorkOrderLines>,
    pub orphans: OrphanCounts,
    /// One line per detected problem, empty when healthy.
    pub problems: Vec<String>,
}

impl Diagnostic {
    pub fn is_healthy(&self) -> bool {
        self.problems.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetachOutcome {
    pub found: usize,
    pub detached: usize,
}
