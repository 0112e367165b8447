use super::report::Progress;
use super::unit::UnitRef;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// What a new punch is recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunchTarget {
    /// Unit-less punch, optionally billed to a project.
    General { project_id: Option<i64> },
    Unit(UnitRef),
}

/// Which kind of unit a stored session points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PunchKind {
    Operation,
    EmbeddedTask,
    General,
}

impl PunchKind {
    pub fn label(&self) -> &'static str {
        match self {
            PunchKind::Operation => "operation",
            PunchKind::EmbeddedTask => "task",
            PunchKind::General => "general",
        }
    }
}

/// One row of `time_entries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunchSession {
    pub id: i64,
    pub employee_id: i64,
    pub project_id: Option<i64>,
    pub operation_id: Option<i64>,
    pub work_order_id: Option<i64>,
    pub work_order_line_id: Option<i64>,
    pub punch_in: NaiveDateTime,
    pub punch_out: Option<NaiveDateTime>,
    pub total_hours: Option<f64>,
    pub hourly_rate: Option<f64>,
    pub total_cost: Option<f64>,
    pub notes: String,
    pub created_at: String,
}

impl PunchSession {
    pub fn is_open(&self) -> bool {
        self.punch_out.is_none()
    }

    pub fn kind(&self) -> PunchKind {
        if self.operation_id.is_some() {
            PunchKind::Operation
        } else if self.work_order_id.is_some() || self.work_order_line_id.is_some() {
            PunchKind::EmbeddedTask
        } else {
            PunchKind::General
        }
    }

    /// Unit this session was recorded against, when it can be pinned down.
    pub fn unit(&self) -> Option<UnitRef> {
        match (self.operation_id, self.work_order_line_id) {
            (Some(op), _) => Some(UnitRef::operation(op)),
            (None, Some(line)) => Some(UnitRef::task(line)),
            _ => None,
        }
    }
}

/// A session together with the display context callers show next to it.
/// Display fields are `None` when the referenced row no longer exists.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: PunchSession,
    pub kind: PunchKind,
    pub employee_name: Option<String>,
    pub employee_role: Option<String>,
    pub project_name: Option<String>,
    pub unit_description: Option<String>,
    pub sequence_number: Option<i64>,
    pub work_center: Option<String>,
    pub work_order_number: Option<String>,
}

/// Result of a successful punch-out.
#[derive(Debug, Clone, Serialize)]
pub struct ClosedPunch {
    pub session: PunchSession,
    pub progress: Option<Progress>,
}
