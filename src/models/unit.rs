use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Additive offset used by older callers to squeeze task lines into the
/// operation id space. Only decoded at the boundary, never produced for
/// new data except through [`UnitRef::legacy_id`].
pub const LEGACY_TASK_OFFSET: i64 = 100_000;

/// Task lines at or above this sequence number are material lines.
pub const MATERIAL_SEQUENCE_FLOOR: i64 = 1000;

/// Literal description prefix marking a material line.
pub const MATERIAL_PREFIX: &str = "MATERIAU:";

/// Label used when no work center can be derived for a task line.
pub const MANUAL_STATION: &str = "Manual Station";

/// Label used when a task line's project cannot be resolved.
pub const UNKNOWN_PROJECT: &str = "Unknown Project";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    Operation,
    EmbeddedTask,
}

impl UnitKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            UnitKind::Operation => "op",
            UnitKind::EmbeddedTask => "task",
        }
    }
}

/// Composite key of a punchable unit: which source it lives in plus the
/// native row id inside that source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitRef {
    pub kind: UnitKind,
    pub id: i64,
}

impl UnitRef {
    pub fn operation(id: i64) -> Self {
        Self {
            kind: UnitKind::Operation,
            id,
        }
    }

    pub fn task(line_id: i64) -> Self {
        Self {
            kind: UnitKind::EmbeddedTask,
            id: line_id,
        }
    }

    /// Decode an offset-encoded id coming from an older caller.
    pub fn from_legacy_id(id: i64) -> Self {
        if id > LEGACY_TASK_OFFSET {
            Self::task(id - LEGACY_TASK_OFFSET)
        } else {
            Self::operation(id)
        }
    }

    /// Offset-encoded form, or `None` when the encoding would be ambiguous
    /// (an operation id that already reaches into the task range).
    pub fn legacy_id(&self) -> Option<i64> {
        match self.kind {
            UnitKind::Operation if self.id > 0 && self.id <= LEGACY_TASK_OFFSET => Some(self.id),
            UnitKind::Operation => None,
            UnitKind::EmbeddedTask if self.id > 0 => Some(self.id + LEGACY_TASK_OFFSET),
            UnitKind::EmbeddedTask => None,
        }
    }
}

impl fmt::Display for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.prefix(), self.id)
    }
}

impl FromStr for UnitRef {
    type Err = AppError;

    /// Accepts `op:<id>`, `task:<id>` or a bare legacy numeric id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || AppError::InvalidUnitRef(s.to_string());

        if let Some((kind, id)) = s.split_once(':') {
            let id: i64 = id.trim().parse().map_err(|_| bad())?;
            if id <= 0 {
                return Err(bad());
            }
            return match kind.trim().to_ascii_lowercase().as_str() {
                "op" | "operation" => Ok(Self::operation(id)),
                "task" | "line" => Ok(Self::task(id)),
                _ => Err(bad()),
            };
        }

        let id: i64 = s.parse().map_err(|_| bad())?;
        if id <= 0 {
            return Err(bad());
        }
        Ok(Self::from_legacy_id(id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitStatus {
    Pending,
    InProgress,
    Done,
}

impl UnitStatus {
    /// Convert enum → DB string (operations.status)
    pub fn to_db_str(&self) -> &'static str {
        match self {
            UnitStatus::Pending => "TODO",
            UnitStatus::InProgress => "IN_PROGRESS",
            UnitStatus::Done => "DONE",
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "TODO" => Some(UnitStatus::Pending),
            "IN_PROGRESS" => Some(UnitStatus::InProgress),
            "DONE" => Some(UnitStatus::Done),
            _ => None,
        }
    }

    /// Status of an embedded task, inherited from its work order.
    /// Cancelled work orders never reach this point.
    pub fn from_work_order_status(s: &str) -> Self {
        match s {
            "DONE" => UnitStatus::Done,
            "IN_PROGRESS" => UnitStatus::InProgress,
            _ => UnitStatus::Pending,
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, UnitStatus::Done)
    }

    pub fn label(&self) -> &'static str {
        match self {
            UnitStatus::Pending => "pending",
            UnitStatus::InProgress => "in progress",
            UnitStatus::Done => "done",
        }
    }
}

/// Operation name and free-text detail of a task line description
/// written as `"<operation> - <detail>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDescription {
    pub operation_name: String,
    pub detail: String,
}

impl TaskDescription {
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(" - ") {
            Some((op, detail)) => Self {
                operation_name: op.trim().to_string(),
                detail: detail.trim().to_string(),
            },
            None => Self {
                operation_name: raw.trim().to_string(),
                detail: String::new(),
            },
        }
    }

    pub fn label(&self) -> String {
        if self.detail.is_empty() {
            self.operation_name.clone()
        } else {
            format!("{} - {}", self.operation_name, self.detail)
        }
    }
}

/// Work center name carried by a task line's notes, which hold a small
/// JSON object such as `{"operation": "Robot cell"}`. Anything unusable
/// yields [`MANUAL_STATION`].
pub fn work_center_from_notes(notes: Option<&str>) -> String {
    let Some(raw) = notes.map(str::trim).filter(|s| !s.is_empty()) else {
        return MANUAL_STATION.to_string();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(v) => v
            .get("operation")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| MANUAL_STATION.to_string()),
        Err(e) => {
            warn!(error = %e, "task line notes are not JSON, using default work center");
            MANUAL_STATION.to_string()
        }
    }
}

/// Project linkage embedded in a work order's metadata when the work order
/// has no `project_id` column value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkOrderProject {
    pub project_id: Option<i64>,
    pub project_name: Option<String>,
}

pub fn work_order_project(metadata: Option<&str>) -> WorkOrderProject {
    let Some(raw) = metadata.map(str::trim).filter(|s| !s.is_empty()) else {
        return WorkOrderProject::default();
    };

    let v: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "work order metadata is not JSON, ignoring it");
            return WorkOrderProject::default();
        }
    };

    let project_id = match v.get("project_id") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    let project_name = v
        .get("project_name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    WorkOrderProject {
        project_id,
        project_name,
    }
}

/// A line counts as punchable work only if it is not a material line and
/// carries a real description.
pub fn is_punchable_line(sequence_number: i64, description: Option<&str>) -> bool {
    let Some(desc) = description.map(str::trim) else {
        return false;
    };
    sequence_number < MATERIAL_SEQUENCE_FLOOR
        && !desc.is_empty()
        && desc != "None"
        && !desc.starts_with(MATERIAL_PREFIX)
}

/// Catalogue entry for one punchable unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitSummary {
    pub unit: UnitRef,
    pub display_name: String,
    pub sequence_number: i64,
    pub work_center: Option<String>,
    pub estimated_hours: Option<f64>,
    pub status: UnitStatus,
    pub project_id: Option<i64>,
    pub work_order_id: Option<i64>,
    pub work_order_number: Option<String>,
}

/// Fully resolved unit, normalized across both sources.
#[derive(Debug, Clone, Serialize)]
pub struct UnitDetail {
    pub unit: UnitRef,
    pub sequence_number: i64,
    pub operation_name: String,
    pub description_detail: String,
    pub estimated_hours: Option<f64>,
    pub work_center_id: Option<i64>,
    pub work_center: Option<String>,
    pub status: UnitStatus,
    pub project_id: Option<i64>,
    pub project_name: String,
    pub work_order_id: Option<i64>,
    pub work_order_number: Option<String>,
}

impl UnitDetail {
    /// `"03. Welding - Assemble frame (Robot cell)"`
    pub fn display_name(&self) -> String {
        let mut name = format!("{:02}. {}", self.sequence_number, self.operation_name);
        if !self.description_detail.is_empty() {
            name.push_str(" - ");
            name.push_str(&self.description_detail);
        }
        if let Some(wc) = &self.work_center {
            name.push_str(&format!(" ({wc})"));
        }
        name
    }

    /// Catalogue group this unit belongs to.
    pub fn group_label(&self) -> String {
        match &self.work_order_number {
            Some(doc) => format!("WorkOrder: {} - {}", doc, self.project_name),
            None => format!("Project: {}", self.project_name),
        }
    }

    pub fn summary(&self) -> UnitSummary {
        UnitSummary {
            unit: self.unit,
            display_name: self.display_name(),
            sequence_number: self.sequence_number,
            work_center: self.work_center.clone(),
            estimated_hours: self.estimated_hours,
            status: self.status,
            project_id: self.project_id,
            work_order_id: self.work_order_id,
            work_order_number: self.work_order_number.clone(),
        }
    }
}

/// Actionable units grouped by work order / project label.
pub type Catalogue = BTreeMap<String, Vec<UnitSummary>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_description_splits_on_first_delimiter() {
        let d = TaskDescription::parse("Welding - Assemble frame");
        assert_eq!(d.operation_name, "Welding");
        assert_eq!(d.detail, "Assemble frame");

        let d = TaskDescription::parse("Cut - tube - 40mm");
        assert_eq!(d.operation_name, "Cut");
        assert_eq!(d.detail, "tube - 40mm");
    }

    #[test]
    fn task_description_without_delimiter_is_the_name() {
        let d = TaskDescription::parse("Generic task");
        assert_eq!(d.operation_name, "Generic task");
        assert_eq!(d.detail, "");
    }

    #[test]
    fn unit_ref_parses_textual_and_legacy_forms() {
        assert_eq!("op:12".parse::<UnitRef>().unwrap(), UnitRef::operation(12));
        assert_eq!("task:7".parse::<UnitRef>().unwrap(), UnitRef::task(7));
        assert_eq!("100007".parse::<UnitRef>().unwrap(), UnitRef::task(7));
        assert_eq!("100000".parse::<UnitRef>().unwrap(), UnitRef::operation(100_000));
        assert!("job:1".parse::<UnitRef>().is_err());
        assert!("op:-3".parse::<UnitRef>().is_err());
        assert!("abc".parse::<UnitRef>().is_err());
    }

    #[test]
    fn legacy_id_refuses_colliding_operations() {
        assert_eq!(UnitRef::operation(42).legacy_id(), Some(42));
        assert_eq!(UnitRef::operation(100_000).legacy_id(), Some(100_000));
        assert_eq!(UnitRef::operation(100_001).legacy_id(), None);
        assert_eq!(UnitRef::task(5).legacy_id(), Some(100_005));
    }

    #[test]
    fn legacy_round_trip_keeps_kind() {
        for unit in [UnitRef::task(1), UnitRef::task(9_999), UnitRef::operation(1)] {
            let legacy = unit.legacy_id().unwrap();
            let back = UnitRef::from_legacy_id(legacy);
            assert_eq!(back, unit);
            assert_eq!(back.kind == UnitKind::EmbeddedTask, legacy > LEGACY_TASK_OFFSET);
        }
    }

    #[test]
    fn work_center_falls_back_to_manual_station() {
        assert_eq!(
            work_center_from_notes(Some(r#"{"operation": "Laser"}"#)),
            "Laser"
        );
        assert_eq!(work_center_from_notes(Some("not json {")), MANUAL_STATION);
        assert_eq!(work_center_from_notes(Some(r#"{"other": 1}"#)), MANUAL_STATION);
        assert_eq!(work_center_from_notes(Some(r#"{"operation": ""}"#)), MANUAL_STATION);
        assert_eq!(work_center_from_notes(None), MANUAL_STATION);
    }

    #[test]
    fn metadata_project_accepts_string_ids() {
        let p = work_order_project(Some(r#"{"project_id": "12", "project_name": "Silo"}"#));
        assert_eq!(p.project_id, Some(12));
        assert_eq!(p.project_name.as_deref(), Some("Silo"));
        assert_eq!(work_order_project(Some("garbage")), WorkOrderProject::default());
    }

    #[test]
    fn material_lines_are_not_punchable() {
        assert!(is_punchable_line(10, Some("Welding - frame")));
        assert!(!is_punchable_line(1000, Some("Welding - frame")));
        assert!(!is_punchable_line(10, Some("MATERIAU: steel plate")));
        assert!(!is_punchable_line(10, Some("None")));
        assert!(!is_punchable_line(10, Some("  ")));
        assert!(!is_punchable_line(10, None));
    }

    #[test]
    fn work_order_status_mapping() {
        assert_eq!(UnitStatus::from_work_order_status("DONE"), UnitStatus::Done);
        assert_eq!(
            UnitStatus::from_work_order_status("IN_PROGRESS"),
            UnitStatus::InProgress
        );
        assert_eq!(UnitStatus::from_work_order_status("VALIDATED"), UnitStatus::Pending);
        assert_eq!(UnitStatus::from_work_order_status("DRAFT"), UnitStatus::Pending);
    }
}
