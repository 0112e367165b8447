//! Read models returned by the reporting side of the tracker.

use super::unit::{UnitRef, UnitStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of recomputing an operation's progress from its closed sessions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub operation_id: i64,
    pub total_hours: f64,
    pub estimated_hours: f64,
    /// Capped at 100.
    pub percent: f64,
    pub status: Option<UnitStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PerformanceLabel {
    Ahead,
    OnTrack,
    Late,
    NoEstimate,
}

impl PerformanceLabel {
    /// Band of ±10 % around the estimate counts as on track.
    pub fn from_variance(variance_percent: Option<f64>) -> Self {
        match variance_percent {
            None => PerformanceLabel::NoEstimate,
            Some(v) if v < -10.0 => PerformanceLabel::Ahead,
            Some(v) if v > 10.0 => PerformanceLabel::Late,
            Some(_) => PerformanceLabel::OnTrack,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PerformanceLabel::Ahead => "ahead of estimate",
            PerformanceLabel::OnTrack => "on track",
            PerformanceLabel::Late => "over estimate",
            PerformanceLabel::NoEstimate => "no estimate",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitTimeSummary {
    pub unit: UnitRef,
    pub description: String,
    pub sessions_count: i64,
    pub unique_employees: i64,
    pub total_hours: f64,
    pub total_cost: f64,
    pub estimated_hours: Option<f64>,
    pub estimate_variance_percent: Option<f64>,
    pub performance: PerformanceLabel,
    pub status: UnitStatus,
    pub first_punch: Option<String>,
    pub last_punch: Option<String>,
}

impl UnitTimeSummary {
    pub fn status_label(&self) -> &'static str {
        self.performance.label()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: String,
    pub total_punches: i64,
    pub completed_punches: i64,
    pub active_punches: i64,
    pub unique_employees: i64,
    pub unique_projects: i64,
    pub unique_operations: i64,
    pub total_hours: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmployeeStatistics {
    pub employee_id: i64,
    pub employee_name: Option<String>,
    pub employee_role: Option<String>,
    pub days: i64,
    pub total_sessions: i64,
    pub unique_projects: i64,
    pub unique_operations: i64,
    pub total_hours: f64,
    pub total_cost: f64,
    pub avg_session_hours: f64,
    pub avg_hourly_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectTimeSummary {
    pub project_id: i64,
    pub project_name: Option<String>,
    pub total_sessions: i64,
    pub unique_employees: i64,
    pub unique_operations: i64,
    pub total_hours: f64,
    pub total_cost: f64,
    pub first_punch: Option<String>,
    pub last_punch: Option<String>,
}

/// Tracker-wide counters plus today's closed-session totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackerStatistics {
    pub total_employees: i64,
    pub total_entries: i64,
    pub open_entries: i64,
    pub operation_entries: i64,
    pub task_entries: i64,
    pub general_entries: i64,
    pub entries_today: i64,
    pub hours_today: f64,
    pub cost_today: f64,
    pub operation_cost_today: f64,
    pub task_cost_today: f64,
}

/// Time booked through operations on one work center.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkCenterUsage {
    pub work_center_id: i64,
    pub name: String,
    pub department: Option<String>,
    pub operations: i64,
    pub sessions: i64,
    pub hours: f64,
    pub cost: f64,
}

/// Work-center inventory and how much of it operations actually use.
/// Sessions, hours and cost count closed operation sessions only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkCenterStatistics {
    pub total_work_centers: i64,
    pub by_department: BTreeMap<String, i64>,
    pub used_work_centers: i64,
    pub operation_sessions: i64,
    pub operation_hours: f64,
    pub per_work_center: Vec<WorkCenterUsage>,
}

/// An employee currently punched in.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSession {
    pub session_id: i64,
    pub employee_id: i64,
    pub employee_name: Option<String>,
    pub project_name: Option<String>,
    pub unit_description: Option<String>,
    pub work_order_number: Option<String>,
    pub punch_in: String,
    pub hours_so_far: f64,
}
