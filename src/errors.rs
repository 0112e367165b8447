//! Unified application error type.
//! All modules (db, core, cli, utils) return AppError so that callers can
//! tell "nothing found" (an Ok value) apart from "operation failed".

use crate::models::unit::UnitRef;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    // ---------------------------
    // Serialization
    // ---------------------------
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ---------------------------
    // Parsing errors
    // ---------------------------
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid unit reference '{0}' (expected op:<id>, task:<id> or a legacy numeric id)")]
    InvalidUnitRef(String),

    // ---------------------------
    // Punch logic errors
    // ---------------------------
    #[error("Employee {employee_id} already has an open punch (session #{session_id})")]
    AlreadyOpen { employee_id: i64, session_id: i64 },

    #[error("Employee {0} has no open punch")]
    NoOpenSession(i64),

    #[error("Unit {0} not found")]
    UnitNotFound(UnitRef),

    #[error("Employee {0} not found")]
    EmployeeNotFound(i64),

    #[error("Punch-out at {punch_out} is earlier than punch-in at {punch_in}")]
    PunchOutBeforePunchIn { punch_in: String, punch_out: String },

    // ---------------------------
    // Purge errors
    // ---------------------------
    #[error("Backup failed, nothing was deleted: {0}")]
    BackupFailure(String),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

pub type AppResult<T> = Result<T, AppError>;
