use super::session::PunchSession;
use serde::{Deserialize, Serialize};

/// Bump when the backup layout changes.
pub const BACKUP_FORMAT_VERSION: u32 = 1;

/// One backed-up session with the display context it had at purge time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupEntry {
    #[serde(flatten)]
    pub session: PunchSession,
    pub employee_name: Option<String>,
    pub project_name: Option<String>,
    pub unit_description: Option<String>,
}

/// Portable snapshot of the rows a purge is about to delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub format_version: u32,
    pub created_at: String,
    pub scope: String,
    pub entries: Vec<BackupEntry>,
}

/// Sessions removed per dangling-reference category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrphanCounts {
    pub employee: usize,
    pub project: usize,
    pub operation: usize,
    pub work_order: usize,
}

impl OrphanCounts {
    pub fn total(&self) -> usize {
        self.employee + self.project + self.operation + self.work_order
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PurgeOutcome {
    pub success: bool,
    pub entries_deleted: usize,
    /// Serialized [`BackupSnapshot`] when a backup was requested.
    pub backup: Option<String>,
    /// File the snapshot was written to, when persisted.
    pub backup_path: Option<String>,
    pub message: String,
    /// Resolved name for employee-scoped purges.
    pub employee_name: Option<String>,
    /// Per-category breakdown for orphan purges.
    pub orphans: Option<OrphanCounts>,
}
