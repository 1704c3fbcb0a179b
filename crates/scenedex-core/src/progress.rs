//! Progress reporting collaborators for long-running indexing operations.

use parking_lot::RwLock;

/// Progress reporting for indexing operations
pub trait IndexProgress: Send + Sync {
    /// Called periodically with the number of records processed so far
    fn on_progress(&self, processed: usize, total: usize);

    /// Called once when the operation has finished
    fn on_complete(&self, processed: usize, total: usize);
}

/// A simple progress reporter that logs to tracing
pub struct LoggingProgress {
    task: String,
}

impl LoggingProgress {
    pub fn new(task: impl Into<String>) -> Self {
        LoggingProgress { task: task.into() }
    }
}

impl IndexProgress for LoggingProgress {
    fn on_progress(&self, processed: usize, total: usize) {
        tracing::info!(task = %self.task, processed, total, "Indexed {}/{} scenes", processed, total);
    }

    fn on_complete(&self, processed: usize, total: usize) {
        tracing::info!(task = %self.task, processed, total, "Search index built");
    }
}

/// Status of a catalog migration that may trigger a reindex.
///
/// While a migration is running, a full rebuild mirrors its progress into
/// the migration status so the migration UI can show it.
pub trait MigrationStatus: Send + Sync {
    /// Whether a migration is currently running
    fn is_running(&self) -> bool;

    /// The phase the running migration is in
    fn current_phase(&self) -> String;

    /// Record progress for the given phase
    fn update_status(&self, phase: &str, current: usize, total: usize, message: &str);
}

/// Point-in-time copy of a `SharedMigrationStatus`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSnapshot {
    pub running: bool,
    pub phase: String,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

/// Thread-safe in-process migration status.
#[derive(Debug, Default)]
pub struct SharedMigrationStatus {
    state: RwLock<MigrationSnapshot>,
}

impl SharedMigrationStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a migration as running in the given phase.
    pub fn start(&self, phase: impl Into<String>) {
        let mut state = self.state.write();
        *state = MigrationSnapshot {
            running: true,
            phase: phase.into(),
            ..MigrationSnapshot::default()
        };
    }

    /// Mark the migration as finished, keeping the last progress values.
    pub fn finish(&self) {
        self.state.write().running = false;
    }

    pub fn snapshot(&self) -> MigrationSnapshot {
        self.state.read().clone()
    }
}

impl MigrationStatus for SharedMigrationStatus {
    fn is_running(&self) -> bool {
        self.state.read().running
    }

    fn current_phase(&self) -> String {
        self.state.read().phase.clone()
    }

    fn update_status(&self, phase: &str, current: usize, total: usize, message: &str) {
        let mut state = self.state.write();
        state.phase = phase.to_string();
        state.current = current;
        state.total = total;
        state.message = message.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_status_lifecycle() {
        let status = SharedMigrationStatus::new();
        assert!(!status.is_running());

        status.start("reindex");
        assert!(status.is_running());
        assert_eq!(status.current_phase(), "reindex");

        status.update_status("reindex", 10, 40, "Reindexing scenes: 10/40");
        let snap = status.snapshot();
        assert_eq!(snap.current, 10);
        assert_eq!(snap.total, 40);
        assert_eq!(snap.message, "Reindexing scenes: 10/40");

        status.finish();
        assert!(!status.is_running());
        assert_eq!(status.snapshot().current, 10);
    }
}
