//! Counters reported by the engine, the persistence pool, and a whole run.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub records_ingested: u64,
    /// Records without id, date, or entity tags.
    pub records_dropped: u64,
    pub dates_flushed: u64,
    pub peak_live_buckets: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
}

impl PersistenceStats {
    #[must_use]
    pub fn outstanding(&self) -> u64 {
        self.submitted
            .saturating_sub(self.completed)
            .saturating_sub(self.failed)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub archives_processed: usize,
    pub archives_skipped: usize,
    pub engine: EngineStats,
    pub persistence: PersistenceStats,
}
