//! In-memory audit sink, used by the flow tests.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

use super::{fold_summary, AuditSink, LogEntry, Summary};

#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: LogEntry) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<LogEntry>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }

    async fn summary(&self) -> Result<Summary> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(fold_summary(entries.iter().map(|entry| {
            (entry.server.clone(), entry.level, 1)
        })))
    }
}
