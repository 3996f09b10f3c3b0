//! In-process `LeadStore` holding rows in memory.
//!
//! Same row semantics as the sheet (header at row 1, first-match lookup,
//! status cell in column H). Used by tests and for local runs without
//! spreadsheet credentials.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::traits::{LeadStore, ensure_resolved};
use crate::error::StoreError;
use crate::pipeline::types::{HandoffStatus, LeadRecord, RowIndex, SHEET_HEADER};

/// Zero-based column of the sender id.
const SENDER_COLUMN: usize = 1;
/// Zero-based column of the handoff status.
const STATUS_COLUMN: usize = 7;

/// In-memory leads table.
pub struct MemoryStore {
    rows: RwLock<Vec<Vec<String>>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// An empty store with no header row (as a freshly created sheet).
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// A store containing only the header row.
    pub fn with_header() -> Self {
        Self::with_rows(vec![
            SHEET_HEADER.iter().map(|s| s.to_string()).collect(),
        ])
    }

    /// A store seeded with raw rows (header included, if wanted).
    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: RwLock::new(rows),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail, to exercise error paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all rows.
    pub async fn rows(&self) -> Vec<Vec<String>> {
        self.rows.read().await.clone()
    }

    fn check_writable(&self, operation: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::RequestFailed {
                operation: operation.to_string(),
                reason: "store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn append(&self, record: &LeadRecord) -> Result<(), StoreError> {
        self.check_writable("append")?;
        let mut rows = self.rows.write().await;
        rows.push(record.to_row());
        debug!(row = rows.len(), sender = %record.sender_id, "Row appended");
        Ok(())
    }

    async fn find_by_sender_id(&self, sender_id: &str) -> Result<Option<RowIndex>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| row.get(SENDER_COLUMN).is_some_and(|id| id == sender_id))
            .map(|(offset, _)| RowIndex::from_column_offset(offset)))
    }

    async fn update_status(&self, row: RowIndex, status: HandoffStatus) -> Result<(), StoreError> {
        ensure_resolved(row, status)?;
        self.check_writable("update_status")?;

        let mut rows = self.rows.write().await;
        let index = (row.get() as usize).checked_sub(1);
        let target = index
            .and_then(|i| rows.get_mut(i))
            .ok_or_else(|| StoreError::Api {
                operation: "update_status".to_string(),
                status: 400,
                body: format!("row {row} out of range"),
            })?;

        if target.len() <= STATUS_COLUMN {
            target.resize(STATUS_COLUMN + 1, String::new());
        }
        target[STATUS_COLUMN] = status.as_str().to_string();
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Vec<String>>, StoreError> {
        Ok(self.rows.read().await.clone())
    }
}
