//! The `LeadStore` trait: async access to the leads sheet.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::pipeline::types::{HandoffStatus, LeadRecord, RowIndex};

/// Backend-agnostic access to the append-only leads table.
///
/// Row 1 is always the header; data rows start at row 2. Rows are never
/// deleted, and only the status cell of a row is ever rewritten.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Append one record after the last row. Not idempotent.
    async fn append(&self, record: &LeadRecord) -> Result<(), StoreError>;

    /// Find the first row (top to bottom) whose sender id equals `sender_id`.
    async fn find_by_sender_id(&self, sender_id: &str) -> Result<Option<RowIndex>, StoreError>;

    /// Overwrite the handoff status cell of `row`.
    ///
    /// Only `HandoffStatus::Resolved` is accepted; anything else fails with
    /// `StoreError::InvalidTransition` before any I/O.
    async fn update_status(&self, row: RowIndex, status: HandoffStatus) -> Result<(), StoreError>;

    /// Every row in storage order, header included. Empty when no data exists.
    async fn read_all(&self) -> Result<Vec<Vec<String>>, StoreError>;
}

/// Reject status writes other than the one legal transition.
pub(crate) fn ensure_resolved(row: RowIndex, status: HandoffStatus) -> Result<(), StoreError> {
    if status == HandoffStatus::Resolved {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition {
            row: row.get(),
            target: status.to_string(),
        })
    }
}
