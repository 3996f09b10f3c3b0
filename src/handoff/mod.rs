//! Handoff lifecycle: initial status assignment and resolution by a human.
//!
//! A lead row starts `Pending` when the classifier asked for a human and
//! `Automatic` otherwise. The only later transition is to `Resolved`,
//! triggered from the dashboard by sender id.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::HandoffError;
use crate::pipeline::types::{HandoffStatus, Qualification, RowIndex};
use crate::store::LeadStore;

/// Resolves pending handoffs against the leads store.
pub struct HandoffCoordinator {
    store: Arc<dyn LeadStore>,
    /// One lock per sender id so find + update cannot interleave.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl HandoffCoordinator {
    pub fn new(store: Arc<dyn LeadStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// Status a freshly qualified lead is written with.
    pub fn initial_status(qualification: &Qualification) -> HandoffStatus {
        if qualification.handoff_required {
            HandoffStatus::Pending
        } else {
            HandoffStatus::Automatic
        }
    }

    /// Mark the first row for `sender_id` as resolved and return its row.
    ///
    /// Resolving an already resolved row rewrites the same value.
    pub async fn resolve(&self, sender_id: &str) -> Result<RowIndex, HandoffError> {
        let lock = self
            .locks
            .entry(sender_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.resolve_locked(sender_id).await
        };

        drop(lock);
        // Drop the entry once no other caller holds it.
        self.locks
            .remove_if(sender_id, |_, l| Arc::strong_count(l) == 1);

        result
    }

    async fn resolve_locked(&self, sender_id: &str) -> Result<RowIndex, HandoffError> {
        let Some(row) = self.store.find_by_sender_id(sender_id).await? else {
            warn!(sender = %sender_id, "Handoff resolve for unknown sender");
            return Err(HandoffError::NotFound {
                sender_id: sender_id.to_string(),
            });
        };

        self.store
            .update_status(row, HandoffStatus::Resolved)
            .await?;

        info!(sender = %sender_id, row = row.get(), "Handoff resolved");
        Ok(row)
    }
}
