//! Read-only view over the leads store.

use std::sync::Arc;

use tracing::debug;

use crate::error::StoreError;
use crate::store::LeadStore;

/// Serves lead rows to the dashboard. Backed by a read-only scoped store.
pub struct LeadReader {
    store: Arc<dyn LeadStore>,
}

impl LeadReader {
    pub fn new(store: Arc<dyn LeadStore>) -> Self {
        Self { store }
    }

    /// All rows in storage order, header included.
    pub async fn read_all(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let rows = self.store.read_all().await?;
        debug!(rows = rows.len(), "Leads read");
        Ok(rows)
    }
}
