//! Intake queue between the webhook and the lead processor.
//!
//! Webhook handlers push extracted messages and acknowledge right away; a
//! single background worker pops them in arrival order and runs each through
//! `LeadProcessor::process()`. The queue is bounded: a full queue makes
//! `enqueue` wait rather than drop. When every `IntakeQueue` handle is gone
//! the worker drains what is left and exits.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::IntakeError;
use crate::pipeline::processor::LeadProcessor;
use crate::pipeline::types::InboundLead;

/// Default queue bound.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Producer handle. Cheap to clone; one per router state.
#[derive(Clone)]
pub struct IntakeQueue {
    tx: mpsc::Sender<InboundLead>,
}

impl IntakeQueue {
    /// Create a queue and the receiver to hand to `spawn_intake_worker`.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<InboundLead>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Push a lead, waiting for space when the queue is full.
    pub async fn enqueue(&self, lead: InboundLead) -> Result<(), IntakeError> {
        debug!(id = %lead.id, sender = %lead.sender_id, "Enqueueing lead");
        self.tx.send(lead).await.map_err(|_| IntakeError::Closed)
    }

    /// Messages waiting to be processed.
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// Spawn the single consumer. Resolves to the number of leads processed.
pub fn spawn_intake_worker(
    mut rx: mpsc::Receiver<InboundLead>,
    processor: Arc<LeadProcessor>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        info!("Intake worker started");
        let mut processed = 0usize;

        while let Some(lead) = rx.recv().await {
            processor.process(lead).await;
            processed += 1;
        }

        info!(processed, "Intake queue closed, worker exiting");
        processed
    })
}
