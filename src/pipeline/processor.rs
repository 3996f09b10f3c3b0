//! Lead processor: qualifies an inbound message and records it.
//!
//! Flow:
//! 1. Classify via LLM (total, falls back on any failure)
//! 2. Derive the initial handoff status
//! 3. Append one row to the leads store
//!
//! Store failures are logged and swallowed; the sender already got their ack.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::handoff::HandoffCoordinator;
use crate::pipeline::classifier::LeadClassifier;
use crate::pipeline::types::{InboundLead, LeadRecord, Qualification};
use crate::store::LeadStore;

/// Outcome of processing one inbound lead.
#[derive(Debug, Clone)]
pub struct ProcessedLead {
    pub record: LeadRecord,
    pub qualification: Qualification,
    /// Text the assistant would send back to the lead.
    pub reply: String,
    /// Whether the row reached the store.
    pub persisted: bool,
}

/// Runs inbound leads through classification and persistence.
pub struct LeadProcessor {
    classifier: LeadClassifier,
    store: Arc<dyn LeadStore>,
}

impl LeadProcessor {
    pub fn new(classifier: LeadClassifier, store: Arc<dyn LeadStore>) -> Self {
        Self { classifier, store }
    }

    /// Process a single inbound lead through the full pipeline.
    pub async fn process(&self, lead: InboundLead) -> ProcessedLead {
        info!(id = %lead.id, sender = %lead.sender_id, "Processing inbound lead");

        let qualification = self.classifier.classify(&lead.text).await;
        let status = HandoffCoordinator::initial_status(&qualification);
        let record = LeadRecord::new(&lead, &qualification, status);

        let persisted = match self.store.append(&record).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    id = %lead.id,
                    sender = %lead.sender_id,
                    error = %e,
                    "Failed to record lead"
                );
                false
            }
        };

        let reply = qualification.reply_text();
        debug!(id = %lead.id, reply = %reply, "Reply prepared");
        info!(
            id = %lead.id,
            intent = record.intent.as_str(),
            budget = record.budget_tier.as_str(),
            property = record.property_type.as_str(),
            status = %status,
            persisted,
            "Lead qualified"
        );

        ProcessedLead {
            record,
            qualification,
            reply,
            persisted,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::provider::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
    use crate::pipeline::types::{BudgetTier, HandoffStatus, Intent};
    use crate::store::MemoryStore;

    /// Mock LLM replaying queued outputs; `None` means a transport failure.
    struct ScriptedLlm {
        outputs: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedLlm {
        fn new(outputs: Vec<Option<&str>>) -> Self {
            Self {
                outputs: Mutex::new(outputs.into_iter().rev().map(|o| o.map(String::from)).collect()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            match self.outputs.lock().unwrap().pop().flatten() {
                Some(content) => Ok(CompletionResponse {
                    content,
                    input_tokens: 10,
                    output_tokens: 10,
                    finish_reason: FinishReason::Stop,
                    response_id: None,
                }),
                None => Err(LlmError::RequestFailed {
                    provider: "scripted".into(),
                    reason: "unavailable".into(),
                }),
            }
        }
    }

    fn processor(llm: ScriptedLlm, store: Arc<MemoryStore>) -> LeadProcessor {
        LeadProcessor::new(LeadClassifier::new(Arc::new(llm)), store)
    }

    #[tokio::test]
    async fn qualified_lead_is_recorded_with_automatic_status() {
        let store = Arc::new(MemoryStore::with_header());
        let llm = ScriptedLlm::new(vec![Some(
            r#"{"response_text": "¿Qué zona buscas?", "intent": "Purchase", "budget_tier": "High", "property_type": "Apartment", "handoff_required": false}"#,
        )]);
        let p = processor(llm, store.clone());

        let out = p.process(InboundLead::new("111", "Busco depa")).await;

        assert!(out.persisted);
        assert_eq!(out.reply, "¿Qué zona buscas?");
        assert_eq!(out.record.handoff_status, HandoffStatus::Automatic);
        let rows = store.rows().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1..], ["111", "Busco depa", "Purchase", "High", "Apartment", "NO", "Automatic"]);
    }

    #[tokio::test]
    async fn classification_failure_records_pending_error_row() {
        let store = Arc::new(MemoryStore::with_header());
        let p = processor(ScriptedLlm::new(vec![None]), store.clone());

        let out = p.process(InboundLead::new("222", "hola")).await;

        assert_eq!(out.qualification.intent, Intent::Error);
        assert!(out.reply.starts_with(Qualification::FALLBACK_RESPONSE));
        let rows = store.rows().await;
        assert_eq!(rows[1][3], "Error");
        assert_eq!(rows[1][4], BudgetTier::Undefined.as_str());
        assert_eq!(rows[1][6], "YES");
        assert_eq!(rows[1][7], "Pending");
    }

    #[tokio::test]
    async fn sequential_leads_append_one_row_each_in_order() {
        let store = Arc::new(MemoryStore::with_header());
        let llm = ScriptedLlm::new(vec![
            Some(r#"{"intent": "Rental"}"#),
            Some("garbage"),
            Some(r#"{"intent": "Investment", "handoff_required": true}"#),
        ]);
        let p = processor(llm, store.clone());

        for (sender, text) in [("a", "uno"), ("b", "dos"), ("c", "tres")] {
            assert!(p.process(InboundLead::new(sender, text)).await.persisted);
        }

        let rows = store.rows().await;
        let senders: Vec<&str> = rows[1..].iter().map(|r| r[1].as_str()).collect();
        assert_eq!(senders, ["a", "b", "c"]);
        let statuses: Vec<&str> = rows[1..].iter().map(|r| r[7].as_str()).collect();
        assert_eq!(statuses, ["Automatic", "Pending", "Pending"]);
    }

    #[tokio::test]
    async fn store_failure_is_swallowed() {
        let store = Arc::new(MemoryStore::with_header());
        store.set_fail_writes(true);
        let p = processor(ScriptedLlm::new(vec![Some(r#"{"intent": "Purchase"}"#)]), store.clone());

        let out = p.process(InboundLead::new("333", "hola")).await;

        assert!(!out.persisted);
        assert_eq!(out.qualification.intent, Intent::Purchase);
        assert_eq!(store.rows().await.len(), 1);
    }
}
