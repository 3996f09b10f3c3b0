//! Lead intake pipeline.
//!
//! Every inbound message flows through:
//! 1. `IntakeQueue::enqueue()`: webhook hands off and acknowledges
//! 2. `LeadClassifier::classify()`: LLM qualification, total
//! 3. `LeadProcessor::process()`: initial handoff status + one appended row

pub mod classifier;
pub mod processor;
pub mod queue;
pub mod types;

pub use classifier::LeadClassifier;
pub use processor::{LeadProcessor, ProcessedLead};
pub use queue::{IntakeQueue, spawn_intake_worker};
