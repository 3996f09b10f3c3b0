//! Lead classifier: asks the LLM to qualify a message as a real-estate lead.
//!
//! `classify` is total: transport failures, bad status codes, empty output and
//! unparseable output all collapse into `Qualification::fallback()`, which
//! forces a human handoff. Nothing past this boundary ever sees an error.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::types::{
    BudgetTier, Intent, MAX_RESPONSE_CHARS, PropertyType, Qualification,
};

/// Max tokens for the classification call.
const CLASSIFY_MAX_TOKENS: u32 = 512;

/// Temperature for classification (deterministic-ish).
const CLASSIFY_TEMPERATURE: f32 = 0.1;

/// Fixed instruction prompt for lead qualification.
pub const CLASSIFIER_SYSTEM_PROMPT: &str = "\
You are a real-estate lead qualification assistant answering WhatsApp messages 24/7.\n\
Evaluate the user's message immediately: what they want to do, their budget range, \
and the type of property they are looking for.\n\n\
Respond with ONLY a JSON object with exactly these keys:\n\
{\"response_text\": \"...\", \"intent\": \"...\", \"budget_tier\": \"...\", \"property_type\": \"...\", \"handoff_required\": false}\n\n\
Fields:\n\
- response_text: a short, friendly reply to the user in their own language (max 256 characters)\n\
- intent: one of Purchase, Rental, Investment, Undefined\n\
- budget_tier: one of Low, Medium, High, Luxury, Undefined (Luxury means above 5M USD)\n\
- property_type: one of House, Apartment, Land, Undefined\n\
- handoff_required: true or false\n\n\
Rules:\n\
- Set handoff_required to true if the budget tier is Luxury, if the user explicitly asks \
for a human agent, or if you detect frustration.\n\
- Use Undefined when the message does not say.\n\
- Do not add any text outside the JSON object.";

/// Why a single classification attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("model returned empty output")]
    EmptyOutput,

    #[error("unparseable output: {0}")]
    Parse(String),
}

/// LLM response structure. Every field is optional; missing ones default.
#[derive(Debug, Default, Deserialize)]
struct QualificationResponse {
    #[serde(default, alias = "RESPUESTA_USUARIO", alias = "responseText")]
    response_text: Option<String>,
    #[serde(default, alias = "INTENCION")]
    intent: Option<String>,
    #[serde(default, alias = "PRESUPUESTO", alias = "budgetTier")]
    budget_tier: Option<String>,
    #[serde(default, alias = "TIPO_PROPIEDAD", alias = "propertyType")]
    property_type: Option<String>,
    #[serde(default, alias = "HANDOFF_REQUERIDO", alias = "handoffRequired")]
    handoff_required: Option<serde_json::Value>,
}

/// Qualifies inbound messages with an LLM.
pub struct LeadClassifier {
    llm: Arc<dyn LlmProvider>,
}

impl LeadClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Classify a message. Never fails; see module docs.
    pub async fn classify(&self, message: &str) -> Qualification {
        match self.try_classify(message).await {
            Ok(qualification) => {
                info!(
                    model = self.llm.model_name(),
                    intent = qualification.intent.as_str(),
                    budget = qualification.budget_tier.as_str(),
                    property = qualification.property_type.as_str(),
                    handoff = qualification.handoff_required,
                    "Lead classified"
                );
                qualification
            }
            Err(e) => {
                warn!(
                    model = self.llm.model_name(),
                    error = %e,
                    "Classification failed, using fallback qualification"
                );
                Qualification::fallback()
            }
        }
    }

    async fn try_classify(&self, message: &str) -> Result<Qualification, ClassificationError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(CLASSIFIER_SYSTEM_PROMPT),
            ChatMessage::user(message),
        ])
        .with_temperature(CLASSIFY_TEMPERATURE)
        .with_max_tokens(CLASSIFY_MAX_TOKENS)
        .with_json_output();

        let response = self.llm.complete(request).await?;
        debug!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            finish_reason = ?response.finish_reason,
            "Classification response received"
        );

        parse_qualification(&response.content)
    }
}

// ── Response parsing ────────────────────────────────────────────────

/// Parse the model output into a `Qualification`.
fn parse_qualification(raw: &str) -> Result<Qualification, ClassificationError> {
    if raw.trim().is_empty() {
        return Err(ClassificationError::EmptyOutput);
    }

    let json_str = extract_json_object(raw);
    let value: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| ClassificationError::Parse(format!("JSON parse error: {e}")))?;

    if !value.is_object() {
        return Err(ClassificationError::Parse(
            "expected a JSON object".to_string(),
        ));
    }

    let response: QualificationResponse = serde_json::from_value(value)
        .map_err(|e| ClassificationError::Parse(format!("unexpected field types: {e}")))?;

    Ok(Qualification {
        response_text: response
            .response_text
            .map(|t| t.trim().chars().take(MAX_RESPONSE_CHARS).collect())
            .unwrap_or_default(),
        intent: response
            .intent
            .as_deref()
            .map(Intent::from_token)
            .unwrap_or_default(),
        budget_tier: response
            .budget_tier
            .as_deref()
            .map(BudgetTier::from_token)
            .unwrap_or_default(),
        property_type: response
            .property_type
            .as_deref()
            .map(PropertyType::from_token)
            .unwrap_or_default(),
        handoff_required: response
            .handoff_required
            .as_ref()
            .map(parse_bool)
            .unwrap_or(false),
    })
}

/// Accept `true`, `"TRUE"`, `"true"` and `"SI"` as a positive flag.
fn parse_bool(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => crate::pipeline::types::parse_flag_token(s),
        _ => false,
    }
}

/// Extract a JSON object from LLM output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
