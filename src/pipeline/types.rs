//! Shared types for the lead intake pipeline.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length (in characters) of the advisory reply text.
pub const MAX_RESPONSE_CHARS: usize = 256;

/// Reply used when the model gave no response text.
const DEFAULT_REPLY: &str = "Gracias por tu mensaje.";

/// Notice appended to the reply when a human agent takes over.
const HANDOFF_NOTICE: &str = "Un agente humano te contactará en breve.";

/// Normalize a token for lenient matching: trimmed, lowercase, accents folded.
fn normalize_token(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' => 'u',
            other => other,
        })
        .collect()
}

// ── Classification enums ────────────────────────────────────────────

/// What the lead wants to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Purchase,
    Rental,
    Investment,
    #[default]
    Undefined,
    /// Classification failed; the record needs a human.
    Error,
}

impl Intent {
    /// Token written to the sheet.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "Purchase",
            Self::Rental => "Rental",
            Self::Investment => "Investment",
            Self::Undefined => "Undefined",
            Self::Error => "Error",
        }
    }

    /// Parse a model or sheet token. Unknown tokens map to `Undefined`.
    pub fn from_token(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "purchase" | "buy" | "compra" => Self::Purchase,
            "rental" | "rent" | "renta" | "alquiler" => Self::Rental,
            "investment" | "inversion" => Self::Investment,
            "error" => Self::Error,
            _ => Self::Undefined,
        }
    }
}

/// Budget range the lead falls into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetTier {
    Low,
    Medium,
    High,
    Luxury,
    #[default]
    Undefined,
}

impl BudgetTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Luxury => "Luxury",
            Self::Undefined => "Undefined",
        }
    }

    pub fn from_token(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "low" | "bajo" => Self::Low,
            "medium" | "medio" => Self::Medium,
            "high" | "alto" => Self::High,
            "luxury" | "lujo" => Self::Luxury,
            _ => Self::Undefined,
        }
    }
}

/// Kind of property the lead is asking about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    House,
    Apartment,
    Land,
    #[default]
    Undefined,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::House => "House",
            Self::Apartment => "Apartment",
            Self::Land => "Land",
            Self::Undefined => "Undefined",
        }
    }

    pub fn from_token(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "house" | "casa" => Self::House,
            "apartment" | "departamento" => Self::Apartment,
            "land" | "lot" | "terreno" => Self::Land,
            _ => Self::Undefined,
        }
    }
}

/// Handoff lifecycle of a persisted lead.
///
/// Starts at `Pending` or `Automatic`; the only legal transition is to
/// `Resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandoffStatus {
    /// Waiting for a human agent.
    Pending,
    /// Handled by the assistant, no human needed.
    Automatic,
    /// An agent has taken the lead.
    Resolved,
}

impl HandoffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Automatic => "Automatic",
            Self::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for HandoffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode the handoff flag the way the sheet stores it.
pub fn flag_token(flag: bool) -> &'static str {
    if flag { "YES" } else { "NO" }
}

/// Decode a handoff flag token (`YES`/`SI`/`TRUE`).
pub fn parse_flag_token(raw: &str) -> bool {
    matches!(normalize_token(raw).as_str(), "yes" | "si" | "true")
}

// ── Qualification ───────────────────────────────────────────────────

/// Structured assessment of one inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualification {
    pub response_text: String,
    pub intent: Intent,
    pub budget_tier: BudgetTier,
    pub property_type: PropertyType,
    pub handoff_required: bool,
}

impl Qualification {
    /// Apology text used when classification fails.
    pub const FALLBACK_RESPONSE: &'static str =
        "Lo siento, hay un error en nuestro sistema. Un agente humano te atenderá pronto.";

    /// The canonical qualification for a failed classification.
    pub fn fallback() -> Self {
        Self {
            response_text: Self::FALLBACK_RESPONSE.to_string(),
            intent: Intent::Error,
            budget_tier: BudgetTier::Undefined,
            property_type: PropertyType::Undefined,
            handoff_required: true,
        }
    }

    /// The reply the assistant would send back to the lead.
    pub fn reply_text(&self) -> String {
        let base = if self.response_text.trim().is_empty() {
            DEFAULT_REPLY
        } else {
            self.response_text.as_str()
        };

        if self.handoff_required {
            format!("{base}\n\n{HANDOFF_NOTICE}")
        } else {
            base.to_string()
        }
    }
}

// ── Inbound message ─────────────────────────────────────────────────

/// A text message extracted from a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundLead {
    /// Platform message id, or a generated UUID when absent.
    pub id: String,
    /// Sender id assigned by the platform (phone number for WhatsApp).
    pub sender_id: String,
    /// Message body, unmodified.
    pub text: String,
    /// When the webhook delivered the message.
    pub received_at: DateTime<Utc>,
}

impl InboundLead {
    pub fn new(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            text: text.into(),
            received_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

// ── Persisted record ────────────────────────────────────────────────

/// Header row of the leads sheet, columns A..H.
pub const SHEET_HEADER: [&str; 8] = [
    "Timestamp",
    "SenderId",
    "RawMessage",
    "Intent",
    "BudgetTier",
    "PropertyType",
    "HandoffFlag",
    "HandoffStatus",
];

/// One row of the leads sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadRecord {
    pub timestamp: DateTime<Utc>,
    pub sender_id: String,
    pub raw_message: String,
    pub intent: Intent,
    pub budget_tier: BudgetTier,
    pub property_type: PropertyType,
    pub handoff_flag: bool,
    pub handoff_status: HandoffStatus,
}

impl LeadRecord {
    /// Build a record from a message, its qualification and its initial status.
    pub fn new(
        lead: &InboundLead,
        qualification: &Qualification,
        handoff_status: HandoffStatus,
    ) -> Self {
        Self {
            timestamp: lead.received_at,
            sender_id: lead.sender_id.clone(),
            raw_message: lead.text.clone(),
            intent: qualification.intent,
            budget_tier: qualification.budget_tier,
            property_type: qualification.property_type,
            handoff_flag: qualification.handoff_required,
            handoff_status,
        }
    }

    /// Cell values in sheet column order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.sender_id.clone(),
            self.raw_message.clone(),
            self.intent.as_str().to_string(),
            self.budget_tier.as_str().to_string(),
            self.property_type.as_str().to_string(),
            flag_token(self.handoff_flag).to_string(),
            self.handoff_status.as_str().to_string(),
        ]
    }
}

/// 1-based sheet row number (row 1 is the header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RowIndex(u32);

impl RowIndex {
    pub fn new(row: u32) -> Self {
        Self(row)
    }

    /// Row number for a zero-based offset into a column read that includes
    /// the header at offset 0.
    pub fn from_column_offset(offset: usize) -> Self {
        Self(offset as u32 + 1)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RowIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_accept_legacy_spanish_values() {
        assert_eq!(Intent::from_token("Compra"), Intent::Purchase);
        assert_eq!(Intent::from_token("Inversión"), Intent::Investment);
        assert_eq!(Intent::from_token("ERROR"), Intent::Error);
        assert_eq!(BudgetTier::from_token("Lujo"), BudgetTier::Luxury);
        assert_eq!(PropertyType::from_token("Departamento"), PropertyType::Apartment);
        assert!(parse_flag_token("SI"));
    }

    #[test]
    fn unknown_tokens_are_undefined() {
        assert_eq!(Intent::from_token("Indefinida"), Intent::Undefined);
        assert_eq!(BudgetTier::from_token("gigantic"), BudgetTier::Undefined);
        assert_eq!(PropertyType::from_token(""), PropertyType::Undefined);
        assert!(!parse_flag_token("maybe"));
    }

    #[test]
    fn fallback_forces_handoff() {
        let q = Qualification::fallback();
        assert_eq!(q.intent, Intent::Error);
        assert!(q.handoff_required);
        assert_eq!(q.budget_tier, BudgetTier::Undefined);
        assert_eq!(q.property_type, PropertyType::Undefined);
    }

    #[test]
    fn reply_text_appends_handoff_notice() {
        let mut q = Qualification {
            response_text: "Con gusto te ayudo.".into(),
            intent: Intent::Purchase,
            budget_tier: BudgetTier::Medium,
            property_type: PropertyType::House,
            handoff_required: false,
        };
        assert_eq!(q.reply_text(), "Con gusto te ayudo.");

        q.handoff_required = true;
        assert!(q.reply_text().starts_with("Con gusto te ayudo."));
        assert!(q.reply_text().ends_with(HANDOFF_NOTICE));

        q.response_text = "  ".into();
        assert!(q.reply_text().starts_with(DEFAULT_REPLY));
    }

    #[test]
    fn record_row_layout() {
        let lead = InboundLead::new("5215555555555", "Busco casa en renta");
        let q = Qualification {
            response_text: "ok".into(),
            intent: Intent::Rental,
            budget_tier: BudgetTier::Low,
            property_type: PropertyType::House,
            handoff_required: false,
        };
        let record = LeadRecord::new(&lead, &q, HandoffStatus::Automatic);
        let row = record.to_row();

        assert_eq!(row.len(), SHEET_HEADER.len());
        assert!(row[0].ends_with('Z'));
        assert_eq!(&row[1..], &[
            "5215555555555",
            "Busco casa en renta",
            "Rental",
            "Low",
            "House",
            "NO",
            "Automatic",
        ]);
    }

    #[test]
    fn row_index_accounts_for_header() {
        assert_eq!(RowIndex::from_column_offset(0).get(), 1);
        assert_eq!(RowIndex::from_column_offset(6).get(), 7);
        assert_eq!(RowIndex::new(7).to_string(), "7");
    }
}
