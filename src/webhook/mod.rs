//! WhatsApp Cloud API webhook: subscription handshake and message delivery.

pub mod routes;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::VerificationError;
use crate::pipeline::types::InboundLead;

pub use routes::{WebhookState, webhook_routes};

/// Body returned for every delivery.
pub const EVENT_RECEIVED: &str = "EVENT_RECEIVED";

const SUBSCRIBE_MODE: &str = "subscribe";

/// `GET /webhook` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Check a subscription handshake and return the challenge to echo.
pub fn verify(query: &VerifyQuery, expected: &SecretString) -> Result<String, VerificationError> {
    if query.mode.is_none() && query.verify_token.is_none() && query.challenge.is_none() {
        return Err(VerificationError::MissingParameters);
    }

    if query.mode.as_deref() != Some(SUBSCRIBE_MODE) {
        return Err(VerificationError::ModeMismatch);
    }

    let token_matches = query
        .verify_token
        .as_deref()
        .is_some_and(|t| constant_time_eq(t, expected.expose_secret()));
    if !token_matches {
        return Err(VerificationError::TokenMismatch);
    }

    query
        .challenge
        .clone()
        .ok_or(VerificationError::MissingChallenge)
}

/// Compare two strings without short-circuiting on the first difference.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}

// ── Delivery payload ────────────────────────────────────────────────

/// Location of the one message read from a delivery.
const FIRST_MESSAGE: &str = "/entry/0/changes/0/value/messages/0";

/// Pull the first text message out of a delivery.
///
/// Only `entry[0].changes[0].value.messages[0]` is inspected, so the shape
/// of sibling entries or messages never matters. Status callbacks, media
/// messages and anything without a sender yield `None`.
pub fn extract_message(payload: &serde_json::Value) -> Option<InboundLead> {
    let message = payload.pointer(FIRST_MESSAGE)?;

    let text = message.pointer("/text/body")?.as_str()?;
    let from = message.get("from")?.as_str()?;
    if text.is_empty() || from.is_empty() {
        return None;
    }

    let lead = InboundLead::new(from, text);
    Some(match message.get("id").and_then(|id| id.as_str()) {
        Some(id) if !id.is_empty() => lead.with_id(id),
        _ => lead,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(mode: Option<&str>, token: Option<&str>, challenge: Option<&str>) -> VerifyQuery {
        VerifyQuery {
            mode: mode.map(String::from),
            verify_token: token.map(String::from),
            challenge: challenge.map(String::from),
        }
    }

    fn secret() -> SecretString {
        SecretString::from("s3cret")
    }

    #[test]
    fn verify_accepts_subscribe_with_matching_token() {
        let q = query(Some("subscribe"), Some("s3cret"), Some("1158201444"));
        assert_eq!(verify(&q, &secret()).unwrap(), "1158201444");
    }

    #[test]
    fn verify_rejections() {
        assert_eq!(
            verify(&query(None, None, None), &secret()),
            Err(VerificationError::MissingParameters)
        );
        assert_eq!(
            verify(&query(None, Some("s3cret"), Some("c")), &secret()),
            Err(VerificationError::ModeMismatch)
        );
        assert_eq!(
            verify(&query(Some("unsubscribe"), Some("s3cret"), Some("c")), &secret()),
            Err(VerificationError::ModeMismatch)
        );
        assert_eq!(
            verify(&query(Some("subscribe"), Some("wrong"), Some("c")), &secret()),
            Err(VerificationError::TokenMismatch)
        );
        assert_eq!(
            verify(&query(Some("subscribe"), None, Some("c")), &secret()),
            Err(VerificationError::TokenMismatch)
        );
        assert_eq!(
            verify(&query(Some("subscribe"), Some("s3cret"), None), &secret()),
            Err(VerificationError::MissingChallenge)
        );
    }

    #[test]
    fn constant_time_eq_compares_content_and_length() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(!constant_time_eq("", "a"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn query_deserializes_hub_parameters() {
        let q: VerifyQuery = serde_json::from_value(serde_json::json!({
            "hub.mode": "subscribe",
            "hub.verify_token": "t",
            "hub.challenge": "c"
        }))
        .unwrap();
        assert_eq!(q.mode.as_deref(), Some("subscribe"));
        assert_eq!(q.verify_token.as_deref(), Some("t"));
        assert_eq!(q.challenge.as_deref(), Some("c"));
    }

    #[test]
    fn extract_text_message() {
        let payload = serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "WABA_ID",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "messages": [{
                            "from": "5215555555555",
                            "id": "wamid.HBgN",
                            "timestamp": "1714564800",
                            "type": "text",
                            "text": { "body": "Busco casa en la playa" }
                        }]
                    }
                }]
            }]
        });

        let lead = extract_message(&payload).unwrap();
        assert_eq!(lead.sender_id, "5215555555555");
        assert_eq!(lead.text, "Busco casa en la playa");
        assert_eq!(lead.id, "wamid.HBgN");
    }

    #[test]
    fn extract_ignores_status_callbacks_and_media() {
        let status = serde_json::json!({
            "entry": [{ "changes": [{ "value": { "statuses": [{ "status": "read" }] } }] }]
        });
        assert!(extract_message(&status).is_none());

        let image = serde_json::json!({
            "entry": [{ "changes": [{ "value": { "messages": [{
                "from": "111", "type": "image", "image": { "id": "media-1" }
            }] } }] }]
        });
        assert!(extract_message(&image).is_none());

        let no_sender = serde_json::json!({
            "entry": [{ "changes": [{ "value": { "messages": [{
                "text": { "body": "hola" }
            }] } }] }]
        });
        assert!(extract_message(&no_sender).is_none());

        assert!(extract_message(&serde_json::json!({})).is_none());
    }

    #[test]
    fn extract_generates_id_when_absent() {
        let payload = serde_json::json!({
            "entry": [{ "changes": [{ "value": { "messages": [{
                "from": "111", "text": { "body": "hola" }
            }] } }] }]
        });
        let lead = extract_message(&payload).unwrap();
        assert!(!lead.id.is_empty());
    }

    #[test]
    fn extract_keeps_whitespace_only_body() {
        let payload = serde_json::json!({
            "entry": [{ "changes": [{ "value": { "messages": [{
                "from": "111", "id": "wamid.ws", "text": { "body": "   " }
            }] } }] }]
        });
        let lead = extract_message(&payload).unwrap();
        assert_eq!(lead.text, "   ");
        assert_eq!(lead.sender_id, "111");

        let empty = serde_json::json!({
            "entry": [{ "changes": [{ "value": { "messages": [{
                "from": "111", "text": { "body": "" }
            }] } }] }]
        });
        assert!(extract_message(&empty).is_none());
    }

    #[test]
    fn extract_ignores_shape_of_later_messages() {
        let payload = serde_json::json!({
            "entry": [{ "changes": [{ "value": { "messages": [
                { "from": "111", "id": "wamid.first", "text": { "body": "hola" } },
                { "from": 222, "text": "not an object" }
            ] } }] }, { "changes": "unexpected" }]
        });
        let lead = extract_message(&payload).unwrap();
        assert_eq!(lead.sender_id, "111");
        assert_eq!(lead.id, "wamid.first");
    }
}
