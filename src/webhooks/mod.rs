//! Payment processor callbacks.
//!
//! Verification and parsing are pure and kept apart: a payload is first
//! authenticated against the exact bytes received, then decoded. Applying the
//! event lives in [`crate::services::payments::PaymentService::reconcile`].

use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::errors::ServiceError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying `t=<unix seconds>,v1=<hex hmac>[,v1=...]`
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Outcome of checking a signature header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationResult {
    Verified,
    /// Header absent pieces or not parseable
    Malformed,
    /// Timestamp outside the tolerance window
    Stale,
    /// No `v1` entry matched
    Mismatch,
}

impl VerificationResult {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationResult::Verified)
    }
}

/// Checks a Stripe-style signature over the raw request body.
///
/// The signed payload is `"{t}.{raw}"`. Any of several `v1` entries may
/// match (secret rotation). Comparison is constant time.
pub fn verify_signature(
    raw: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
    now_unix: i64,
) -> VerificationResult {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(sig) = part.strip_prefix("v1=") {
            signatures.push(sig);
        }
    }

    let Some(timestamp) = timestamp else {
        return VerificationResult::Malformed;
    };
    let Ok(signed_at) = timestamp.parse::<i64>() else {
        return VerificationResult::Malformed;
    };
    if signatures.is_empty() {
        return VerificationResult::Malformed;
    }

    if now_unix.abs_diff(signed_at) > tolerance.as_secs() {
        return VerificationResult::Stale;
    }

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return VerificationResult::Malformed;
    };
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(raw);

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matched {
        VerificationResult::Verified
    } else {
        VerificationResult::Mismatch
    }
}

/// Builds a header value for `raw` signed at `timestamp`.
pub fn sign_payload(raw: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return format!("t={}", timestamp),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(raw);
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Processor event, reduced to what reconciliation needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    PaymentSucceeded {
        event_id: String,
        payment_intent_id: String,
        /// Raw `metadata.order_id`, if the intent carried one
        order_id: Option<String>,
    },
    Other {
        event_id: String,
        event_type: String,
    },
}

impl WebhookEvent {
    pub fn event_id(&self) -> &str {
        match self {
            WebhookEvent::PaymentSucceeded { event_id, .. } => event_id,
            WebhookEvent::Other { event_id, .. } => event_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Option<RawData>,
}

#[derive(Debug, Deserialize)]
struct RawData {
    object: RawObject,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    #[serde(default)]
    id: String,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Decodes a verified payload.
pub fn parse_event(raw: &[u8]) -> Result<WebhookEvent, ServiceError> {
    let event: RawEvent = serde_json::from_slice(raw)
        .map_err(|e| ServiceError::InvalidArgument(format!("unreadable webhook payload: {}", e)))?;

    match event.event_type.as_str() {
        "payment_intent.succeeded" | "payment_succeeded" => {
            let object = event.data.map(|data| data.object);
            let order_id = object
                .as_ref()
                .and_then(|obj| obj.metadata.as_ref())
                .and_then(|metadata| metadata.get("order_id"))
                .and_then(|value| match value {
                    serde_json::Value::String(s) => Some(s.clone()),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                });
            Ok(WebhookEvent::PaymentSucceeded {
                event_id: event.id,
                payment_intent_id: object.map(|obj| obj.id).unwrap_or_default(),
                order_id,
            })
        }
        _ => Ok(WebhookEvent::Other {
            event_id: event.id,
            event_type: event.event_type,
        }),
    }
}
