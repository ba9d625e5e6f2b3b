use serde_json::{Map, Value};

use crate::error::PayloadError;
use crate::models::{ExtractedData, Intent, IntentResult, MaintenanceCategory};

pub const DEFAULT_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_REPLY: &str = "I'm processing your request.";

/// A provider object that passed validation, ready to return to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderVerdict {
    pub result: IntentResult,
    pub reply: String,
}

/// Maps a normalized provider object onto an [`IntentResult`].
///
/// `intent` is required and must name a known intent. `confidence`,
/// `isEmergency`, `extractedData`, `ticketId` and `response` fall back to
/// defaults when absent or unusable.
pub fn interpret_provider_object(object: &Map<String, Value>) -> Result<ProviderVerdict, PayloadError> {
    let raw_intent = object
        .get("intent")
        .ok_or(PayloadError::MissingField("intent"))?;
    let intent = raw_intent
        .as_str()
        .and_then(Intent::parse)
        .ok_or_else(|| PayloadError::InvalidField {
            field: "intent",
            value: raw_intent.to_string(),
        })?;

    let confidence = object
        .get("confidence")
        .and_then(numeric)
        .filter(|value| value.is_finite())
        .map(|value| value as f32)
        .unwrap_or(DEFAULT_CONFIDENCE);

    let reply = object
        .get("response")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_REPLY)
        .to_string();

    let mut result = IntentResult::new(intent, confidence);
    result.is_emergency = object
        .get("isEmergency")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    result.extracted_data = object.get("extractedData").and_then(extracted_data);
    result.ticket_id = object.get("ticketId").and_then(Value::as_i64);
    result.additional_info = Some(reply.clone());

    Ok(ProviderVerdict { result, reply })
}

/// Numbers, or numbers sent as strings (`"0.9"`).
fn numeric(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|raw| raw.trim().parse::<f64>().ok()))
}

fn extracted_data(value: &Value) -> Option<ExtractedData> {
    let object = value.as_object()?;
    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Some(ExtractedData {
        title: text("title"),
        description: text("description"),
        category: object
            .get("category")
            .and_then(Value::as_str)
            .map(MaintenanceCategory::parse_or_other)
            .unwrap_or(MaintenanceCategory::Other),
    })
}
