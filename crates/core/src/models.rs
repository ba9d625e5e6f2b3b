use serde::{Deserialize, Serialize};

use crate::error::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    CreateMaintenanceRequest,
    QueryStatus,
    ListMyRequests,
    Emergency,
    GeneralInquiry,
    Unknown,
}

impl Intent {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "CREATE_MAINTENANCE_REQUEST" => Some(Self::CreateMaintenanceRequest),
            "QUERY_STATUS" => Some(Self::QueryStatus),
            "LIST_MY_REQUESTS" => Some(Self::ListMyRequests),
            "EMERGENCY" => Some(Self::Emergency),
            "GENERAL_INQUIRY" => Some(Self::GeneralInquiry),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Self::CreateMaintenanceRequest => "CREATE_MAINTENANCE_REQUEST",
            Self::QueryStatus => "QUERY_STATUS",
            Self::ListMyRequests => "LIST_MY_REQUESTS",
            Self::Emergency => "EMERGENCY",
            Self::GeneralInquiry => "GENERAL_INQUIRY",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceCategory {
    Plumbing,
    Electrical,
    Hvac,
    Appliance,
    Structural,
    PestControl,
    Cleaning,
    Other,
}

impl MaintenanceCategory {
    /// Lenient parse used for provider output; anything unrecognised is `Other`.
    pub fn parse_or_other(value: &str) -> Self {
        match value.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "PLUMBING" => Self::Plumbing,
            "ELECTRICAL" => Self::Electrical,
            "HVAC" => Self::Hvac,
            "APPLIANCE" => Self::Appliance,
            "STRUCTURAL" => Self::Structural,
            "PEST_CONTROL" => Self::PestControl,
            "CLEANING" => Self::Cleaning,
            _ => Self::Other,
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Self::Plumbing => "PLUMBING",
            Self::Electrical => "ELECTRICAL",
            Self::Hvac => "HVAC",
            Self::Appliance => "APPLIANCE",
            Self::Structural => "STRUCTURAL",
            Self::PestControl => "PEST_CONTROL",
            Self::Cleaning => "CLEANING",
            Self::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub title: String,
    pub description: String,
    pub category: MaintenanceCategory,
}

/// A caller's intent request. Construct through [`IntentQuery::new`] so the
/// query text is guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentQuery {
    #[serde(rename = "query")]
    pub query_text: String,
    pub user_id: i64,
    #[serde(default)]
    pub context: Option<String>,
}

impl IntentQuery {
    pub fn new(
        query_text: impl Into<String>,
        user_id: i64,
        context: Option<String>,
    ) -> Result<Self, QueryError> {
        Self {
            query_text: query_text.into(),
            user_id,
            context,
        }
        .validated()
    }

    /// Re-checks a deserialized query; blank context is dropped.
    pub fn validated(mut self) -> Result<Self, QueryError> {
        if self.query_text.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        self.context = self.context.filter(|value| !value.trim().is_empty());
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResult {
    pub intent: Intent,
    pub confidence: f32,
    pub extracted_data: Option<ExtractedData>,
    pub ticket_id: Option<i64>,
    pub is_emergency: bool,
    pub additional_info: Option<String>,
}

impl IntentResult {
    pub fn new(intent: Intent, confidence: f32) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            extracted_data: None,
            ticket_id: None,
            is_emergency: false,
            additional_info: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResponse {
    #[serde(rename = "response", alias = "responseText")]
    pub response_text: String,
    pub intent: IntentResult,
    pub success: bool,
    pub error: Option<String>,
}

impl ProcessingResponse {
    pub fn resolved(response_text: impl Into<String>, intent: IntentResult) -> Self {
        Self {
            response_text: response_text.into(),
            intent,
            success: true,
            error: None,
        }
    }

    /// Payload for requests rejected before classification (e.g. empty query).
    pub fn rejected(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            response_text: error.clone(),
            intent: IntentResult::new(Intent::Unknown, 0.0),
            success: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechToTextResponse {
    pub text: String,
    pub success: bool,
    pub confidence: f32,
    pub error: Option<String>,
}

impl SpeechToTextResponse {
    /// Fixed confidence reported for any successful transcription.
    pub const SUCCESS_CONFIDENCE: f32 = 0.9;

    pub fn transcribed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
            confidence: Self::SUCCESS_CONFIDENCE,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            success: false,
            confidence: 0.0,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextToSpeechRequest {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextToSpeechResponse {
    pub audio_base64: String,
    pub success: bool,
    pub error: Option<String>,
    pub format: Option<AudioFormat>,
}

impl TextToSpeechResponse {
    pub fn synthesized(audio_base64: String) -> Self {
        Self {
            audio_base64,
            success: true,
            error: None,
            format: Some(AudioFormat::Mp3),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            audio_base64: String::new(),
            success: false,
            error: Some(error.into()),
            format: None,
        }
    }
}
