use std::env;
use std::time::Duration;

use crate::ProviderKind;

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_millis(8_000);

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
const DEFAULT_HUGGINGFACE_MODEL: &str = "mistralai/Mixtral-8x7B-Instruct-v0.1";
const PLACEHOLDER_CREDENTIALS: &[&str] = &["YOUR_GEMINI_API_KEY", "YOUR_HUGGINGFACE_API_TOKEN"];

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub active: ProviderKind,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub huggingface_token: Option<String>,
    pub huggingface_model: String,
    pub attempt_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            active: ProviderKind::Gemini,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            huggingface_token: None,
            huggingface_model: DEFAULT_HUGGINGFACE_MODEL.to_string(),
            attempt_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

impl ProviderSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            active: env::var("GENIE_AI_PROVIDER")
                .ok()
                .and_then(|value| ProviderKind::parse(&value))
                .unwrap_or(defaults.active),
            gemini_api_key: credential("GENIE_GEMINI_API_KEY"),
            gemini_model: env::var("GENIE_GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            huggingface_token: credential("GENIE_HUGGINGFACE_API_TOKEN"),
            huggingface_model: env::var("GENIE_HUGGINGFACE_MODEL")
                .unwrap_or(defaults.huggingface_model),
            attempt_timeout: env::var("GENIE_PROVIDER_TIMEOUT_MS")
                .ok()
                .and_then(|value| value.trim().parse::<u64>().ok())
                .filter(|millis| *millis > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.attempt_timeout),
        }
    }

    /// Active provider first, then the remaining ones in default order.
    pub fn priority_order(&self) -> Vec<ProviderKind> {
        let mut order = vec![self.active];
        order.extend(
            ProviderKind::DEFAULT_ORDER
                .iter()
                .copied()
                .filter(|kind| *kind != self.active),
        );
        order
    }

    pub fn credential_for(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::Gemini => self.gemini_api_key.as_deref(),
            ProviderKind::HuggingFace => self.huggingface_token.as_deref(),
        }
    }

    pub fn model_for(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::Gemini => &self.gemini_model,
            ProviderKind::HuggingFace => &self.huggingface_model,
        }
    }
}

fn credential(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| usable_credential(&value))
}

pub(crate) fn usable_credential(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || PLACEHOLDER_CREDENTIALS.contains(&value) {
        None
    } else {
        Some(value.to_string())
    }
}
