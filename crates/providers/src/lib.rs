mod config;
mod error;
mod gemini;
mod huggingface;
mod registry;

use futures::future::BoxFuture;

pub use config::{ProviderSettings, DEFAULT_PROVIDER_TIMEOUT};
pub use error::ProviderError;
pub use gemini::GeminiProvider;
pub use huggingface::HuggingFaceProvider;
pub use registry::{ProviderDescriptor, ProviderRegistry, RegisteredProvider};

/// A text-generation backend consulted for intent classification.
///
/// Implementations make exactly one attempt per call; retries and fallback
/// belong to the caller.
pub trait IntentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ProviderError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Gemini,
    HuggingFace,
}

impl ProviderKind {
    /// Order used after the active provider.
    pub const DEFAULT_ORDER: [ProviderKind; 2] = [Self::Gemini, Self::HuggingFace];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "huggingface" | "hugging_face" | "hf" => Some(Self::HuggingFace),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::HuggingFace => "huggingface",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Gemini => "Google Gemini",
            Self::HuggingFace => "Hugging Face",
        }
    }
}
