use std::sync::Arc;

use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ProviderSettings;
use crate::{GeminiProvider, HuggingFaceProvider, IntentProvider, ProviderError, ProviderKind};

#[derive(Debug, Clone, Serialize)]
pub struct ProviderDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    pub model: String,
    /// Lower runs first.
    pub priority: usize,
    pub available: bool,
}

/// One slot of the registry. A slot without a client stays listed so it can
/// be reported, but every invocation fails without leaving the process.
#[derive(Clone)]
pub struct RegisteredProvider {
    descriptor: ProviderDescriptor,
    client: Option<Arc<dyn IntentProvider>>,
}

impl RegisteredProvider {
    pub fn ready(priority: usize, display_name: &'static str, client: Arc<dyn IntentProvider>) -> Self {
        Self {
            descriptor: ProviderDescriptor {
                name: client.name(),
                display_name,
                model: client.model().to_string(),
                priority,
                available: true,
            },
            client: Some(client),
        }
    }

    pub fn unconfigured(
        priority: usize,
        name: &'static str,
        display_name: &'static str,
        model: impl Into<String>,
    ) -> Self {
        Self {
            descriptor: ProviderDescriptor {
                name,
                display_name,
                model: model.into(),
                priority,
                available: false,
            },
            client: None,
        }
    }

    pub fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    pub async fn invoke(&self, prompt: &str) -> Result<String, ProviderError> {
        match &self.client {
            Some(client) => client.generate(prompt).await,
            None => Err(ProviderError::NotConfigured {
                provider: self.descriptor.name,
            }),
        }
    }
}

/// Immutable set of providers, built once at startup and shared by every
/// request.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<RegisteredProvider>,
}

impl ProviderRegistry {
    pub fn new(mut providers: Vec<RegisteredProvider>) -> Self {
        providers.sort_by_key(|provider| provider.descriptor.priority);
        Self { providers }
    }

    pub fn from_settings(settings: &ProviderSettings, client: Client) -> Self {
        let providers = settings
            .priority_order()
            .into_iter()
            .enumerate()
            .map(|(priority, kind)| build_slot(settings, &client, priority, kind))
            .collect();
        Self::new(providers)
    }

    /// Providers in attempt order.
    pub fn providers(&self) -> &[RegisteredProvider] {
        &self.providers
    }

    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.providers
            .iter()
            .map(|provider| provider.descriptor.clone())
            .collect()
    }

    pub fn primary(&self) -> Option<&ProviderDescriptor> {
        self.providers.first().map(|provider| &provider.descriptor)
    }

    pub fn available_count(&self) -> usize {
        self.providers
            .iter()
            .filter(|provider| provider.descriptor.available)
            .count()
    }
}

fn build_slot(
    settings: &ProviderSettings,
    client: &Client,
    priority: usize,
    kind: ProviderKind,
) -> RegisteredProvider {
    let model = settings.model_for(kind).to_string();
    let Some(credential) = settings.credential_for(kind) else {
        warn!(provider = kind.as_str(), "provider credential missing; slot disabled");
        return RegisteredProvider::unconfigured(priority, kind.as_str(), kind.display_name(), model);
    };

    let adapter: Arc<dyn IntentProvider> = match kind {
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(client.clone(), credential, model)),
        ProviderKind::HuggingFace => {
            Arc::new(HuggingFaceProvider::new(client.clone(), credential, model))
        }
    };
    info!(provider = kind.as_str(), priority, "provider initialized");
    RegisteredProvider::ready(priority, kind.display_name(), adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_leave_disabled_slots() {
        let settings = ProviderSettings {
            active: ProviderKind::HuggingFace,
            huggingface_token: Some("hf_token".to_string()),
            ..ProviderSettings::default()
        };
        let registry = ProviderRegistry::from_settings(&settings, Client::new());

        let names = registry
            .providers()
            .iter()
            .map(|provider| provider.descriptor().name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["huggingface", "gemini"]);
        assert_eq!(registry.available_count(), 1);
        assert!(!registry.providers()[1].descriptor().available);
    }

    #[tokio::test]
    async fn unconfigured_slot_fails_without_network() {
        let slot = RegisteredProvider::unconfigured(0, "gemini", "Google Gemini", "gemini-2.0-flash-exp");
        let err = slot.invoke("prompt").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured { provider: "gemini" }));
    }
}
