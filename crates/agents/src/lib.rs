use std::sync::Arc;
use std::time::{Duration, Instant};

use genie_core::{
    build_intent_prompt, classify_intent_rules, extract_json_object, interpret_provider_object,
    IntentQuery, ProcessingResponse, ProviderVerdict,
};
use genie_observability::AppMetrics;
use genie_providers::{ProviderRegistry, RegisteredProvider, DEFAULT_PROVIDER_TIMEOUT};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Where a provider attempt broke down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Invoke,
    Timeout,
    Normalize,
    Validate,
}

impl FailureStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invoke => "invoke",
            Self::Timeout => "timeout",
            Self::Normalize => "normalize",
            Self::Validate => "validate",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Resolved(ProviderVerdict),
    Failed { stage: FailureStage, detail: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub provider: &'static str,
    pub stage: Option<FailureStage>,
    pub detail: Option<String>,
    pub elapsed_millis: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "provider", rename_all = "snake_case")]
pub enum ResolvedBy {
    Provider(&'static str),
    Rules,
}

/// Full trace of one request through the cascade.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub response: ProcessingResponse,
    pub resolved_by: ResolvedBy,
    pub attempts: Vec<AttemptRecord>,
}

/// Walks the provider registry in priority order, one bounded attempt per
/// provider, and ends at the keyword classifier when nothing else produced a
/// valid result. Never fails.
#[derive(Clone)]
pub struct IntentOrchestrator {
    registry: Arc<ProviderRegistry>,
    metrics: Arc<AppMetrics>,
    attempt_timeout: Duration,
}

impl IntentOrchestrator {
    pub fn new(registry: Arc<ProviderRegistry>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            registry,
            metrics,
            attempt_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    pub async fn recognize_intent(&self, query: &IntentQuery) -> ProcessingResponse {
        self.resolve(query).await.response
    }

    #[instrument(skip(self, query), fields(user_id = query.user_id))]
    pub async fn resolve(&self, query: &IntentQuery) -> Resolution {
        let started = Instant::now();
        self.metrics.inc_request();

        let prompt = build_intent_prompt(query);
        let mut attempts = Vec::with_capacity(self.registry.providers().len());

        for provider in self.registry.providers() {
            let name = provider.descriptor().name;
            let attempt_started = Instant::now();
            self.metrics.inc_provider_attempt(name);

            let outcome = self.attempt(provider, &prompt).await;
            let elapsed_millis = attempt_started.elapsed().as_millis() as u64;

            match outcome {
                AttemptOutcome::Resolved(verdict) => {
                    attempts.push(AttemptRecord {
                        provider: name,
                        stage: None,
                        detail: None,
                        elapsed_millis,
                    });
                    self.metrics.observe_latency(started.elapsed());
                    info!(
                        resolved_by = name,
                        intent = verdict.result.intent.as_label(),
                        attempts = attempts.len(),
                        "intent resolved by provider"
                    );
                    return Resolution {
                        response: ProcessingResponse::resolved(verdict.reply, verdict.result),
                        resolved_by: ResolvedBy::Provider(name),
                        attempts,
                    };
                }
                AttemptOutcome::Failed { stage, detail } => {
                    self.metrics.inc_provider_failure(name, stage.as_str());
                    warn!(
                        provider = name,
                        stage = stage.as_str(),
                        error = %detail,
                        "provider attempt failed; moving on"
                    );
                    attempts.push(AttemptRecord {
                        provider: name,
                        stage: Some(stage),
                        detail: Some(detail),
                        elapsed_millis,
                    });
                }
            }
        }

        self.metrics.inc_rule_fallback();
        let fallback = classify_intent_rules(&query.query_text);
        self.metrics.observe_latency(started.elapsed());
        warn!(
            attempts = attempts.len(),
            intent = fallback.result.intent.as_label(),
            "all providers failed; using rule-based classification"
        );

        Resolution {
            response: ProcessingResponse::resolved(fallback.reply, fallback.result),
            resolved_by: ResolvedBy::Rules,
            attempts,
        }
    }

    async fn attempt(&self, provider: &RegisteredProvider, prompt: &str) -> AttemptOutcome {
        let raw = match tokio::time::timeout(self.attempt_timeout, provider.invoke(prompt)).await {
            Err(_) => {
                return AttemptOutcome::Failed {
                    stage: FailureStage::Timeout,
                    detail: format!(
                        "no answer within {} ms",
                        self.attempt_timeout.as_millis()
                    ),
                }
            }
            Ok(Err(err)) => {
                return AttemptOutcome::Failed {
                    stage: FailureStage::Invoke,
                    detail: err.to_string(),
                }
            }
            Ok(Ok(raw)) => raw,
        };

        let object = match extract_json_object(&raw) {
            Ok(object) => object,
            Err(err) => {
                return AttemptOutcome::Failed {
                    stage: FailureStage::Normalize,
                    detail: err.to_string(),
                }
            }
        };

        match interpret_provider_object(&object) {
            Ok(verdict) => AttemptOutcome::Resolved(verdict),
            Err(err) => AttemptOutcome::Failed {
                stage: FailureStage::Validate,
                detail: err.to_string(),
            },
        }
    }
}
