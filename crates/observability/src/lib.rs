use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Process-wide counters. Each increment is mirrored to the `metrics` facade
/// so an installed exporter sees the same numbers `/health` reports.
#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    provider_attempts_total: AtomicU64,
    provider_failures_total: AtomicU64,
    rule_fallbacks_total: AtomicU64,
    transcriptions_total: AtomicU64,
    transcription_failures_total: AtomicU64,
    syntheses_total: AtomicU64,
    synthesis_failures_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub provider_attempts_total: u64,
    pub provider_failures_total: u64,
    pub rule_fallbacks_total: u64,
    pub transcriptions_total: u64,
    pub transcription_failures_total: u64,
    pub syntheses_total: u64,
    pub synthesis_failures_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("genie_requests_total").increment(1);
    }

    pub fn inc_provider_attempt(&self, provider: &'static str) {
        self.provider_attempts_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("genie_provider_attempts_total", "provider" => provider).increment(1);
    }

    pub fn inc_provider_failure(&self, provider: &'static str, stage: &'static str) {
        self.provider_failures_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            "genie_provider_failures_total",
            "provider" => provider,
            "stage" => stage
        )
        .increment(1);
    }

    pub fn inc_rule_fallback(&self) {
        self.rule_fallbacks_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("genie_rule_fallbacks_total").increment(1);
    }

    pub fn record_transcription(&self, success: bool) {
        if success {
            self.transcriptions_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.transcription_failures_total
                .fetch_add(1, Ordering::Relaxed);
        }
        metrics::counter!("genie_transcriptions_total", "success" => success.to_string())
            .increment(1);
    }

    pub fn record_synthesis(&self, success: bool) {
        if success {
            self.syntheses_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.synthesis_failures_total.fetch_add(1, Ordering::Relaxed);
        }
        metrics::counter!("genie_syntheses_total", "success" => success.to_string()).increment(1);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            provider_attempts_total: self.provider_attempts_total.load(Ordering::Relaxed),
            provider_failures_total: self.provider_failures_total.load(Ordering::Relaxed),
            rule_fallbacks_total: self.rule_fallbacks_total.load(Ordering::Relaxed),
            transcriptions_total: self.transcriptions_total.load(Ordering::Relaxed),
            transcription_failures_total: self
                .transcription_failures_total
                .load(Ordering::Relaxed),
            syntheses_total: self.syntheses_total.load(Ordering::Relaxed),
            synthesis_failures_total: self.synthesis_failures_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,genie_api=info,genie_agents=info,genie_providers=info,genie_speech=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
