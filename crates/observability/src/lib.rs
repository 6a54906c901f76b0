use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Process-wide chat counters. Every update is also forwarded to the
/// `metrics` facade so an installed exporter sees the same numbers.
#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    moderated_total: AtomicU64,
    provider_calls_total: AtomicU64,
    provider_failures_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub moderated_total: u64,
    pub provider_calls_total: u64,
    pub provider_failures_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("wayfarer_chat_requests_total").increment(1);
    }

    pub fn inc_moderated(&self, verdict: &'static str) {
        self.moderated_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("wayfarer_chat_moderated_total", "verdict" => verdict).increment(1);
    }

    pub fn inc_provider_call(&self, provider: &'static str) {
        self.provider_calls_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("wayfarer_provider_calls_total", "provider" => provider).increment(1);
    }

    pub fn inc_provider_failure(&self, provider: &'static str, error_kind: &'static str) {
        self.provider_failures_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            "wayfarer_provider_failures_total",
            "provider" => provider,
            "error_kind" => error_kind
        )
        .increment(1);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        metrics::histogram!("wayfarer_chat_latency_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            moderated_total: self.moderated_total.load(Ordering::Relaxed),
            provider_calls_total: self.provider_calls_total.load(Ordering::Relaxed),
            provider_failures_total: self.provider_failures_total.load(Ordering::Relaxed),
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
                "{}=info,wayfarer_api=info,wayfarer_agents=info,wayfarer_providers=info",
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
