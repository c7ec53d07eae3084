use std::time::Duration;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use tracing::debug;

use crate::error::{AuthError, AuthResult};

const ATTEMPT_LABEL: &str = "attempt";
const CODE_LABEL: &str = "code";

/// Token request metrics, labelled by attempt number and HTTP status code
/// (`0` when no response was received).
#[derive(Clone, Debug)]
pub struct TokenMetrics {
    pub token_request_count: IntCounterVec,
    pub token_request_duration: HistogramVec,
}

impl TokenMetrics {
    /// Creates the collectors under `subsystem` and registers them in `registry`.
    pub fn register(subsystem: &str, registry: &Registry) -> AuthResult<Self> {
        let labels = &[ATTEMPT_LABEL, CODE_LABEL];
        let token_request_count = IntCounterVec::new(
            Opts::new("token_request_count", "Number of token requests sent.")
                .subsystem(subsystem),
            labels,
        )
        .map_err(|e| AuthError::Config(format!("can't create token request counter: {e}")))?;
        let token_request_duration = HistogramVec::new(
            HistogramOpts::new("token_request_duration", "Token request duration in seconds.")
                .subsystem(subsystem)
                .buckets(vec![0.1, 1.0, 10.0, 30.0]),
            labels,
        )
        .map_err(|e| AuthError::Config(format!("can't create token request histogram: {e}")))?;

        registry
            .register(Box::new(token_request_count.clone()))
            .map_err(|e| AuthError::Config(format!("can't register token request counter: {e}")))?;
        registry
            .register(Box::new(token_request_duration.clone()))
            .map_err(|e| {
                AuthError::Config(format!("can't register token request histogram: {e}"))
            })?;

        debug!(subsystem, "registered token request metrics");
        Ok(Self {
            token_request_count,
            token_request_duration,
        })
    }

    pub fn observe(&self, attempt: u32, code: u16, elapsed: Duration) {
        let attempt = attempt.to_string();
        let code = code.to_string();
        let labels = [attempt.as_str(), code.as_str()];
        self.token_request_count.with_label_values(&labels).inc();
        self.token_request_duration
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
    }

    /// Number of requests recorded for an attempt/code pair.
    pub fn count(&self, attempt: u32, code: u16) -> u64 {
        let attempt = attempt.to_string();
        let code = code.to_string();
        self.token_request_count
            .with_label_values(&[attempt.as_str(), code.as_str()])
            .get()
    }
}
