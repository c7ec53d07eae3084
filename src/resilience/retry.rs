use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::helpers::context::CallContext;

/// Exponential backoff bounded by a total elapsed time.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    pub initial_interval: Duration,
    /// Growth factor applied to the interval after every failed attempt.
    pub multiplier: f64,
    pub max_interval: Duration,
    /// No new attempt starts once this much time has passed since the first one.
    pub max_elapsed_time: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            multiplier: 1.5,
            max_interval: Duration::from_secs(60),
            max_elapsed_time: Duration::from_secs(15),
        }
    }
}

/// Whether a failed token request may succeed if sent again: the request never
/// got a response, or the server failed with a 5xx status.
pub fn is_transient(err: &AuthError) -> bool {
    match err {
        AuthError::Send(_) => true,
        AuthError::Endpoint { code, .. } => *code >= 500,
        AuthError::Attempt { source, .. } => is_transient(source),
        _ => false,
    }
}

impl RetrySettings {
    /// Runs `operation` until it succeeds, fails permanently, or the backoff budget
    /// or the caller deadline is spent. The operation receives the 1-based attempt
    /// number. The final error is wrapped with the attempt that produced it.
    pub async fn run_with_retry<F, Fut, T>(&self, ctx: &CallContext, mut operation: F) -> AuthResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AuthResult<T>>,
    {
        let start = Instant::now();
        let mut delay = self.initial_interval;
        let mut attempt: u32 = 1;

        loop {
            let err = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!("got tokens on attempt {attempt}");
                    } else {
                        debug!("got tokens on first attempt");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            let code = err.code();
            if !is_transient(&err) {
                error!("can't get tokens, got HTTP code {code}, will not retry: {err}");
                return Err(wrap(attempt, err));
            }
            if start.elapsed() + delay > self.max_elapsed_time {
                error!(
                    "can't get tokens, got HTTP code {code}, giving up after {attempt} attempts: {err}"
                );
                return Err(wrap(attempt, err));
            }
            if ctx.would_expire_after(delay) {
                error!(
                    "can't get tokens, got HTTP code {code}, deadline reached after {attempt} attempts: {err}"
                );
                return Err(wrap(attempt, err));
            }

            warn!("can't get tokens, got HTTP code {code}, will retry in {delay:?}: {err}");
            sleep(delay).await;
            delay = self.next_delay(delay);
            attempt += 1;
        }
    }

    /// Grows `delay` by the multiplier, capped at `max_interval`. A product that
    /// isn't a valid duration (infinite or NaN multiplier) is capped as well.
    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.multiplier)
            .map_or(self.max_interval, |next| next.min(self.max_interval))
    }
}

fn wrap(attempt: u32, source: AuthError) -> AuthError {
    AuthError::Attempt {
        attempt,
        source: Box::new(source),
    }
}
