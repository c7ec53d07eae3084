//! Per-call context carrying the caller's deadline.
//!
//! Cancellation without a deadline is expressed the usual async way: dropping the
//! future returned by `get_token` (or by a transport `send`) aborts the work at its
//! next suspension point, releasing the token lock.

use std::future::Future;
use std::time::Duration;

use reqwest::Request;
use tokio::time::Instant;

use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallContext {
    deadline: Option<Instant>,
}

impl CallContext {
    /// Context without a deadline.
    pub fn background() -> Self {
        Self { deadline: None }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Derives the context from the timeout attached to an outgoing request.
    pub fn from_request(request: &Request) -> Self {
        request
            .timeout()
            .map(|timeout| Self::with_timeout(*timeout))
            .unwrap_or_default()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True if sleeping for `delay` would end after the deadline.
    pub fn would_expire_after(&self, delay: Duration) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() + delay > deadline)
    }

    /// Runs `future` bounded by the deadline.
    pub async fn run<F, T>(&self, future: F) -> AuthResult<T>
    where
        F: Future<Output = T>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, future)
                .await
                .map_err(|_| AuthError::DeadlineExceeded),
            None => Ok(future.await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn background_context_never_expires() {
        let ctx = CallContext::background();
        assert_eq!(ctx.deadline(), None);
        assert!(!ctx.would_expire_after(Duration::from_secs(3600)));
        assert_eq!(ctx.run(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn deadline_interrupts_slow_future() {
        let ctx = CallContext::with_timeout(Duration::from_millis(20));
        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert!(matches!(result, Err(AuthError::DeadlineExceeded)));
        assert!(ctx.would_expire_after(Duration::from_millis(1)));
    }

    #[test]
    fn context_follows_request_timeout() {
        let mut request = Request::new(
            reqwest::Method::GET,
            "http://localhost/api".parse().unwrap(),
        );
        assert_eq!(CallContext::from_request(&request).deadline(), None);

        *request.timeout_mut() = Some(Duration::from_secs(10));
        let ctx = CallContext::from_request(&request);
        assert!(ctx.deadline().is_some());
        assert!(ctx.would_expire_after(Duration::from_secs(11)));
    }
}
