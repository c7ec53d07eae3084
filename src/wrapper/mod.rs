//! Token lifecycle management.
//!
//! [`TransportWrapper`] owns the current access/refresh pair and decides, on every
//! [`TransportWrapper::get_token`] call, whether the cached access token can be
//! returned or a grant has to be sent to the identity provider. Decisions are
//! serialized by a per-wrapper lock held across the token endpoint round trip, so
//! concurrent callers wait for an in-flight refresh and then reuse its result.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn, Level};

use crate::cache::token::{expiry_of, Token, TokenExpiry};
use crate::cache::token_store::{TokenPair, TokenStore, Tokens};
use crate::error::{AuthError, AuthResult};
use crate::helpers::context::CallContext;
use crate::helpers::time::{format_duration, now};
use crate::observability::metrics::TokenMetrics;
use crate::resilience::retry::RetrySettings;
use crate::sources::credentials::Credentials;
use crate::sources::endpoint::TokenEndpoint;
use crate::sources::grant::Grant;
use crate::transport::{AuthTransport, Transport};
use crate::utils::constants::DEFAULT_FRESHNESS_WINDOW;

pub mod builder;

pub use builder::TransportWrapperBuilder;

/// Supplies valid bearer tokens and wraps transports so that they send them.
///
/// Cloning is cheap; clones share the token pair and the lock.
#[derive(Clone)]
pub struct TransportWrapper {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) token_url: String,
    pub(crate) credentials: Credentials,
    pub(crate) endpoint: TokenEndpoint,
    pub(crate) store: TokenStore,
    pub(crate) token_lock: Mutex<()>,
    pub(crate) retry: RetrySettings,
    pub(crate) metrics: Option<TokenMetrics>,
}

impl TransportWrapper {
    pub fn builder() -> TransportWrapperBuilder {
        TransportWrapperBuilder::new()
    }

    pub fn token_url(&self) -> &str {
        &self.inner.token_url
    }

    /// Client identifier and secret used to request tokens.
    pub fn client(&self) -> (&str, &str) {
        let creds = &self.inner.credentials;
        (&creds.client_id, &creds.client_secret)
    }

    /// User name and password used to request tokens.
    pub fn user(&self) -> (&str, &str) {
        let creds = &self.inner.credentials;
        (&creds.user, &creds.password)
    }

    pub fn scopes(&self) -> &[String] {
        &self.inner.credentials.scopes
    }

    /// Token request metrics, when a metrics subsystem was configured.
    pub fn metrics(&self) -> Option<&TokenMetrics> {
        self.inner.metrics.as_ref()
    }

    /// Wraps `transport` so that every request carries `Authorization: Bearer ...`.
    pub fn wrap(&self, transport: Arc<dyn Transport>) -> AuthTransport {
        AuthTransport::new(self.clone(), transport)
    }

    /// Tokens currently stored, without checking expiry or contacting the server.
    pub async fn current_tokens(&self) -> Tokens {
        self.inner.store.snapshot().await.tokens()
    }

    /// Returns an access token with at least `freshness` (default one minute) of
    /// remaining lifetime, and the refresh token that goes with it, requesting new
    /// tokens when needed. Transient failures of the token endpoint are retried with
    /// exponential backoff within the retry budget and the deadline of `ctx`.
    pub async fn get_token(
        &self,
        ctx: &CallContext,
        freshness: Option<Duration>,
    ) -> AuthResult<Tokens> {
        let freshness = freshness.unwrap_or(DEFAULT_FRESHNESS_WINDOW);
        self.inner
            .retry
            .run_with_retry(ctx, |attempt| self.tokens_once(ctx, attempt, freshness))
            .await
    }

    async fn tokens_once(
        &self,
        ctx: &CallContext,
        attempt: u32,
        freshness: Duration,
    ) -> AuthResult<Tokens> {
        // Only one decision, and so one token request, at a time. Waiting for
        // the lock counts against the caller deadline.
        let _guard = ctx.run(self.inner.token_lock.lock()).await?;

        let now = now();
        let pair = self.inner.store.snapshot().await;
        let access_expiry = expiry_of(pair.access.as_ref(), now);
        let refresh_expiry = expiry_of(pair.refresh.as_ref(), now);
        if tracing::enabled!(Level::DEBUG) {
            debug_expiry("Bearer", pair.access.as_deref(), access_expiry);
            debug_expiry("Refresh", pair.refresh.as_deref(), refresh_expiry);
        }

        if pair.access.is_some() && access_expiry.is_fresh(freshness) {
            return Ok(pair.tokens());
        }

        debug!("trying to get new tokens (attempt {attempt})");

        if let Some(refresh) = pair.refresh.as_deref() {
            if refresh_expiry.is_fresh(freshness) {
                return self.send_refresh_grant(ctx, attempt, refresh).await;
            }
        }

        if let Some(grant) = Grant::from_credentials(&self.inner.credentials) {
            return self.send_grant(ctx, attempt, &grant).await;
        }

        if let Some(refresh) = pair.refresh.as_deref() {
            if refresh_expiry.has_time_left() {
                warn!(
                    "refresh token expires in only {}, but there is no other mechanism to \
                     obtain a new token, so will try to use it anyhow",
                    format_duration(refresh_expiry.remaining)
                );
                return self.send_refresh_grant(ctx, attempt, refresh).await;
            }
        }

        if pair.access.is_some() && access_expiry.has_time_left() {
            warn!(
                "access token expires in only {}, but there is no other mechanism to \
                 obtain a new token, so will try to use it anyhow",
                format_duration(access_expiry.remaining)
            );
            return Ok(pair.tokens());
        }

        Err(AuthError::Unauthenticated)
    }

    async fn send_refresh_grant(
        &self,
        ctx: &CallContext,
        attempt: u32,
        refresh: &Token,
    ) -> AuthResult<Tokens> {
        let grant = Grant::refresh(&self.inner.credentials, refresh.raw());
        match self.send_grant(ctx, attempt, &grant).await {
            // The session behind a refresh token can disappear before the token
            // expires, for example when the SSO server drops its caches.
            Err(err) if err.is_invalid_grant() => {
                match Grant::from_credentials(&self.inner.credentials) {
                    Some(fallback) => {
                        info!(
                            "server rejected a refresh token that isn't expired ({err}), \
                             requesting new tokens with the {} grant",
                            fallback.grant_type()
                        );
                        self.send_grant(ctx, attempt, &fallback).await
                    }
                    None => Err(err),
                }
            }
            other => other,
        }
    }

    async fn send_grant(
        &self,
        ctx: &CallContext,
        attempt: u32,
        grant: &Grant,
    ) -> AuthResult<Tokens> {
        let pair: TokenPair = self
            .inner
            .endpoint
            .request(grant, &self.inner.credentials.scopes, ctx, attempt)
            .await?;
        let tokens = pair.tokens();
        self.inner.store.replace(pair).await;
        Ok(tokens)
    }
}

fn debug_expiry(typ: &str, token: Option<&Token>, expiry: TokenExpiry) {
    match token {
        None => debug!("{typ} token isn't available"),
        Some(_) if !expiry.expires => debug!("{typ} token doesn't expire"),
        Some(_) => {
            let left = expiry.remaining;
            if left < chrono::Duration::zero() {
                debug!("{typ} token expired {} ago", format_duration(-left));
            } else if left > chrono::Duration::zero() {
                debug!("{typ} token expires in {}", format_duration(left));
            } else {
                debug!("{typ} token expired just now");
            }
        }
    }
}
