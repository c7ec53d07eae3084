//! Client for the OpenID token endpoint.

use std::sync::Arc;
use std::time::Instant;

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, Request};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::cache::token::Token;
use crate::cache::token_store::TokenPair;
use crate::error::{AuthError, AuthResult};
use crate::helpers::context::CallContext;
use crate::observability::metrics::TokenMetrics;
use crate::sources::grant::Grant;
use crate::transport::Transport;

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const BODY_SUMMARY_LEN: usize = 200;

/// Body of a token endpoint response, successful or not.
#[derive(Debug, Default, Deserialize)]
pub struct TokenResponse {
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub token_type: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

pub struct TokenEndpoint {
    url: Url,
    agent: Option<String>,
    transport: Arc<dyn Transport>,
    metrics: Option<TokenMetrics>,
}

impl TokenEndpoint {
    pub fn new(
        url: Url,
        agent: Option<String>,
        transport: Arc<dyn Transport>,
        metrics: Option<TokenMetrics>,
    ) -> Self {
        Self {
            url,
            agent,
            transport,
            metrics,
        }
    }

    /// Sends `grant` and returns the decoded pair. Every call is recorded in the
    /// metrics, if configured, under `attempt` and the response status code.
    pub async fn request(
        &self,
        grant: &Grant,
        scopes: &[String],
        ctx: &CallContext,
        attempt: u32,
    ) -> AuthResult<TokenPair> {
        debug!(
            grant_type = grant.grant_type(),
            attempt, "requesting new token"
        );
        let start = Instant::now();
        let (code, result) = self.request_timed(grant, scopes, ctx).await;
        if let Some(metrics) = &self.metrics {
            metrics.observe(attempt, code, start.elapsed());
        }
        result
    }

    async fn request_timed(
        &self,
        grant: &Grant,
        scopes: &[String],
        ctx: &CallContext,
    ) -> (u16, AuthResult<TokenPair>) {
        let request = match self.build_request(grant, scopes) {
            Ok(request) => request,
            Err(e) => return (0, Err(e)),
        };

        let exchange = async {
            let response = self.transport.send(request).await.map_err(AuthError::Send)?;
            let code = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let body = response.bytes().await.map_err(|e| {
                AuthError::endpoint(code, format!("can't read response: {e}"))
            });
            Ok::<_, AuthError>((code, content_type, body))
        };

        match ctx.run(exchange).await.and_then(|sent| sent) {
            Ok((code, content_type, Ok(body))) => {
                (code, parse_token_response(code, content_type.as_deref(), &body))
            }
            Ok((code, _, Err(e))) => (code, Err(e)),
            Err(e) => (e.code(), Err(e)),
        }
    }

    fn build_request(&self, grant: &Grant, scopes: &[String]) -> AuthResult<Request> {
        let mut request = Request::new(Method::POST, self.url.clone());
        let headers = request.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        if let Some(agent) = self.agent.as_deref().filter(|agent| !agent.is_empty()) {
            let value = HeaderValue::from_str(agent)
                .map_err(|e| AuthError::Config(format!("invalid user agent '{agent}': {e}")))?;
            headers.insert(USER_AGENT, value);
        }
        *request.body_mut() = Some(grant.encode(scopes).into());
        Ok(request)
    }
}

/// Turns a raw token endpoint response into a decoded token pair.
pub fn parse_token_response(
    code: u16,
    content_type: Option<&str>,
    body: &[u8],
) -> AuthResult<TokenPair> {
    check_content_type(code, content_type, body)?;

    let response: TokenResponse = serde_json::from_slice(body)
        .map_err(|e| AuthError::endpoint(code, format!("can't parse JSON response: {e}")))?;

    if let Some(error) = response.error {
        let message = match &response.error_description {
            Some(description) => format!("{error}: {description}"),
            None => error.clone(),
        };
        return Err(AuthError::Endpoint {
            code,
            error: Some(error),
            message,
        });
    }
    if code != 200 {
        return Err(AuthError::endpoint(
            code,
            format!("token response status code is '{code}'"),
        ));
    }
    if let Some(token_type) = response.token_type.as_deref() {
        if token_type != "bearer" {
            return Err(AuthError::endpoint(
                code,
                format!("expected 'bearer' token type but got '{token_type}'"),
            ));
        }
    }

    let access = response
        .access_token
        .ok_or_else(|| AuthError::endpoint(code, "no access token was received"))?;
    let access = Token::parse(access)?;
    let refresh = response
        .refresh_token
        .ok_or_else(|| AuthError::endpoint(code, "no refresh token was received"))?;
    let refresh = Token::parse(refresh)?;

    Ok(TokenPair::new(access, refresh))
}

fn check_content_type(code: u16, content_type: Option<&str>, body: &[u8]) -> AuthResult<()> {
    let media_type = content_type
        .and_then(|value| value.split(';').next())
        .map(str::trim)
        .unwrap_or_default();
    if media_type.eq_ignore_ascii_case(JSON_CONTENT_TYPE) {
        return Ok(());
    }
    Err(AuthError::endpoint(
        code,
        format!(
            "expected response content type '{JSON_CONTENT_TYPE}' but received '{}' and \
             content '{}'",
            content_type.unwrap_or_default(),
            summarize(body)
        ),
    ))
}

fn summarize(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() > BODY_SUMMARY_LEN {
        let cut: String = text.chars().take(BODY_SUMMARY_LEN).collect();
        format!("{cut}...")
    } else {
        text
    }
}
