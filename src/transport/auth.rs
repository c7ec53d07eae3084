use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response};

use crate::helpers::context::CallContext;
use crate::transport::Transport;
use crate::wrapper::TransportWrapper;

/// Transport that obtains a token from its [`TransportWrapper`] and adds it as
/// `Authorization: Bearer <token>` before delegating. If no token can be obtained
/// the request is not sent.
pub struct AuthTransport {
    owner: TransportWrapper,
    transport: Arc<dyn Transport>,
}

impl AuthTransport {
    pub fn new(owner: TransportWrapper, transport: Arc<dyn Transport>) -> Self {
        Self { owner, transport }
    }
}

#[async_trait]
impl Transport for AuthTransport {
    async fn send(&self, mut request: Request) -> Result<Response> {
        let ctx = CallContext::from_request(&request);
        let tokens = self
            .owner
            .get_token(&ctx, None)
            .await
            .context("can't get access token")?;

        if !tokens.access.is_empty() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", tokens.access))
                .context("access token isn't a valid header value")?;
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        self.transport.send(request).await
    }
}
