//! Transport layer abstraction.
//!
//! The identity provider is reached through a [`Transport`], and the
//! authenticating adapter is itself a [`Transport`] that wraps another one, so the
//! two compose freely and tests can substitute in-process stubs.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Request, Response};

pub mod auth;
pub mod reqwest_transport;

pub use auth::AuthTransport;
pub use reqwest_transport::ReqwestTransport;

/// Something that sends an HTTP request and returns the response.
///
/// Implementations must honour `request.timeout()` or be cancelled by the
/// caller dropping the returned future.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: Request) -> Result<Response> {
        (**self).send(request).await
    }
}

/// Hook that decorates the transport used to reach the identity provider.
pub type TransportWrapperFn = Arc<dyn Fn(Arc<dyn Transport>) -> Arc<dyn Transport> + Send + Sync>;
