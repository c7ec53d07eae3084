//! # Token Transport Library
//!
//! Keeps an OpenID access/refresh token pair valid and injects the access token
//! into outbound HTTP requests.
//!
//! Modules:
//! - `wrapper` — token lifecycle manager and its builder
//! - `transport` — transport capability, reqwest transport, authenticating adapter
//! - `sources` — credentials, grants and the token endpoint client
//! - `cache` — decoded tokens and the atomically swapped token pair
//! - `parser` — unverified JWT claim decoding
//! - `resilience` — exponential backoff for token requests
//! - `observability` — prometheus metrics and their HTTP route
//! - `config`, `server`, `utils` — file configuration and the `token-transport` binary

pub mod cache;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod parser;
pub mod resilience;
pub mod server;
pub mod sources;
pub mod transport;
pub mod utils;
pub mod wrapper;

#[cfg(test)]
mod tests;

pub use crate::cache::token_store::Tokens;
pub use crate::error::{AuthError, AuthResult};
pub use crate::helpers::context::CallContext;
pub use crate::transport::{AuthTransport, ReqwestTransport, Transport};
pub use crate::wrapper::{TransportWrapper, TransportWrapperBuilder};
