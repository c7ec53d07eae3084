//! Where tokens come from: the configured credentials, the grants built from
//! them and the identity provider endpoint that answers those grants.

pub mod credentials;
pub mod endpoint;
pub mod grant;

pub use credentials::Credentials;
pub use endpoint::{parse_token_response, TokenEndpoint, TokenResponse};
pub use grant::Grant;
