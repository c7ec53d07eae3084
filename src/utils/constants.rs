//! Shared constants and defaults

use std::time::Duration;

pub const DEFAULT_TOKEN_URL: &str =
    "https://sso.redhat.com/auth/realms/redhat-external/protocol/openid-connect/token";
pub const DEFAULT_CLIENT_ID: &str = "cloud-services";
pub const DEFAULT_CLIENT_SECRET: &str = "";
pub const DEFAULT_SCOPES: &[&str] = &["openid"];
pub const DEFAULT_AGENT: &str = concat!("token-transport/", env!("CARGO_PKG_VERSION"));

/// Minimum remaining lifetime of a cached access token.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(60);

pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_TOKEN_PATH: &str = "/token";
