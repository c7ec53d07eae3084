use std::path::PathBuf;

use serde::Deserialize;

use crate::config::settings::SettingsConfig;
use crate::wrapper::TransportWrapperBuilder;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub auth: AuthConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// ================================
/// Identity provider and credentials
/// ================================
#[derive(Deserialize, Clone, Default)]
pub struct AuthConfig {
    pub token_url: Option<String>,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// pre-issued access, refresh or offline tokens
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub agent: Option<String>,
    /// PEM files with additional trusted certificate authorities
    #[serde(default)]
    pub trusted_cas: Vec<PathBuf>,
    #[serde(default)]
    pub insecure: bool,
}

impl AuthConfig {
    pub fn have_credentials(&self) -> bool {
        !self.tokens.is_empty()
            || (!self.user.is_empty() && !self.password.is_empty())
            || (!self.client_id.is_empty() && !self.client_secret.is_empty())
    }

    /// Builder pre-loaded with this configuration.
    pub fn to_builder(&self) -> TransportWrapperBuilder {
        let mut builder = TransportWrapperBuilder::new()
            .client(self.client_id.clone(), self.client_secret.clone())
            .user(self.user.clone(), self.password.clone())
            .tokens(self.tokens.iter().cloned())
            .insecure(self.insecure);
        if let Some(url) = &self.token_url {
            builder = builder.token_url(url.clone());
        }
        if !self.scopes.is_empty() {
            builder = builder.scopes(self.scopes.iter().cloned());
        }
        if let Some(agent) = &self.agent {
            builder = builder.agent(agent.clone());
        }
        for path in &self.trusted_cas {
            builder = builder.trusted_ca_file(path.clone());
        }
        builder
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("user", &self.user)
            .field("tokens", &self.tokens.len())
            .field("scopes", &self.scopes)
            .field("agent", &self.agent)
            .field("trusted_cas", &self.trusted_cas)
            .field("insecure", &self.insecure)
            .finish_non_exhaustive()
    }
}
