use std::path::PathBuf;
use std::sync::Arc;

use prometheus::Registry;
use reqwest::Certificate;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::cache::token_store::{TokenPair, TokenStore};
use crate::error::{AuthError, AuthResult};
use crate::observability::metrics::TokenMetrics;
use crate::resilience::retry::RetrySettings;
use crate::sources::credentials::Credentials;
use crate::sources::endpoint::TokenEndpoint;
use crate::transport::{ReqwestTransport, Transport, TransportWrapperFn};
use crate::utils::constants::{
    DEFAULT_AGENT, DEFAULT_CLIENT_ID, DEFAULT_CLIENT_SECRET, DEFAULT_SCOPES, DEFAULT_TOKEN_URL,
};
use crate::wrapper::{Inner, TransportWrapper};

/// Collects the configuration of a [`TransportWrapper`].
///
/// At least one of: a token, a user name and password, or a client identifier and
/// secret is required.
///
/// ```no_run
/// # async fn example() -> Result<(), token_transport::error::AuthError> {
/// use token_transport::wrapper::TransportWrapper;
///
/// let wrapper = TransportWrapper::builder()
///     .client("my-client", "my-secret")
///     .scopes(["openid", "api.console"])
///     .build()?;
/// let tokens = wrapper.get_token(&Default::default(), None).await?;
/// assert!(!tokens.access.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct TransportWrapperBuilder {
    token_url: Option<String>,
    client_id: String,
    client_secret: String,
    user: String,
    password: String,
    tokens: Vec<String>,
    scopes: Vec<String>,
    agent: Option<String>,
    trusted_cas: Vec<Certificate>,
    trusted_ca_files: Vec<PathBuf>,
    insecure: bool,
    token_transport: Option<Arc<dyn Transport>>,
    transport_wrappers: Vec<TransportWrapperFn>,
    metrics_subsystem: Option<String>,
    metrics_registry: Option<Registry>,
    retry: Option<RetrySettings>,
}

impl TransportWrapperBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL of the OpenID token endpoint.
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Client identifier and secret. With no user name and password these are used
    /// for the client credentials grant. Some providers also want the identifier for
    /// the password grant; pass an empty secret in that case.
    pub fn client(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.client_id = id.into();
        self.client_secret = secret.into();
        self
    }

    /// User name and password for the resource owner password grant.
    pub fn user(mut self, name: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = name.into();
        self.password = password.into();
        self
    }

    /// Pre-issued tokens, sorted into access and refresh by their `typ` claim.
    ///
    /// Without credentials the wrapper stops working once both tokens expire.
    pub fn tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Requested scopes. Replaces the default `openid`, include it explicitly if needed.
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn trusted_ca(mut self, cert: Certificate) -> Self {
        self.trusted_cas.push(cert);
        self
    }

    /// PEM file whose certificates are added to the trusted roots.
    pub fn trusted_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.trusted_ca_files.push(path.into());
        self
    }

    /// Disables TLS verification towards the token endpoint. Not for production.
    pub fn insecure(mut self, flag: bool) -> Self {
        self.insecure = flag;
        self
    }

    /// Transport used to reach the token endpoint instead of the built-in reqwest one.
    /// TLS settings are ignored when this is set.
    pub fn token_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.token_transport = Some(transport);
        self
    }

    /// Decorates the token endpoint transport. Hooks apply in the order they are added.
    pub fn transport_wrapper<F>(mut self, wrapper: F) -> Self
    where
        F: Fn(Arc<dyn Transport>) -> Arc<dyn Transport> + Send + Sync + 'static,
    {
        self.transport_wrappers.push(Arc::new(wrapper));
        self
    }

    /// Enables the `<subsystem>_token_request_count` and
    /// `<subsystem>_token_request_duration` metrics.
    pub fn metrics_subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.metrics_subsystem = Some(subsystem.into());
        self
    }

    /// Registry for the metrics; the process default registry if unset.
    pub fn metrics_registry(mut self, registry: Registry) -> Self {
        self.metrics_registry = Some(registry);
        self
    }

    pub fn retry(mut self, settings: RetrySettings) -> Self {
        self.retry = Some(settings);
        self
    }

    pub fn build(self) -> AuthResult<TransportWrapper> {
        let have_tokens = !self.tokens.is_empty();
        let have_password = !self.user.is_empty() && !self.password.is_empty();
        let have_secret = !self.client_id.is_empty() && !self.client_secret.is_empty();
        if !have_tokens && !have_password && !have_secret {
            return Err(AuthError::Config(
                "either a token, an user name and password or a client identifier and secret \
                 are necessary, but none has been provided"
                    .to_string(),
            ));
        }

        let pair = TokenPair::classify(&self.tokens)?;

        let token_url = match self.token_url.filter(|url| !url.is_empty()) {
            Some(url) => url,
            None => {
                debug!("token URL wasn't provided, will use the default '{DEFAULT_TOKEN_URL}'");
                DEFAULT_TOKEN_URL.to_string()
            }
        };
        let url = Url::parse(&token_url)
            .map_err(|e| AuthError::Config(format!("can't parse token URL '{token_url}': {e}")))?;

        let client_id = if self.client_id.is_empty() {
            debug!("client identifier wasn't provided, will use the default '{DEFAULT_CLIENT_ID}'");
            DEFAULT_CLIENT_ID.to_string()
        } else {
            self.client_id
        };
        let client_secret = if self.client_secret.is_empty() {
            debug!("client secret wasn't provided, will use the default");
            DEFAULT_CLIENT_SECRET.to_string()
        } else {
            self.client_secret
        };
        let scopes = if self.scopes.is_empty() {
            DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
        } else {
            self.scopes
        };
        let agent = self.agent.unwrap_or_else(|| DEFAULT_AGENT.to_string());

        let mut transport: Arc<dyn Transport> = match self.token_transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_tls(
                &self.trusted_cas,
                &self.trusted_ca_files,
                self.insecure,
            )?),
        };
        for wrap in &self.transport_wrappers {
            transport = wrap(transport);
        }

        let metrics = match self.metrics_subsystem.filter(|s| !s.is_empty()) {
            Some(subsystem) => {
                let registry = self
                    .metrics_registry
                    .unwrap_or_else(|| prometheus::default_registry().clone());
                Some(TokenMetrics::register(&subsystem, &registry)?)
            }
            None => None,
        };

        let credentials = Credentials {
            client_id,
            client_secret,
            user: self.user,
            password: self.password,
            scopes,
        };

        Ok(TransportWrapper {
            inner: Arc::new(Inner {
                endpoint: TokenEndpoint::new(url, Some(agent), transport, metrics.clone()),
                token_url,
                credentials,
                store: TokenStore::new(pair),
                token_lock: Mutex::new(()),
                retry: self.retry.unwrap_or_default(),
                metrics,
            }),
        })
    }
}
