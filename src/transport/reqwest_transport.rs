use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Certificate, Client, Request, Response};
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};
use crate::transport::Transport;

/// [`Transport`] backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client trusting the system roots plus the given certificates and
    /// PEM files. `insecure` turns off certificate and host name verification.
    pub fn with_tls(
        trusted_cas: &[Certificate],
        trusted_ca_files: &[PathBuf],
        insecure: bool,
    ) -> AuthResult<Self> {
        let mut builder = Client::builder();
        for cert in trusted_cas {
            builder = builder.add_root_certificate(cert.clone());
        }
        for path in trusted_ca_files {
            for cert in load_pem_file(path)? {
                builder = builder.add_root_certificate(cert);
            }
            debug!(path = %path.display(), "added trusted CA file");
        }
        if insecure {
            warn!("TLS verification for the token endpoint is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|e| AuthError::Config(format!("can't create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn load_pem_file(path: &PathBuf) -> AuthResult<Vec<Certificate>> {
    let pem = std::fs::read(path).map_err(|e| {
        AuthError::Config(format!("can't read CA file '{}': {e}", path.display()))
    })?;
    let certs = Certificate::from_pem_bundle(&pem).map_err(|e| {
        AuthError::Config(format!("can't parse CA file '{}': {e}", path.display()))
    })?;
    if certs.is_empty() {
        return Err(AuthError::Config(format!(
            "CA file '{}' doesn't contain any certificate",
            path.display()
        )));
    }
    Ok(certs)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        Ok(self.client.execute(request).await?)
    }
}
