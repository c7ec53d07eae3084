use thiserror::Error;

/// Errors produced while configuring the wrapper or obtaining tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid builder or file configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A token that can't be decoded, or a pre-supplied token with a bad `typ` claim.
    #[error("can't parse token: {0}")]
    InvalidToken(String),

    /// The request to the token endpoint didn't produce a response.
    #[error("can't send request: {0:#}")]
    Send(#[source] anyhow::Error),

    /// The caller deadline expired while a token request was in flight.
    #[error("deadline exceeded while requesting tokens")]
    DeadlineExceeded,

    /// The token endpoint answered, but not with a usable token pair.
    #[error("{message}")]
    Endpoint {
        code: u16,
        error: Option<String>,
        message: String,
    },

    /// No usable token and no credentials to request one.
    #[error(
        "access and refresh tokens are unavailable or expired, and there are no \
         password or client secret to request new ones"
    )]
    Unauthenticated,

    /// Final failure of `get_token`, tagged with the attempt that produced it.
    #[error("can't get tokens (attempt {attempt}): {source}")]
    Attempt {
        attempt: u32,
        #[source]
        source: Box<AuthError>,
    },
}

impl AuthError {
    pub(crate) fn endpoint(code: u16, message: impl Into<String>) -> Self {
        AuthError::Endpoint {
            code,
            error: None,
            message: message.into(),
        }
    }

    /// HTTP status code returned by the token endpoint, `0` when there was no response.
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Endpoint { code, .. } => *code,
            AuthError::Attempt { source, .. } => source.code(),
            _ => 0,
        }
    }

    /// True when the identity provider rejected the grant with `invalid_grant`.
    pub fn is_invalid_grant(&self) -> bool {
        matches!(
            self.root(),
            AuthError::Endpoint { error: Some(error), .. } if error == "invalid_grant"
        )
    }

    /// The underlying error, without the attempt wrapper.
    pub fn root(&self) -> &AuthError {
        match self {
            AuthError::Attempt { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;
