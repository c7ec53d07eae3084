use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::token::{Token, TokenType};
use crate::error::{AuthError, AuthResult};

/// Current access/refresh pair. Replaced as a whole, never field by field.
#[derive(Debug, Clone, Default)]
pub struct TokenPair {
    pub access: Option<Arc<Token>>,
    pub refresh: Option<Arc<Token>>,
}

/// Encoded tokens handed out to callers; empty strings stand for absent tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: Token, refresh: Token) -> Self {
        Self {
            access: Some(Arc::new(access)),
            refresh: Some(Arc::new(refresh)),
        }
    }

    /// Sorts pre-supplied encoded tokens into access and refresh slots by their
    /// `typ` claim. The last token of each kind wins.
    pub fn classify<S: AsRef<str>>(tokens: &[S]) -> AuthResult<Self> {
        let mut pair = TokenPair::default();
        for (i, text) in tokens.iter().enumerate() {
            let token = Token::parse(text.as_ref()).map_err(|e| {
                AuthError::Config(format!("can't parse token {i}: {e}"))
            })?;
            let typ = match token.claims().get("typ") {
                None => {
                    return Err(AuthError::Config(format!(
                        "token {i} doesn't contain the 'typ' claim"
                    )))
                }
                Some(claim) => claim.as_str().ok_or_else(|| {
                    AuthError::Config(format!("claim 'typ' of token {i} isn't a string"))
                })?,
            };
            match TokenType::parse(typ) {
                Some(TokenType::Bearer) => pair.access = Some(Arc::new(token)),
                Some(kind) if kind.is_refresh() => pair.refresh = Some(Arc::new(token)),
                _ => {
                    return Err(AuthError::Config(format!(
                        "type '{typ}' of token {i} is unknown"
                    )))
                }
            }
        }
        Ok(pair)
    }

    pub fn tokens(&self) -> Tokens {
        Tokens {
            access: raw_or_empty(self.access.as_deref()),
            refresh: raw_or_empty(self.refresh.as_deref()),
        }
    }
}

fn raw_or_empty(token: Option<&Token>) -> String {
    token.map(|t| t.raw().to_owned()).unwrap_or_default()
}

/// Holder of the current pair. Readers always see one generation of the pair.
#[derive(Debug, Default)]
pub struct TokenStore {
    inner: RwLock<TokenPair>,
}

impl TokenStore {
    pub fn new(pair: TokenPair) -> Self {
        Self {
            inner: RwLock::new(pair),
        }
    }

    pub async fn snapshot(&self) -> TokenPair {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, pair: TokenPair) {
        *self.inner.write().await = pair;
    }
}
