use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::error::{AuthError, AuthResult};
use crate::parser::jwt::{decode_claims_unverified, Claims};

/// Value of the `typ` claim that identity providers put in the tokens they issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Bearer,
    Refresh,
    Offline,
}

impl TokenType {
    /// Case-insensitive match of a `typ` claim.
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("bearer") {
            Some(TokenType::Bearer)
        } else if value.eq_ignore_ascii_case("refresh") {
            Some(TokenType::Refresh)
        } else if value.eq_ignore_ascii_case("offline") {
            Some(TokenType::Offline)
        } else {
            None
        }
    }

    /// Refresh and offline tokens are both exchanged with the refresh token grant.
    pub fn is_refresh(&self) -> bool {
        matches!(self, TokenType::Refresh | TokenType::Offline)
    }
}

/// A parsed token. Immutable: a new grant yields a new `Token`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    raw: String,
    claims: Claims,
    expires_at: Option<DateTime<Utc>>,
}

/// Expiry status of a token at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenExpiry {
    /// False when the token carries no `exp` claim.
    pub expires: bool,
    /// `exp - now`, negative once expired, zero when the token doesn't expire.
    pub remaining: Duration,
}

impl TokenExpiry {
    /// True when the token doesn't expire or has at least `window` left.
    pub fn is_fresh(&self, window: StdDuration) -> bool {
        !self.expires || self.remaining >= Duration::from_std(window).unwrap_or(Duration::MAX)
    }

    pub fn has_time_left(&self) -> bool {
        self.remaining > Duration::zero()
    }
}

impl Token {
    /// Decodes the claims of `raw` without verifying its signature.
    pub fn parse(raw: impl Into<String>) -> AuthResult<Self> {
        let raw = raw.into();
        let claims = decode_claims_unverified(&raw)?;
        let expires_at = expiration(&claims)?;
        Ok(Self {
            raw,
            claims,
            expires_at,
        })
    }

    /// The encoded form, sent verbatim as the bearer credential.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// The `typ` claim, if present and recognized.
    pub fn token_type(&self) -> Option<TokenType> {
        self.claims
            .get("typ")
            .and_then(Value::as_str)
            .and_then(TokenType::parse)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn expiry(&self, now: DateTime<Utc>) -> TokenExpiry {
        match self.expires_at {
            Some(exp) => TokenExpiry {
                expires: true,
                remaining: exp - now,
            },
            None => TokenExpiry::default(),
        }
    }
}

/// Expiry status of an optional token; absent tokens neither expire nor have time left.
pub fn expiry_of(token: Option<&Arc<Token>>, now: DateTime<Utc>) -> TokenExpiry {
    token.map(|token| token.expiry(now)).unwrap_or_default()
}

// `exp` of zero is treated like a missing claim.
fn expiration(claims: &Claims) -> AuthResult<Option<DateTime<Utc>>> {
    let Some(claim) = claims.get("exp") else {
        return Ok(None);
    };
    let exp = claim.as_f64().ok_or_else(|| {
        AuthError::InvalidToken(format!("expected numeric 'exp' claim but got '{claim}'"))
    })?;
    if exp == 0.0 {
        return Ok(None);
    }
    DateTime::from_timestamp(exp as i64, 0)
        .map(Some)
        .ok_or_else(|| AuthError::InvalidToken(format!("'exp' claim {exp} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use serde_json::json;

    fn sample_jwt(claims: Value) -> String {
        format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        )
    }

    #[test]
    fn expiring_token_reports_remaining_lifetime() {
        let now = Utc::now();
        let exp = now.timestamp() + 300;
        let token = Token::parse(sample_jwt(json!({"typ": "Bearer", "exp": exp}))).unwrap();

        let expiry = token.expiry(now);
        assert!(expiry.expires);
        assert_eq!(
            expiry.remaining,
            DateTime::from_timestamp(exp, 0).unwrap() - now
        );
        assert!(expiry.is_fresh(StdDuration::from_secs(60)));
        assert!(!expiry.is_fresh(StdDuration::from_secs(600)));
    }

    #[test]
    fn token_without_exp_never_expires() {
        let token = Token::parse(sample_jwt(json!({"typ": "Offline"}))).unwrap();
        let expiry = token.expiry(Utc::now());
        assert!(!expiry.expires);
        assert_eq!(expiry.remaining, Duration::zero());
        assert!(expiry.is_fresh(StdDuration::from_secs(86400)));
        assert!(!expiry.has_time_left());
    }

    #[test]
    fn zero_exp_counts_as_missing() {
        let token = Token::parse(sample_jwt(json!({"exp": 0}))).unwrap();
        assert_eq!(token.expires_at(), None);
    }

    #[test]
    fn expired_token_has_negative_remaining() {
        let now = Utc::now();
        let token =
            Token::parse(sample_jwt(json!({"exp": now.timestamp() - 30}))).unwrap();
        let expiry = token.expiry(now);
        assert!(expiry.expires);
        assert!(expiry.remaining < Duration::zero());
        assert!(!expiry.has_time_left());
    }

    #[test]
    fn float_exp_is_accepted() {
        let token = Token::parse(sample_jwt(json!({"exp": 1782462021.0}))).unwrap();
        assert_eq!(token.expires_at().unwrap().timestamp(), 1782462021);
    }

    #[test]
    fn non_numeric_exp_is_rejected() {
        let result = Token::parse(sample_jwt(json!({"exp": "tomorrow"})));
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn token_type_is_case_insensitive() {
        assert_eq!(TokenType::parse("bearer"), Some(TokenType::Bearer));
        assert_eq!(TokenType::parse("REFRESH"), Some(TokenType::Refresh));
        assert_eq!(TokenType::parse("Offline"), Some(TokenType::Offline));
        assert_eq!(TokenType::parse("ID"), None);
        assert!(TokenType::Offline.is_refresh());
        assert!(!TokenType::Bearer.is_refresh());

        let token = Token::parse(sample_jwt(json!({"typ": "Refresh"}))).unwrap();
        assert_eq!(token.token_type(), Some(TokenType::Refresh));
        assert_eq!(token.claims()["typ"], "Refresh");
    }
}
