//! Unverified JWT claim decoding.
//!
//! Only the payload segment is decoded so that expiry and `typ` can be read. The
//! signature is NOT checked: trust in a token is established by the identity
//! provider and by the resource servers that accept it, never by this crate.
//! Don't use these claims for authorization decisions.

use anyhow::anyhow;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::error::{AuthError, AuthResult};

pub type Claims = Map<String, Value>;

/// Decodes the claim set of a compact JWT (`header.payload.signature`).
pub fn decode_claims_unverified(token: &str) -> AuthResult<Claims> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::InvalidToken(format!(
            "expected 3 segments but got {}",
            parts.len()
        )));
    }

    let payload = decode_segment(parts[1])
        .map_err(|e| AuthError::InvalidToken(format!("payload: {e}")))?;

    match serde_json::from_slice::<Value>(&payload) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(other) => Err(AuthError::InvalidToken(format!(
            "payload is not a JSON object: {other}"
        ))),
        Err(e) => Err(AuthError::InvalidToken(format!("invalid JWT payload: {e}"))),
    }
}

// Some issuers keep the padding, the JOSE spec says they shouldn't.
fn decode_segment(segment: &str) -> anyhow::Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| anyhow!("base64 decode error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(value: &Value) -> String {
        URL_SAFE_NO_PAD.encode(value.to_string())
    }

    #[test]
    fn decodes_claims_without_signature() {
        let token = format!(
            "{}.{}.",
            encode(&json!({"alg": "none"})),
            encode(&json!({"typ": "Bearer", "exp": 1782462021}))
        );
        let claims = decode_claims_unverified(&token).unwrap();
        assert_eq!(claims["typ"], "Bearer");
        assert_eq!(claims["exp"], 1782462021);
    }

    #[test]
    fn accepts_padded_payload() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"sub":"a"}"#);
        assert!(payload.ends_with('='));
        let token = format!("{}.{}.sig", encode(&json!({"alg": "none"})), payload);
        let claims = decode_claims_unverified(&token).unwrap();
        assert_eq!(claims["sub"], "a");
    }

    #[test]
    fn decodes_url_safe_alphabet() {
        // '?' and '>' push the encoding into the '-' and '_' characters
        let claims = json!({"note": "??>>??>>"});
        let token = format!("{}.{}.sig", encode(&json!({"alg": "none"})), encode(&claims));
        assert!(token.contains('-') || token.contains('_'));
        assert_eq!(decode_claims_unverified(&token).unwrap()["note"], "??>>??>>");
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(matches!(
            decode_claims_unverified("not-a-jwt"),
            Err(AuthError::InvalidToken(_))
        ));
        assert!(matches!(
            decode_claims_unverified("a.%%%.c"),
            Err(AuthError::InvalidToken(_))
        ));
        let array_payload = format!("x.{}.y", encode(&json!([1, 2])));
        assert!(matches!(
            decode_claims_unverified(&array_payload),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
