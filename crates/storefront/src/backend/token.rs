//! Bearer token issued by the backend at login.
//!
//! The token is a JWT signed by the backend. The storefront never verifies
//! the signature; it only reads the `exp` claim so route guards can send a
//! customer back to login before the backend starts rejecting calls.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An opaque bearer credential. `Debug` output is redacted.
#[derive(Debug, Clone)]
pub struct BearerToken(SecretString);

/// Claims read from the token payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenClaims {
    /// Expiry as seconds since the Unix epoch.
    pub exp: Option<i64>,
    /// Issued-at as seconds since the Unix epoch.
    pub iat: Option<i64>,
}

impl BearerToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Raw token for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Decode the JWT payload segment. Returns `None` for non-JWT tokens.
    #[must_use]
    pub fn claims(&self) -> Option<TokenClaims> {
        decode_claims(self.expose())
    }

    /// When the token stops being accepted, if it says.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims()
            .and_then(|claims| claims.exp)
            .and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// Whether the token has expired at `now`.
    ///
    /// Tokens without a readable `exp` are treated as live; the backend
    /// rejects them if they are not.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires| expires <= now)
    }
}

/// Decode the claims of a `header.payload.signature` token.
#[must_use]
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

// Sessions store the token, so it needs to round-trip through serde.
impl Serialize for BearerToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for BearerToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn jwt(payload: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload);
        format!("{header}.{body}.signature")
    }

    #[test]
    fn test_decode_claims() {
        let token = jwt(r#"{"id":"665f1c2e","iat":1700000000,"exp":1700604800}"#);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, Some(1_700_604_800));
        assert_eq!(claims.iat, Some(1_700_000_000));
    }

    #[test]
    fn test_decode_claims_rejects_garbage() {
        assert!(decode_claims("not-a-jwt").is_none());
        assert!(decode_claims("a.b").is_none());
        assert!(decode_claims("a.!!!.c").is_none());
        assert!(decode_claims("a.b.c.d").is_none());
    }

    #[test]
    fn test_is_expired() {
        let token = BearerToken::new(jwt(r#"{"exp":1700000000}"#));
        let before = DateTime::from_timestamp(1_699_999_999, 0).unwrap();
        let after = DateTime::from_timestamp(1_700_000_001, 0).unwrap();
        assert!(!token.is_expired(before));
        assert!(token.is_expired(after));
    }

    #[test]
    fn test_token_without_exp_is_live() {
        let token = BearerToken::new("opaque-token");
        assert!(!token.is_expired(Utc::now()));
    }

    #[test]
    fn test_debug_is_redacted() {
        let token = BearerToken::new("super-secret-token");
        assert!(!format!("{token:?}").contains("super-secret-token"));
    }

    #[test]
    fn test_serde_round_trip() {
        let token = BearerToken::new("abc.def.ghi");
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"abc.def.ghi\"");
        let back: BearerToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back.expose(), "abc.def.ghi");
    }
}
