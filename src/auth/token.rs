//! Session token codec — compact signed tokens with a fixed expiry.
//!
//! Tokens are stateless: verification recomputes the HMAC signature and
//! checks the expiry, no lookup involved. The signing secret is process-wide
//! configuration, loaded once at startup.

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::Account;

/// Session token verification failures. Callers treat both identically
/// (reject); the split exists for logging.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Signature mismatch or undecodable token
    #[error("invalid session token")]
    Invalid,
    /// Signature fine, expiry in the past
    #[error("expired session token")]
    Expired,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    user: Account,
    iat: u64,
    exp: u64,
}

/// Issues and verifies signed session tokens.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_secs: u64,
}

impl TokenCodec {
    /// Create a codec over a process-wide signing secret.
    #[must_use]
    pub fn new(secret: &str, expiry_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_secs,
        }
    }

    /// Issue a token embedding a credential-free account snapshot, expiring
    /// `expiry_secs` from now.
    pub fn issue(&self, account: &Account) -> Result<String, TokenError> {
        self.issue_at(account, now_secs())
    }

    fn issue_at(&self, account: &Account, now: u64) -> Result<String, TokenError> {
        let claims = SessionClaims {
            user: account.sanitized(),
            iat: now,
            exp: now + self.expiry_secs,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| TokenError::Invalid)
    }

    /// Verify a token and return the embedded account snapshot.
    pub fn verify(&self, token: &str) -> Result<Account, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims.user),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                _ => Err(TokenError::Invalid),
            },
        }
    }
}

fn now_secs() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LoginMethod;

    fn account() -> Account {
        Account {
            id: "acc-1".into(),
            subject: Some("sub-1".into()),
            username: None,
            email: Some("a@b.c".into()),
            display_name: Some("A".into()),
            avatar_url: None,
            credential_hash: Some("should-never-survive".into()),
            login_method: LoginMethod::Provider,
        }
    }

    #[test]
    fn round_trip_before_expiry() {
        let codec = TokenCodec::new("secret", 36000);
        let token = codec.issue(&account()).unwrap();
        let snapshot = codec.verify(&token).unwrap();

        assert_eq!(snapshot.id, "acc-1");
        assert_eq!(snapshot.subject.as_deref(), Some("sub-1"));
        assert_eq!(snapshot.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn issued_token_never_embeds_the_credential() {
        let codec = TokenCodec::new("secret", 36000);
        let token = codec.issue(&account()).unwrap();

        // Decode the payload segment directly; the hash must not be present.
        use base64::Engine as _;
        let payload = token.split('.').nth(1).unwrap();
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload)
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("should-never-survive"));

        assert!(codec.verify(&token).unwrap().credential_hash.is_none());
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let codec = TokenCodec::new("secret", 100);
        let token = codec.issue_at(&account(), now_secs() - 500).unwrap();
        assert_eq!(codec.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn wrong_secret_is_rejected_as_invalid() {
        let codec = TokenCodec::new("secret", 36000);
        let other = TokenCodec::new("different", 36000);
        let token = codec.issue(&account()).unwrap();
        assert_eq!(other.verify(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn garbage_is_rejected_as_invalid() {
        let codec = TokenCodec::new("secret", 36000);
        assert_eq!(codec.verify("not.a.token").unwrap_err(), TokenError::Invalid);
        assert_eq!(codec.verify("").unwrap_err(), TokenError::Invalid);
    }
}
