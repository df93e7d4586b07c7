//! OAuth2 authorization-code exchange against the identity provider.
//!
//! The gateway hands the client a deterministic authorization URL, the
//! provider redirects back with a code, and [`OAuthExchanger::exchange_code`]
//! turns that code into an access token plus the identity claims decoded from
//! the returned identity token. This component never touches the identity
//! store.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::OAuthConfig;
use crate::{Error, Result};

/// Fixed anti-replay state value carried through the authorization redirect.
const OAUTH_STATE: &str = "standard_oauth";

/// Identity claims decoded from the provider's identity token.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityClaims {
    /// Provider's stable unique identifier for the user
    #[serde(rename = "sub")]
    pub subject: String,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Avatar image URL
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    id_token: Option<String>,
}

/// Drives the authorization-code flow against the provider's endpoints.
pub struct OAuthExchanger {
    http: Client,
    config: OAuthConfig,
}

impl OAuthExchanger {
    /// Create an exchanger over a shared HTTP client.
    #[must_use]
    pub fn new(http: Client, config: OAuthConfig) -> Self {
        Self { http, config }
    }

    /// Deterministic authorization URL the client is redirected to.
    /// Pure function of static configuration.
    pub fn authorization_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| Error::Config(format!("Invalid auth endpoint: {e}")))?;

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("client_id", &self.config.client_id);
            params.append_pair("redirect_uri", &self.config.redirect_url);
            params.append_pair("response_type", "code");
            params.append_pair("scope", &self.config.scopes.join(" "));
            params.append_pair("access_type", "offline");
            params.append_pair("state", OAUTH_STATE);
            params.append_pair("prompt", "consent");
        }

        Ok(url.to_string())
    }

    /// Exchange an authorization code for the provider access token and the
    /// identity claims.
    ///
    /// # Errors
    ///
    /// `BadRequest` for an empty code (rejected before any network call);
    /// `Upstream` if the token endpoint fails, the response lacks either
    /// token, or the identity token payload cannot be decoded.
    pub async fn exchange_code(&self, code: &str) -> Result<(String, IdentityClaims)> {
        if code.is_empty() {
            return Err(Error::BadRequest(
                "Authorization code must be provided".to_string(),
            ));
        }

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_url.as_str()),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Token exchange failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(%status, body = %body, "Provider rejected the code exchange");
            return Err(Error::Upstream(format!(
                "Token exchange failed: HTTP {status}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Failed to parse token response: {e}")))?;

        let (Some(access_token), Some(id_token)) =
            (token_response.access_token, token_response.id_token)
        else {
            return Err(Error::Upstream(
                "Provider response missing access or identity token".to_string(),
            ));
        };

        let claims = decode_identity_token(&id_token)?;
        debug!(subject = %claims.subject, "Decoded identity claims");

        Ok((access_token, claims))
    }
}

/// Decode the payload of the provider's identity token.
///
/// The token is read straight out of the token-endpoint response, so no
/// signature verification happens here; this is local base64 decoding only.
fn decode_identity_token(token: &str) -> Result<IdentityClaims> {
    let parts: Vec<&str> = token.splitn(3, '.').collect();
    if parts.len() < 2 {
        return Err(Error::Upstream("Malformed identity token".to_string()));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| Error::Upstream("Malformed identity token".to_string()))?;

    serde_json::from_slice(&payload)
        .map_err(|_| Error::Upstream("Malformed identity token".to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config() -> OAuthConfig {
        OAuthConfig {
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
            redirect_url: "http://localhost:3000/callback".to_string(),
            ..OAuthConfig::default()
        }
    }

    fn exchanger() -> OAuthExchanger {
        OAuthExchanger::new(Client::new(), config())
    }

    #[test]
    fn authorization_url_is_deterministic() {
        let a = exchanger().authorization_url().unwrap();
        let b = exchanger().authorization_url().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn authorization_url_carries_the_full_parameter_set() {
        let url = exchanger().authorization_url().unwrap();
        let parsed = Url::parse(&url).unwrap();
        let params: HashMap<String, String> = serde_urlencoded::from_str(parsed.query().unwrap()).unwrap();

        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["redirect_uri"], "http://localhost:3000/callback");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["state"], "standard_oauth");
        assert_eq!(params["prompt"], "consent");
        assert!(params["scope"].contains("openid"));
        assert!(params["scope"].contains("drive.readonly"));
    }

    #[tokio::test]
    async fn empty_code_is_rejected_before_any_network_call() {
        // The default token_url points at the real provider; an empty code
        // must fail without reaching it.
        let err = exchanger().exchange_code("").await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    fn fake_id_token(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{header}.{body}.fake-signature")
    }

    #[test]
    fn identity_token_payload_decodes_to_claims() {
        let token = fake_id_token(&serde_json::json!({
            "sub": "109...42",
            "email": "pet@example.com",
            "name": "Pet Owner",
            "picture": "https://example.com/p.png",
            "iss": "https://accounts.google.com"
        }));

        let claims = decode_identity_token(&token).unwrap();
        assert_eq!(claims.subject, "109...42");
        assert_eq!(claims.email.as_deref(), Some("pet@example.com"));
        assert_eq!(claims.name.as_deref(), Some("Pet Owner"));
        assert_eq!(claims.picture.as_deref(), Some("https://example.com/p.png"));
    }

    #[test]
    fn optional_claims_may_be_absent() {
        let token = fake_id_token(&serde_json::json!({ "sub": "only-sub" }));
        let claims = decode_identity_token(&token).unwrap();
        assert_eq!(claims.subject, "only-sub");
        assert!(claims.email.is_none());
        assert!(claims.picture.is_none());
    }

    #[test]
    fn malformed_identity_tokens_are_rejected() {
        assert!(decode_identity_token("no-dots-here").is_err());
        assert!(decode_identity_token("a.!!!not-base64!!!.c").is_err());

        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode(b"plain text"));
        assert!(decode_identity_token(&not_json).is_err());

        // Valid JSON but missing the subject claim
        let no_sub = fake_id_token(&serde_json::json!({ "email": "x@y.z" }));
        assert!(decode_identity_token(&no_sub).is_err());
    }
}
