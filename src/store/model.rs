//! Account and schedule record shapes.
//!
//! Wire names (`_id`, `name`, `picture`, `loginMethod`, `user_id`) match what
//! the companion front end has always consumed.

use serde::{Deserialize, Serialize};

/// How an account was established, and therefore which fields are
/// authoritative for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginMethod {
    /// Third-party identity provider login (has a `subject`, no credential)
    #[serde(rename = "google")]
    Provider,
    /// Direct registration through the app (has a credential, no `subject`)
    #[serde(rename = "website")]
    Direct,
}

/// A user account.
///
/// Exactly one of `subject` / `credential_hash` is set, matching
/// `login_method`. The credential hash is never serialized: it cannot appear
/// in a response body or inside a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Store-assigned identifier; immutable
    #[serde(rename = "_id")]
    pub id: String,
    /// External provider's stable unique identifier, if provider-established
    #[serde(rename = "sub", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Unique username, if direct-registered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Email address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name
    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Avatar image URL
    #[serde(rename = "picture", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Salted one-way credential hash for direct-registration accounts
    #[serde(skip_serializing, default)]
    pub credential_hash: Option<String>,
    /// Which login path established this account
    #[serde(rename = "loginMethod")]
    pub login_method: LoginMethod,
}

impl Account {
    /// Copy of this account with the credential hash stripped.
    /// Every account that leaves the reconciler or enters a token goes
    /// through this.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        Self {
            credential_hash: None,
            ..self.clone()
        }
    }
}

/// Fields for an account about to be created; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// External provider subject, for provider accounts
    pub subject: Option<String>,
    /// Username, for direct accounts
    pub username: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Display name
    pub display_name: Option<String>,
    /// Avatar image URL
    pub avatar_url: Option<String>,
    /// Credential hash, for direct accounts
    pub credential_hash: Option<String>,
    /// Login path
    pub login_method: LoginMethod,
}

impl NewAccount {
    /// Provider-established account: subject set, no credential.
    #[must_use]
    pub fn provider(
        subject: String,
        email: Option<String>,
        display_name: Option<String>,
        avatar_url: Option<String>,
    ) -> Self {
        Self {
            subject: Some(subject),
            username: None,
            email,
            display_name,
            avatar_url,
            credential_hash: None,
            login_method: LoginMethod::Provider,
        }
    }

    /// Direct-registration account: credential set, no subject.
    #[must_use]
    pub fn direct(
        username: String,
        credential_hash: String,
        email: Option<String>,
        display_name: Option<String>,
    ) -> Self {
        Self {
            subject: None,
            username: Some(username),
            email,
            display_name,
            avatar_url: None,
            credential_hash: Some(credential_hash),
            login_method: LoginMethod::Direct,
        }
    }
}

/// Per-account feeding preferences; created once at account creation with an
/// empty body, keyed by the account id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRecord {
    /// Owning account id
    #[serde(rename = "user_id")]
    pub account_id: String,
    /// Feeding portion size
    pub portion: u32,
    /// Feeding schedule body (shape owned by the front end)
    pub schedule: serde_json::Value,
}

impl ScheduleRecord {
    /// Zeroed default record for a freshly created account.
    #[must_use]
    pub fn empty(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            portion: 0,
            schedule: serde_json::json!({}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_uphold_the_credential_invariant() {
        let provider = NewAccount::provider("sub-1".into(), None, None, None);
        assert!(provider.subject.is_some());
        assert!(provider.credential_hash.is_none());
        assert_eq!(provider.login_method, LoginMethod::Provider);

        let direct = NewAccount::direct("kc".into(), "$argon2id$...".into(), None, None);
        assert!(direct.subject.is_none());
        assert!(direct.credential_hash.is_some());
        assert_eq!(direct.login_method, LoginMethod::Direct);
    }

    #[test]
    fn credential_hash_never_serializes() {
        let account = Account {
            id: "a1".into(),
            subject: None,
            username: Some("kc".into()),
            email: None,
            display_name: None,
            avatar_url: None,
            credential_hash: Some("$argon2id$secret".into()),
            login_method: LoginMethod::Direct,
        };

        let json = serde_json::to_value(&account).unwrap();
        let text = json.to_string();
        assert!(!text.contains("argon2"));
        assert!(!text.contains("credential"));
        assert_eq!(json["_id"], "a1");
        assert_eq!(json["loginMethod"], "website");
    }

    #[test]
    fn sanitized_strips_only_the_credential() {
        let account = Account {
            id: "a1".into(),
            subject: Some("sub-1".into()),
            username: None,
            email: Some("a@b.c".into()),
            display_name: Some("A".into()),
            avatar_url: None,
            credential_hash: Some("hash".into()),
            login_method: LoginMethod::Provider,
        };
        let clean = account.sanitized();
        assert!(clean.credential_hash.is_none());
        assert_eq!(clean.id, account.id);
        assert_eq!(clean.email, account.email);
    }

    #[test]
    fn account_round_trips_without_credential() {
        let account = Account {
            id: "a2".into(),
            subject: Some("sub-2".into()),
            username: None,
            email: Some("x@y.z".into()),
            display_name: Some("X".into()),
            avatar_url: Some("http://pic".into()),
            credential_hash: None,
            login_method: LoginMethod::Provider,
        };
        let json = serde_json::to_string(&account).unwrap();
        let back: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "a2");
        assert_eq!(back.subject.as_deref(), Some("sub-2"));
        assert!(back.credential_hash.is_none());
    }
}
