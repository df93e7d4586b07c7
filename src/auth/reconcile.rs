//! Identity reconciliation — turning provider claims or direct credentials
//! into a local account.

use std::sync::Arc;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use tracing::{info, warn};

use super::oauth::IdentityClaims;
use crate::store::{Account, IdentityStore, NewAccount, ScheduleRecord};
use crate::{Error, Result};

/// Resolves identities against the store, creating accounts (and their
/// default schedule records) on first contact.
pub struct IdentityReconciler {
    store: Arc<dyn IdentityStore>,
}

impl IdentityReconciler {
    /// Create a reconciler over the identity store.
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Find the account for a provider identity, creating it on first login.
    ///
    /// Existing account fields are authoritative: claims from a repeat login
    /// never overwrite them. Two simultaneous first logins for the same
    /// subject can both pass the lookup and both create; that race is
    /// inherited from the store's non-transactional contract.
    pub async fn resolve_or_create(&self, claims: &IdentityClaims) -> Result<Account> {
        if let Some(existing) = self.store.find_by_subject(&claims.subject).await? {
            return Ok(existing);
        }

        info!(subject = %claims.subject, "Creating account for first provider login");
        let account = self
            .store
            .create_account(account_from_claims(claims))
            .await?;
        self.provision_default_schedule(&account.id).await;
        Ok(account)
    }

    /// Register a direct account, hashing the credential with a slow salted
    /// one-way hash. Fails with `Conflict` if the username already exists;
    /// nothing is created in that case.
    pub async fn register_direct(
        &self,
        username: &str,
        credential: &str,
        email: Option<String>,
        display_name: Option<String>,
    ) -> Result<Account> {
        if self.store.find_by_username(username).await?.is_some() {
            return Err(Error::Conflict("Unable to create user".to_string()));
        }

        let hash = hash_credential(credential)?;
        let account = self
            .store
            .create_account(NewAccount::direct(
                username.to_string(),
                hash,
                email,
                display_name,
            ))
            .await?;
        self.provision_default_schedule(&account.id).await;
        Ok(account.sanitized())
    }

    /// Verify a direct login. `NotFound` for an unknown username,
    /// `Unauthenticated` for a credential mismatch. The returned account has
    /// the credential hash stripped.
    pub async fn authenticate_direct(&self, username: &str, credential: &str) -> Result<Account> {
        let account = self
            .store
            .find_by_username(username)
            .await?
            .ok_or_else(|| Error::NotFound("User Doesn't Exist".to_string()))?;

        let Some(hash) = account.credential_hash.as_deref() else {
            // Provider-established account; it has no credential to match.
            return Err(Error::Unauthenticated);
        };

        if !verify_credential(hash, credential) {
            return Err(Error::Unauthenticated);
        }

        Ok(account.sanitized())
    }

    /// Schedule creation after a successful account creation is not rolled
    /// back on failure: the account stays usable without a schedule until a
    /// later write creates one.
    async fn provision_default_schedule(&self, account_id: &str) {
        if let Err(e) = self
            .store
            .create_schedule(ScheduleRecord::empty(account_id))
            .await
        {
            warn!(account_id = %account_id, error = %e, "Failed to create default schedule");
        }
    }
}

/// Explicit field-by-field mapping from provider claims to the account shape.
fn account_from_claims(claims: &IdentityClaims) -> NewAccount {
    NewAccount::provider(
        claims.subject.clone(),
        claims.email.clone(),
        claims.name.clone(),
        claims.picture.clone(),
    )
}

fn hash_credential(credential: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| Error::Internal(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| Error::Internal(e.to_string()))?;

    Argon2::default()
        .hash_password(credential.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Internal(e.to_string()))
}

/// PHC-string verification; the comparison inside is constant-time.
fn verify_credential(hash: &str, credential: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(credential.as_bytes(), &parsed)
        .is_ok()
}
