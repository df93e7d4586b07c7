//! In-process identity store.

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{Account, IdentityStore, NewAccount, ScheduleRecord};
use crate::Result;

/// In-memory [`IdentityStore`].
///
/// Lookups and writes are single-document operations under a plain lock, so
/// the duplicate-creation race between two concurrent first logins is the
/// same one the document store would exhibit: both can pass the "not found"
/// check before either creates.
#[derive(Default)]
pub struct MemoryStore {
    accounts: RwLock<Vec<Account>>,
    schedules: RwLock<Vec<ScheduleRecord>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_account(&self, id: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn find_by_subject(&self, subject: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .iter()
            .find(|a| a.subject.as_deref() == Some(subject))
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .iter()
            .find(|a| a.username.as_deref() == Some(username))
            .cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.read().clone())
    }

    async fn list_usernames(&self) -> Result<Vec<String>> {
        Ok(self
            .accounts
            .read()
            .iter()
            .filter_map(|a| a.username.clone())
            .collect())
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let created = Account {
            id: Uuid::new_v4().to_string(),
            subject: account.subject,
            username: account.username,
            email: account.email,
            display_name: account.display_name,
            avatar_url: account.avatar_url,
            credential_hash: account.credential_hash,
            login_method: account.login_method,
        };
        self.accounts.write().push(created.clone());
        Ok(created)
    }

    async fn create_schedule(&self, record: ScheduleRecord) -> Result<ScheduleRecord> {
        self.schedules.write().push(record.clone());
        Ok(record)
    }

    async fn find_schedule(&self, account_id: &str) -> Result<Option<ScheduleRecord>> {
        Ok(self
            .schedules
            .read()
            .iter()
            .find(|s| s.account_id == account_id)
            .cloned())
    }

    async fn set_schedule(&self, account_id: &str, schedule: serde_json::Value) -> Result<bool> {
        let mut records = self.schedules.write();
        match records.iter_mut().find(|s| s.account_id == account_id) {
            Some(record) => {
                record.schedule = schedule;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_portion(&self, account_id: &str, portion: u32) -> Result<bool> {
        let mut records = self.schedules.write();
        match records.iter_mut().find(|s| s.account_id == account_id) {
            Some(record) => {
                record.portion = portion;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_preferences(
        &self,
        account_id: &str,
        schedule: serde_json::Value,
        portion: u32,
    ) -> Result<bool> {
        let mut records = self.schedules.write();
        match records.iter_mut().find(|s| s.account_id == account_id) {
            Some(record) => {
                record.schedule = schedule;
                record.portion = portion;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
