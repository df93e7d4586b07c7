//! Identity store — accounts and schedule records.
//!
//! The gateway treats persistence as an external collaborator reachable by
//! single-document lookups and field updates. [`IdentityStore`] is that seam;
//! [`MemoryStore`] is the in-process implementation the server and tests run
//! against.

mod memory;
mod model;

pub use memory::MemoryStore;
pub use model::{Account, LoginMethod, NewAccount, ScheduleRecord};

use async_trait::async_trait;

use crate::Result;

/// Document-store operations the gateway depends on.
///
/// Every operation is an independent single-document read or write; there is
/// no cross-document transaction (see the reconciler for the accepted
/// create-account-then-create-schedule partial-failure state).
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up an account by its store-assigned id
    async fn find_account(&self, id: &str) -> Result<Option<Account>>;

    /// Look up an account by external provider subject
    async fn find_by_subject(&self, subject: &str) -> Result<Option<Account>>;

    /// Look up an account by username
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>>;

    /// All accounts
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// All usernames of direct-registration accounts
    async fn list_usernames(&self) -> Result<Vec<String>>;

    /// Create an account; the store assigns the id
    async fn create_account(&self, account: NewAccount) -> Result<Account>;

    /// Create a schedule record
    async fn create_schedule(&self, record: ScheduleRecord) -> Result<ScheduleRecord>;

    /// Schedule record for an account, if one exists
    async fn find_schedule(&self, account_id: &str) -> Result<Option<ScheduleRecord>>;

    /// Replace the schedule body; returns whether a record matched
    async fn set_schedule(&self, account_id: &str, schedule: serde_json::Value) -> Result<bool>;

    /// Replace the portion; returns whether a record matched
    async fn set_portion(&self, account_id: &str, portion: u32) -> Result<bool>;

    /// Replace schedule and portion together; returns whether a record matched
    async fn set_preferences(
        &self,
        account_id: &str,
        schedule: serde_json::Value,
        portion: u32,
    ) -> Result<bool>;
}
