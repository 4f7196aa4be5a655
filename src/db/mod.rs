//! Database layer.
//!
//! Services talk to storage through [`ChallengeStore`]. Firestore is the
//! production backend; [`MemoryDb`] serves local development and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{ChallengeSession, User, UserVoucher, Voucher};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const CHALLENGE_SESSIONS: &str = "challenge_sessions";
    pub const VOUCHERS: &str = "vouchers";
    pub const USER_VOUCHERS: &str = "user_vouchers";
}

/// A single document write.
#[derive(Debug, Clone)]
pub enum Write {
    PutUser(User),
    PutSession(ChallengeSession),
    DeleteSession(String),
    PutUserVoucher(UserVoucher),
}

/// Writes that must be applied together or not at all.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    writes: Vec<Write>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_user(mut self, user: User) -> Self {
        self.writes.push(Write::PutUser(user));
        self
    }

    pub fn put_session(mut self, session: ChallengeSession) -> Self {
        self.writes.push(Write::PutSession(session));
        self
    }

    pub fn delete_session(mut self, session_id: &str) -> Self {
        self.writes.push(Write::DeleteSession(session_id.to_string()));
        self
    }

    pub fn put_user_voucher(mut self, record: UserVoucher) -> Self {
        self.writes.push(Write::PutUserVoucher(record));
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    /// Whether any write replaces the user document.
    pub fn writes_user(&self) -> bool {
        self.writes.iter().any(|w| matches!(w, Write::PutUser(_)))
    }
}

/// A user's record and active session, as read inside a store transaction.
#[derive(Debug, Clone)]
pub struct UserState {
    /// Stored user, or a fresh zero-balance one
    pub user: User,
    pub active_session: Option<ChallengeSession>,
}

/// Checks business rules against a [`UserState`] and returns the writes to
/// apply. An error aborts the transaction with nothing written.
pub type UserMutation<'a> = dyn FnMut(UserState) -> Result<ChangeSet, AppError> + Send + 'a;

/// Persistent state used by the challenge and voucher services.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Get a user by ID.
    async fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError>;

    /// Get the user's `ACTIVE` session, if any.
    async fn get_active_session(&self, user_id: u64)
        -> Result<Option<ChallengeSession>, AppError>;

    /// Get any session (including completed ones) by ID.
    async fn get_session(&self, session_id: &str) -> Result<Option<ChallengeSession>, AppError>;

    /// Get a catalog voucher by ID.
    async fn get_voucher(&self, voucher_id: u64) -> Result<Option<Voucher>, AppError>;

    /// List the whole voucher catalog, ordered by voucher ID.
    async fn list_vouchers(&self) -> Result<Vec<Voucher>, AppError>;

    /// List a user's ownership records, newest first.
    async fn list_user_vouchers(&self, user_id: u64) -> Result<Vec<UserVoucher>, AppError>;

    /// Apply all writes atomically.
    async fn commit(&self, changes: ChangeSet) -> Result<(), AppError>;

    /// Read the user's state, run `mutation` on it and commit the returned
    /// writes as one transaction.
    ///
    /// No other transaction for the same user can interleave between the
    /// read and the commit. `mutation` may run more than once if the store
    /// retries after contention; only the last run's writes are applied.
    async fn transact(&self, user_id: u64, mutation: &mut UserMutation<'_>)
        -> Result<(), AppError>;
}
