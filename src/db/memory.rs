// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store for local development and tests.

use crate::db::{ChallengeStore, ChangeSet, UserMutation, UserState, Write};
use crate::error::AppError;
use crate::models::{ChallengeSession, User, UserVoucher, Voucher};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use validator::Validate;

#[derive(Default)]
struct Tables {
    users: HashMap<u64, User>,
    sessions: HashMap<String, ChallengeSession>,
    vouchers: BTreeMap<u64, Voucher>,
    user_vouchers: HashMap<String, UserVoucher>,
}

/// In-memory database. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<RwLock<Tables>>,
    fail_commits: Arc<AtomicBool>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail (nothing is applied).
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Create or replace a user record.
    pub async fn upsert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.user_id, user);
    }

    /// Create or replace a catalog voucher.
    pub async fn upsert_voucher(&self, voucher: Voucher) {
        self.tables
            .write()
            .await
            .vouchers
            .insert(voucher.voucher_id, voucher);
    }

    /// Remove a voucher from the catalog (ownership records are left alone).
    pub async fn delete_voucher(&self, voucher_id: u64) {
        self.tables.write().await.vouchers.remove(&voucher_id);
    }

    /// All sessions ever stored for a user, in no particular order.
    pub async fn sessions_for_user(&self, user_id: u64) -> Vec<ChallengeSession> {
        self.tables
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Load the voucher catalog from a JSON array file.
    pub async fn seed_vouchers_from_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<usize> {
        let json = std::fs::read_to_string(path.as_ref())?;
        self.seed_vouchers_from_json(&json).await
    }

    /// Load the voucher catalog from a JSON array string.
    pub async fn seed_vouchers_from_json(&self, json: &str) -> anyhow::Result<usize> {
        let vouchers: Vec<Voucher> = serde_json::from_str(json)?;
        for voucher in &vouchers {
            voucher
                .validate()
                .map_err(|e| anyhow::anyhow!("Invalid voucher {}: {}", voucher.voucher_id, e))?;
        }

        let count = vouchers.len();
        let mut tables = self.tables.write().await;
        for voucher in vouchers {
            tables.vouchers.insert(voucher.voucher_id, voucher);
        }
        tracing::info!(count, "Seeded voucher catalog");
        Ok(count)
    }
}

#[async_trait]
impl ChallengeStore for MemoryDb {
    async fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn get_active_session(
        &self,
        user_id: u64,
    ) -> Result<Option<ChallengeSession>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .sessions
            .values()
            .find(|s| s.user_id == user_id && s.is_active())
            .cloned())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<ChallengeSession>, AppError> {
        Ok(self.tables.read().await.sessions.get(session_id).cloned())
    }

    async fn get_voucher(&self, voucher_id: u64) -> Result<Option<Voucher>, AppError> {
        Ok(self.tables.read().await.vouchers.get(&voucher_id).cloned())
    }

    async fn list_vouchers(&self) -> Result<Vec<Voucher>, AppError> {
        Ok(self.tables.read().await.vouchers.values().cloned().collect())
    }

    async fn list_user_vouchers(&self, user_id: u64) -> Result<Vec<UserVoucher>, AppError> {
        let mut records: Vec<UserVoucher> = self
            .tables
            .read()
            .await
            .user_vouchers
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.transaction_id.cmp(&a.transaction_id))
        });
        Ok(records)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        self.apply(&mut tables, &changes)
    }

    async fn transact(
        &self,
        user_id: u64,
        mutation: &mut UserMutation<'_>,
    ) -> Result<(), AppError> {
        // The write lock is held from the read through the commit.
        let mut tables = self.tables.write().await;

        let state = UserState {
            user: tables
                .users
                .get(&user_id)
                .cloned()
                .unwrap_or_else(|| User::new(user_id)),
            active_session: tables
                .sessions
                .values()
                .find(|s| s.user_id == user_id && s.is_active())
                .cloned(),
        };

        let changes = mutation(state)?;
        if changes.is_empty() {
            return Ok(());
        }
        self.apply(&mut tables, &changes)
    }
}

impl MemoryDb {
    fn apply(&self, tables: &mut Tables, changes: &ChangeSet) -> Result<(), AppError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(AppError::Database(
                "Transaction commit failed: store unavailable".to_string(),
            ));
        }

        for write in changes.writes() {
            match write {
                Write::PutUser(user) => {
                    tables.users.insert(user.user_id, user.clone());
                }
                Write::PutSession(session) => {
                    tables
                        .sessions
                        .insert(session.session_id.clone(), session.clone());
                }
                Write::DeleteSession(session_id) => {
                    tables.sessions.remove(session_id);
                }
                Write::PutUserVoucher(record) => {
                    tables
                        .user_vouchers
                        .insert(record.transaction_id.clone(), record.clone());
                }
            }
        }

        Ok(())
    }
}
