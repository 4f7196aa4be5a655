// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod challenge;
pub mod directory;
pub mod voucher;

pub use challenge::{ChallengeService, CheckinOutcome, RemoveOutcome, TargetView};
pub use directory::ShopDirectory;
pub use voucher::VoucherService;

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-user mutexes serializing read-modify-write on a user's session and
/// points balance. Shared by every service in the process.
pub type UserLocks = Arc<DashMap<u64, Arc<Mutex<()>>>>;

/// Acquire the lock for one user, creating it on first use.
pub(crate) async fn lock_user(locks: &UserLocks, user_id: u64) -> OwnedMutexGuard<()> {
    let lock = locks
        .entry(user_id)
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();

    lock.lock_owned().await
}
