// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Voucher catalog and redemption service.

use crate::db::{ChallengeStore, ChangeSet, UserState};
use crate::error::{AppError, Result};
use crate::models::{UserVoucher, Voucher};
use crate::services::{lock_user, UserLocks};
use std::collections::HashMap;
use std::sync::Arc;

/// The catalog as seen by one user.
#[derive(Debug, Clone)]
pub struct VoucherCatalog {
    pub user_points: u64,
    pub vouchers: Vec<Voucher>,
}

/// A completed redemption.
#[derive(Debug, Clone)]
pub struct Redemption {
    pub voucher: Voucher,
    pub record: UserVoucher,
    pub new_points: u64,
}

/// An ownership record joined with its catalog entry.
#[derive(Debug, Clone)]
pub struct OwnedVoucher {
    pub record: UserVoucher,
    pub voucher: Voucher,
}

/// Points-for-vouchers exchange.
#[derive(Clone)]
pub struct VoucherService {
    db: Arc<dyn ChallengeStore>,
    locks: UserLocks,
}

impl VoucherService {
    pub fn new(db: Arc<dyn ChallengeStore>, locks: UserLocks) -> Self {
        Self { db, locks }
    }

    /// Current balance plus the full catalog.
    pub async fn catalog(&self, user_id: u64) -> Result<VoucherCatalog> {
        let user_points = self
            .db
            .get_user(user_id)
            .await?
            .map_or(0, |u| u.balance());
        let vouchers = self.db.list_vouchers().await?;

        Ok(VoucherCatalog {
            user_points,
            vouchers,
        })
    }

    /// Exchange points for a voucher.
    ///
    /// The balance is checked against the value read inside the store
    /// transaction, and the debit and the new ownership record are committed
    /// together; on a failed commit neither is visible.
    pub async fn redeem(&self, user_id: u64, voucher_id: u64) -> Result<Redemption> {
        let _guard = lock_user(&self.locks, user_id).await;

        let voucher = self
            .db
            .get_voucher(voucher_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Voucher {} does not exist", voucher_id)))?;

        let mut issued = None;
        let result = self
            .db
            .transact(user_id, &mut |state: UserState| -> Result<ChangeSet> {
                let mut user = state.user;
                let new_points = user.debit(voucher.point_cost)?;
                let record = UserVoucher::issue(user_id, voucher.voucher_id, chrono::Utc::now());

                issued = Some((record.clone(), new_points));
                Ok(ChangeSet::new().put_user(user).put_user_voucher(record))
            })
            .await;

        if let Err(e) = result {
            if matches!(e, AppError::Database(_)) {
                tracing::error!(user_id, voucher_id, error = %e, "Voucher redemption rolled back");
            }
            return Err(e);
        }

        let (record, new_points) = issued.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("redemption transaction returned nothing"))
        })?;

        tracing::info!(
            user_id,
            voucher_id,
            transaction_id = %record.transaction_id,
            new_points,
            "Voucher redeemed"
        );

        Ok(Redemption {
            voucher,
            record,
            new_points,
        })
    }

    /// The user's vouchers, newest first.
    ///
    /// Records whose voucher has left the catalog are skipped.
    pub async fn list_owned(&self, user_id: u64) -> Result<Vec<OwnedVoucher>> {
        let records = self.db.list_user_vouchers(user_id).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let catalog: HashMap<u64, Voucher> = self
            .db
            .list_vouchers()
            .await?
            .into_iter()
            .map(|v| (v.voucher_id, v))
            .collect();

        Ok(records
            .into_iter()
            .filter_map(|record| {
                let voucher = catalog.get(&record.voucher_id)?.clone();
                Some(OwnedVoucher { record, voucher })
            })
            .collect())
    }
}
