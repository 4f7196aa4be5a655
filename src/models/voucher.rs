// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Voucher catalog and ownership records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Catalog entry that points can be exchanged for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Voucher {
    /// Voucher ID (also used as document ID)
    pub voucher_id: u64,
    /// Redemption code shown to the shop
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    /// Price in points
    #[validate(range(min = 1))]
    pub point_cost: u64,
    pub image_url: Option<String>,
}

/// Lifecycle of an owned voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherStatus {
    Unused,
    Used,
}

impl VoucherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherStatus::Unused => "UNUSED",
            VoucherStatus::Used => "USED",
        }
    }
}

/// One redemption event: a user owning an instance of a voucher.
///
/// References the catalog entry by ID only. If the voucher is later removed
/// from the catalog, the record is orphaned and hidden from listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserVoucher {
    /// Unique per redemption (also used as document ID)
    pub transaction_id: String,
    pub user_id: u64,
    pub voucher_id: u64,
    pub status: VoucherStatus,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl UserVoucher {
    /// Issue a new, unused voucher instance.
    pub fn issue(user_id: u64, voucher_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            transaction_id: uuid::Uuid::new_v4().to_string(),
            user_id,
            voucher_id,
            status: VoucherStatus::Unused,
            created_at: now,
        }
    }
}
