// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Shop Challenge: location-based challenges and loyalty points.
//!
//! Users pick up to three shops as active challenges, check in by being
//! physically close to one, earn points, and exchange points for vouchers.

pub mod config;
pub mod db;
pub mod error;
pub mod geodistance;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::ChallengeStore;
use services::{ChallengeService, ShopDirectory, UserLocks, VoucherService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn ChallengeStore>,
    pub directory: Arc<ShopDirectory>,
    pub challenge_service: ChallengeService,
    pub voucher_service: VoucherService,
}

impl AppState {
    /// Wire up services around a store and directory.
    ///
    /// Both services share one set of per-user locks so that check-ins and
    /// redemptions for the same user never interleave.
    pub fn new(config: Config, db: Arc<dyn ChallengeStore>, directory: ShopDirectory) -> Self {
        let directory = Arc::new(directory);
        let locks = UserLocks::default();

        Self {
            challenge_service: ChallengeService::new(db.clone(), directory.clone(), locks.clone()),
            voucher_service: VoucherService::new(db.clone(), locks),
            config,
            db,
            directory,
        }
    }
}
