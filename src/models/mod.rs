// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod challenge;
pub mod shop;
pub mod user;
pub mod voucher;

pub use challenge::{ChallengeSession, SessionStatus, TargetList, MAX_TARGETS};
pub use shop::Shop;
pub use user::User;
pub use voucher::{UserVoucher, Voucher, VoucherStatus};
