// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, Utc};

/// Format a redemption timestamp for display, e.g. `05/03/2026 14:07`.
pub fn format_redeemed_date(date: DateTime<Utc>) -> String {
    date.format("%d/%m/%Y %H:%M").to_string()
}
