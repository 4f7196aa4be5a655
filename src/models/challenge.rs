// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Challenge session model and target list rules.

use crate::error::RuleViolation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of target shops held at once.
pub const MAX_TARGETS: usize = 3;

/// Session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Completed => "COMPLETED",
        }
    }
}

/// Ordered set of target shop IDs, at most [`MAX_TARGETS`] long.
///
/// Insertion order is preserved; it decides which shop wins a check-in
/// when several are in range. Stored records are re-validated on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct TargetList(Vec<u64>);

impl TargetList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a shop, returning the new length.
    ///
    /// The size limit is checked before duplicates, so adding to a full
    /// list always reports the limit.
    pub fn add(&mut self, shop_id: u64) -> Result<usize, RuleViolation> {
        if self.0.len() >= MAX_TARGETS {
            return Err(RuleViolation::LimitExceeded { max: MAX_TARGETS });
        }
        if self.contains(shop_id) {
            return Err(RuleViolation::DuplicateTarget(shop_id));
        }
        self.0.push(shop_id);
        Ok(self.0.len())
    }

    /// Remove a shop, returning the new length.
    pub fn remove(&mut self, shop_id: u64) -> Result<usize, RuleViolation> {
        let pos = self
            .0
            .iter()
            .position(|&id| id == shop_id)
            .ok_or(RuleViolation::NotInList(shop_id))?;
        self.0.remove(pos);
        Ok(self.0.len())
    }

    pub fn contains(&self, shop_id: u64) -> bool {
        self.0.contains(&shop_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().copied()
    }
}

impl TryFrom<Vec<u64>> for TargetList {
    type Error = TargetListError;

    fn try_from(ids: Vec<u64>) -> Result<Self, Self::Error> {
        if ids.len() > MAX_TARGETS {
            return Err(TargetListError::TooLong(ids.len()));
        }
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Err(TargetListError::Duplicate(*id));
            }
        }
        Ok(Self(ids))
    }
}

impl From<TargetList> for Vec<u64> {
    fn from(list: TargetList) -> Self {
        list.0
    }
}

/// A stored target list that violates the list invariants.
#[derive(Debug, thiserror::Error)]
pub enum TargetListError {
    #[error("target list has {0} entries (max {max})", max = MAX_TARGETS)]
    TooLong(usize),

    #[error("target list contains shop {0} twice")]
    Duplicate(u64),
}

/// A user's challenge session (stored in Firestore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeSession {
    /// Opaque session ID (also used as document ID)
    pub session_id: String,
    /// Owning user
    pub user_id: u64,
    /// Shops still to visit, in the order they were added
    pub target_shops: TargetList,
    pub status: SessionStatus,
    /// Reserved progress counter, currently always 0
    #[serde(default)]
    pub current_step: u32,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl ChallengeSession {
    /// Start a fresh, empty active session.
    pub fn new(user_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            user_id,
            target_shops: TargetList::new(),
            status: SessionStatus::Active,
            current_step: 0,
            created_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Remove a shop the user checked in at.
    ///
    /// Returns `true` if this was the last target, in which case the session
    /// is marked completed.
    pub fn complete_target(&mut self, shop_id: u64) -> Result<bool, RuleViolation> {
        let remaining = self.target_shops.remove(shop_id)?;
        if remaining == 0 {
            self.status = SessionStatus::Completed;
        }
        Ok(remaining == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_preserves_order() {
        let mut list = TargetList::new();
        list.add(5).unwrap();
        list.add(1).unwrap();
        list.add(3).unwrap();

        assert_eq!(list.iter().collect::<Vec<_>>(), vec![5, 1, 3]);
    }

    #[test]
    fn test_add_rejects_fourth_target() {
        let mut list = TargetList::new();
        for id in 1..=3 {
            assert_eq!(list.add(id), Ok(id as usize));
        }

        assert_eq!(
            list.add(4),
            Err(RuleViolation::LimitExceeded { max: MAX_TARGETS })
        );
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_limit_reported_before_duplicate() {
        let mut list = TargetList::try_from(vec![1, 2, 3]).unwrap();
        assert_eq!(
            list.add(2),
            Err(RuleViolation::LimitExceeded { max: MAX_TARGETS })
        );
    }

    #[test]
    fn test_duplicate_under_cap() {
        let mut list = TargetList::try_from(vec![1, 2]).unwrap();
        assert_eq!(list.add(2), Err(RuleViolation::DuplicateTarget(2)));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_remove_missing() {
        let mut list = TargetList::try_from(vec![1]).unwrap();
        assert_eq!(list.remove(9), Err(RuleViolation::NotInList(9)));
        assert_eq!(list.remove(1), Ok(0));
        assert!(list.is_empty());
    }

    #[test]
    fn test_deserialize_rejects_invalid_lists() {
        assert!(serde_json::from_str::<TargetList>("[1,2,3,4]").is_err());
        assert!(serde_json::from_str::<TargetList>("[1,1]").is_err());

        let list: TargetList = serde_json::from_str("[7,2]").unwrap();
        assert_eq!(serde_json::to_string(&list).unwrap(), "[7,2]");
    }

    #[test]
    fn test_complete_last_target_marks_completed() {
        let mut session = ChallengeSession::new(1, Utc::now());
        session.target_shops.add(10).unwrap();
        session.target_shops.add(20).unwrap();

        assert_eq!(session.complete_target(10), Ok(false));
        assert!(session.is_active());

        assert_eq!(session.complete_target(20), Ok(true));
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(session.target_shops.is_empty());
    }

    #[test]
    fn test_session_round_trip_wire_format() {
        let mut session = ChallengeSession::new(42, Utc::now());
        session.target_shops.add(3).unwrap();

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["status"], "ACTIVE");
        assert_eq!(json["target_shops"], serde_json::json!([3]));
    }
}
