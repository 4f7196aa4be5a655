// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge session service.
//!
//! Handles the session lifecycle:
//! 1. Lazily create an `ACTIVE` session when the first target is added
//! 2. Add/remove target shops (max 3, no duplicates)
//! 3. Check in by proximity, awarding points and removing the matched shop
//! 4. Mark the session `COMPLETED` when check-in clears the last target
//!
//! Every read-modify-write runs inside a store transaction, so the rules are
//! checked against the state that is actually committed over. The per-user
//! lock keeps requests within one process from contending for it.

use crate::db::{ChallengeStore, ChangeSet, UserState};
use crate::error::{AppError, Result, RuleViolation};
use crate::geodistance::Coordinates;
use crate::models::{ChallengeSession, Shop};
use crate::services::{lock_user, ShopDirectory, UserLocks};
use std::sync::Arc;

/// A check-in succeeds strictly inside this radius.
pub const CHECKIN_RADIUS_KM: f64 = 0.5;

/// Points awarded per successful check-in.
pub const CHECKIN_REWARD_POINTS: u64 = 15;

/// Result of comparing a position against the target shops.
#[derive(Debug, PartialEq)]
pub enum Proximity<'a> {
    /// First shop (in list order) within the check-in radius.
    InRange { shop: &'a Shop, distance_km: f64 },
    /// Nothing in range; the closest located shop.
    OutOfRange { nearest: &'a Shop, distance_km: f64 },
    /// No shop had a usable location.
    NoLocation,
}

/// Evaluate a check-in position against target shops in list order.
///
/// The first shop within [`CHECKIN_RADIUS_KM`] wins, even if a later one is
/// closer. Shops without a location never match and are never nearest.
pub fn evaluate_proximity<'a>(position: &Coordinates, shops: &[&'a Shop]) -> Proximity<'a> {
    let mut nearest: Option<&'a Shop> = None;
    let mut min_distance = f64::INFINITY;

    for &shop in shops {
        let distance_km = shop.distance_from(position);

        if distance_km < CHECKIN_RADIUS_KM {
            return Proximity::InRange { shop, distance_km };
        }

        if distance_km < min_distance {
            min_distance = distance_km;
            nearest = Some(shop);
        }
    }

    match nearest {
        Some(nearest) => Proximity::OutOfRange {
            nearest,
            distance_km: min_distance,
        },
        None => Proximity::NoLocation,
    }
}

/// Outcome of a check-in attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckinOutcome {
    /// Checked in; points awarded and the shop removed from the targets.
    CheckedIn {
        shop_id: u64,
        shop_name: String,
        points_awarded: u64,
        new_balance: u64,
        challenge_completed: bool,
    },
    /// Not close enough to any target. The session is unchanged.
    NotYetArrived {
        nearest_shop: String,
        distance_km: f64,
    },
    /// None of the targets could be located.
    NoShopData,
}

/// A current target with its distance from the caller.
#[derive(Debug, Clone)]
pub struct TargetView {
    pub shop: Shop,
    /// 0 when no position was given; infinite when the shop has no location
    pub distance_km: f64,
}

/// Result of removing a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Target removed; this many remain.
    Removed { remaining: usize },
    /// Last target removed; the session was deleted.
    SessionClosed,
}

/// Challenge session manager.
#[derive(Clone)]
pub struct ChallengeService {
    db: Arc<dyn ChallengeStore>,
    directory: Arc<ShopDirectory>,
    locks: UserLocks,
}

impl ChallengeService {
    pub fn new(db: Arc<dyn ChallengeStore>, directory: Arc<ShopDirectory>, locks: UserLocks) -> Self {
        Self {
            db,
            directory,
            locks,
        }
    }

    /// Return the user's active session, creating an empty one if needed.
    pub async fn get_or_create_active_session(&self, user_id: u64) -> Result<ChallengeSession> {
        let _guard = lock_user(&self.locks, user_id).await;

        let mut result = None;
        let mut created = false;
        self.db
            .transact(user_id, &mut |state: UserState| -> Result<ChangeSet> {
                let (session, changes) = match state.active_session {
                    Some(session) => (session, ChangeSet::new()),
                    None => {
                        let session = ChallengeSession::new(user_id, chrono::Utc::now());
                        (session.clone(), ChangeSet::new().put_session(session))
                    }
                };
                created = !changes.is_empty();
                result = Some(session);
                Ok(changes)
            })
            .await?;

        let session = result.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("session transaction returned nothing"))
        })?;
        if created {
            tracing::info!(user_id, session_id = %session.session_id, "Challenge session created");
        }
        Ok(session)
    }

    /// Add a target shop. Returns the number of targets afterwards.
    ///
    /// Creates the session on first use.
    pub async fn add_target(&self, user_id: u64, shop_id: u64) -> Result<usize> {
        let _guard = lock_user(&self.locks, user_id).await;

        let mut count = 0;
        self.db
            .transact(user_id, &mut |state: UserState| -> Result<ChangeSet> {
                let mut session = state
                    .active_session
                    .unwrap_or_else(|| ChallengeSession::new(user_id, chrono::Utc::now()));
                count = session.target_shops.add(shop_id)?;
                Ok(ChangeSet::new().put_session(session))
            })
            .await?;

        tracing::info!(user_id, shop_id, count, "Challenge target added");
        Ok(count)
    }

    /// Remove a target shop, deleting the session if it was the last one.
    pub async fn remove_target(&self, user_id: u64, shop_id: u64) -> Result<RemoveOutcome> {
        let _guard = lock_user(&self.locks, user_id).await;

        let mut outcome = RemoveOutcome::SessionClosed;
        self.db
            .transact(user_id, &mut |state: UserState| -> Result<ChangeSet> {
                let mut session = state
                    .active_session
                    .ok_or(RuleViolation::NoActiveSession)?;
                let remaining = session.target_shops.remove(shop_id)?;

                if remaining == 0 {
                    outcome = RemoveOutcome::SessionClosed;
                    Ok(ChangeSet::new().delete_session(&session.session_id))
                } else {
                    outcome = RemoveOutcome::Removed { remaining };
                    Ok(ChangeSet::new().put_session(session))
                }
            })
            .await?;

        tracing::info!(user_id, shop_id, ?outcome, "Challenge target removed");
        Ok(outcome)
    }

    /// Check in at the caller's position.
    ///
    /// Only the in-range outcome writes anything: points are credited and
    /// the matched shop leaves the target list in the same commit.
    pub async fn checkin(&self, user_id: u64, position: Coordinates) -> Result<CheckinOutcome> {
        let _guard = lock_user(&self.locks, user_id).await;

        let mut outcome = CheckinOutcome::NoShopData;
        self.db
            .transact(user_id, &mut |state: UserState| -> Result<ChangeSet> {
                let mut session = state
                    .active_session
                    .ok_or(RuleViolation::NoActiveSession)?;
                let shops: Vec<&Shop> = session
                    .target_shops
                    .iter()
                    .filter_map(|id| self.directory.get_shop(id))
                    .collect();

                let (shop_id, shop_name) = match evaluate_proximity(&position, &shops) {
                    Proximity::InRange { shop, .. } => (shop.shop_id, shop.name.clone()),
                    Proximity::OutOfRange {
                        nearest,
                        distance_km,
                    } => {
                        outcome = CheckinOutcome::NotYetArrived {
                            nearest_shop: nearest.name.clone(),
                            distance_km,
                        };
                        return Ok(ChangeSet::new());
                    }
                    Proximity::NoLocation => {
                        outcome = CheckinOutcome::NoShopData;
                        return Ok(ChangeSet::new());
                    }
                };

                let mut user = state.user;
                let new_balance = user.credit(CHECKIN_REWARD_POINTS);
                let challenge_completed = session.complete_target(shop_id)?;

                outcome = CheckinOutcome::CheckedIn {
                    shop_id,
                    shop_name,
                    points_awarded: CHECKIN_REWARD_POINTS,
                    new_balance,
                    challenge_completed,
                };
                Ok(ChangeSet::new().put_user(user).put_session(session))
            })
            .await?;

        match &outcome {
            CheckinOutcome::CheckedIn {
                shop_id,
                new_balance,
                challenge_completed,
                ..
            } => tracing::info!(
                user_id,
                shop_id,
                new_balance,
                challenge_completed,
                "Check-in recorded"
            ),
            CheckinOutcome::NotYetArrived { distance_km, .. } => {
                tracing::info!(user_id, distance_km, "Check-in out of range")
            }
            CheckinOutcome::NoShopData => tracing::warn!(user_id, "No locatable targets"),
        }

        Ok(outcome)
    }

    /// Current targets with distances. `None` if there is no active session.
    pub async fn list_current(
        &self,
        user_id: u64,
        position: Option<Coordinates>,
    ) -> Result<Option<Vec<TargetView>>> {
        let Some(session) = self.db.get_active_session(user_id).await? else {
            return Ok(None);
        };

        let targets = session
            .target_shops
            .iter()
            .filter_map(|id| self.directory.get_shop(id))
            .map(|shop| TargetView {
                distance_km: position.map_or(0.0, |p| shop.distance_from(&p)),
                shop: shop.clone(),
            })
            .collect();

        Ok(Some(targets))
    }
}
