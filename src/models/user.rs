//! User model and points ledger.

use crate::error::RuleViolation;
use serde::{Deserialize, Serialize};

/// User record stored in Firestore.
///
/// Identity and profile live with the auth provider; this document only
/// carries what the challenge engine needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID (also used as document ID)
    pub user_id: u64,
    /// Display name, if known
    #[serde(default)]
    pub name: Option<String>,
    /// Loyalty points balance (absent on legacy records)
    #[serde(default)]
    pub points: Option<u64>,
}

impl User {
    /// A user with no recorded balance.
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            name: None,
            points: None,
        }
    }

    /// Current balance, treating an absent value as zero.
    pub fn balance(&self) -> u64 {
        self.points.unwrap_or(0)
    }

    /// Add points and return the new balance.
    pub fn credit(&mut self, amount: u64) -> u64 {
        let balance = self.balance().saturating_add(amount);
        self.points = Some(balance);
        balance
    }

    /// Remove points and return the new balance.
    ///
    /// Fails without modifying the balance if it would go negative.
    pub fn debit(&mut self, amount: u64) -> Result<u64, RuleViolation> {
        let balance = self.balance();
        if balance < amount {
            return Err(RuleViolation::InsufficientPoints {
                balance,
                required: amount,
            });
        }
        self.points = Some(balance - amount);
        Ok(balance - amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_from_absent_balance() {
        let mut user = User::new(1);
        assert_eq!(user.balance(), 0);
        assert_eq!(user.credit(15), 15);
        assert_eq!(user.points, Some(15));
    }

    #[test]
    fn test_debit_exact_balance() {
        let mut user = User::new(1);
        user.credit(50);
        assert_eq!(user.debit(50), Ok(0));
        assert_eq!(user.balance(), 0);
    }

    #[test]
    fn test_debit_insufficient_leaves_balance() {
        let mut user = User::new(1);
        user.credit(30);

        let err = user.debit(50).unwrap_err();

        assert_eq!(
            err,
            RuleViolation::InsufficientPoints {
                balance: 30,
                required: 50
            }
        );
        assert_eq!(user.balance(), 30);
    }

    #[test]
    fn test_debit_with_absent_balance() {
        let mut user = User::new(1);
        assert!(user.debit(1).is_err());
        assert_eq!(user.points, None);
    }

    #[test]
    fn test_legacy_record_without_points() {
        let user: User = serde_json::from_str(r#"{"user_id": 7}"#).unwrap();
        assert_eq!(user.balance(), 0);
    }
}
