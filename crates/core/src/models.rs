//! Domain records shared by storage backends and the commission engine.
//!
//! Monetary values use `rust_decimal::Decimal`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier of a member in the referral forest.
pub type MemberId = i64;

/// Account status counted as active in network statistics.
pub const ACTIVE_STATUS: &str = "active";

/// A member profile as exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: MemberId,
    pub username: String,
    pub fullname: Option<String>,
    pub email: Option<String>,
    /// Member who referred this one; `None` for roots of the forest.
    pub referrer_id: Option<MemberId>,
    pub status: Option<String>,
    /// Rank tier (`ginto_level`); zero when unset.
    #[serde(default)]
    pub level: i32,
    pub created_at: Option<DateTime<Utc>>,
}

impl MemberRecord {
    /// Creates a minimal record with only the identity fields set.
    pub fn new(id: MemberId, username: impl Into<String>, referrer_id: Option<MemberId>) -> Self {
        Self {
            id,
            username: username.into(),
            fullname: None,
            email: None,
            referrer_id,
            status: None,
            level: 0,
            created_at: None,
        }
    }

    /// Whether the account status is `active`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case(ACTIVE_STATUS))
    }

    /// Full name when present, otherwise the username.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.fullname
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// Number of members holding one rank tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCount {
    pub level: i32,
    pub count: i64,
}

/// Member head counts across the whole membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberCensus {
    pub total_users: i64,
    pub active_users: i64,
    /// One entry per rank tier in use, ascending.
    pub level_distribution: Vec<LevelCount>,
}

/// One edge of the referral forest discovered during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Referral {
    pub member_id: MemberId,
    pub referrer_id: MemberId,
}

/// A completed transaction row returned by drill-down, joined with the owner's username.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub user_id: MemberId,
    pub username: String,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// Order status. Only [`TransactionStatus::Completed`] counts as revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl TransactionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a stored status string. Unknown values yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "refunded" => Some(Self::Refunded),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_revenue(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Status of an entry in the commission payout ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Pending,
    Paid,
}

impl LedgerStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn transaction_status_round_trips_through_str() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Completed,
            TransactionStatus::Failed,
            TransactionStatus::Refunded,
            TransactionStatus::Cancelled,
        ] {
            assert_eq!(TransactionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(
            TransactionStatus::parse(" Completed "),
            Some(TransactionStatus::Completed)
        );
        assert_eq!(TransactionStatus::parse("settled"), None);
    }

    #[test]
    fn only_completed_is_revenue() {
        assert!(TransactionStatus::Completed.is_revenue());
        assert!(!TransactionStatus::Pending.is_revenue());
        assert!(!TransactionStatus::Refunded.is_revenue());
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut member = MemberRecord::new(7, "alice", None);
        assert_eq!(member.display_name(), "alice");

        member.fullname = Some("   ".to_string());
        assert_eq!(member.display_name(), "alice");

        member.fullname = Some("Alice Reyes".to_string());
        assert_eq!(member.display_name(), "Alice Reyes");
    }

    #[test]
    fn active_status_is_case_insensitive() {
        let mut member = MemberRecord::new(3, "carol", None);
        assert!(!member.is_active());

        member.status = Some("Active".to_string());
        assert!(member.is_active());

        member.status = Some("suspended".to_string());
        assert!(!member.is_active());
    }

    #[test]
    fn transaction_record_serializes_amount_as_number() {
        let record = TransactionRecord {
            id: 1,
            user_id: 2,
            username: "bob".to_string(),
            amount: dec!(100.50),
            status: TransactionStatus::Completed,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["amount"], serde_json::json!(100.5));
        assert_eq!(json["status"], "completed");
    }
}
