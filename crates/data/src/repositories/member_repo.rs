//! Member repository.
//!
//! Reads the `users` table: referral edges for tree traversal, profiles
//! for display, member search, and head counts.

use affiliate_core::{
    LevelCount, MemberCensus, MemberDirectory, MemberId, MemberRecord, Referral, ReferralGraph,
    ACTIVE_STATUS,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use super::distinct_ids;

/// Repository for member lookups.
#[derive(Debug, Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Direct referrals of every member in `referrers`, in one query.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn query_referrals(&self, referrers: &[MemberId]) -> Result<Vec<Referral>> {
        let referrers = distinct_ids(referrers);
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r"
            SELECT id, referrer_id
            FROM users
            WHERE referrer_id = ANY($1)
            ",
        )
        .bind(&referrers)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query referrals")?;

        Ok(rows
            .into_iter()
            .map(|(member_id, referrer_id)| Referral {
                member_id,
                referrer_id,
            })
            .collect())
    }

    /// Gets a single member profile.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn get_by_id(&self, id: MemberId) -> Result<Option<MemberRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, username, fullname, email, referrer_id, status,
                   COALESCE(ginto_level, 0) AS ginto_level, created_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query member")?;

        row.as_ref().map(member_from_row).transpose()
    }

    /// Gets member profiles for a set of identifiers.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn get_many(&self, ids: &[MemberId]) -> Result<Vec<MemberRecord>> {
        let ids = distinct_ids(ids);
        let rows = sqlx::query(
            r"
            SELECT id, username, fullname, email, referrer_id, status,
                   COALESCE(ginto_level, 0) AS ginto_level, created_at
            FROM users
            WHERE id = ANY($1)
            ORDER BY created_at ASC NULLS LAST, id ASC
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query members")?;

        rows.iter().map(member_from_row).collect()
    }

    /// Case-insensitive substring match on username, email, and full name.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn search(&self, term: &str, limit: i64) -> Result<Vec<MemberRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, username, fullname, email, referrer_id, status,
                   COALESCE(ginto_level, 0) AS ginto_level, created_at
            FROM users
            WHERE username ILIKE $1 OR email ILIKE $1 OR fullname ILIKE $1
            ORDER BY id ASC
            LIMIT $2
            ",
        )
        .bind(like_pattern(term))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to search members")?;

        rows.iter().map(member_from_row).collect()
    }

    /// Total and active head counts plus the rank tier distribution.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn count_members(&self) -> Result<MemberCensus> {
        let (total_users, active_users): (i64, i64) = sqlx::query_as(
            r"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE LOWER(status) = $1)
            FROM users
            ",
        )
        .bind(ACTIVE_STATUS)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count members")?;

        let levels: Vec<(i32, i64)> = sqlx::query_as(
            r"
            SELECT COALESCE(ginto_level, 0) AS level, COUNT(*)
            FROM users
            GROUP BY 1
            ORDER BY 1 ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to query level distribution")?;

        Ok(MemberCensus {
            total_users,
            active_users,
            level_distribution: levels
                .into_iter()
                .map(|(level, count)| LevelCount { level, count })
                .collect(),
        })
    }
}

/// `%term%` with LIKE wildcards in `term` matched literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn member_from_row(row: &PgRow) -> Result<MemberRecord> {
    Ok(MemberRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        fullname: row.try_get("fullname")?,
        email: row.try_get("email")?,
        referrer_id: row.try_get("referrer_id")?,
        status: row.try_get("status")?,
        level: row.try_get("ginto_level")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ReferralGraph for MemberRepository {
    async fn referrals_of(&self, referrers: &[MemberId]) -> Result<Vec<Referral>> {
        self.query_referrals(referrers).await
    }
}

#[async_trait]
impl MemberDirectory for MemberRepository {
    async fn find_member(&self, id: MemberId) -> Result<Option<MemberRecord>> {
        self.get_by_id(id).await
    }

    async fn find_members(&self, ids: &[MemberId]) -> Result<Vec<MemberRecord>> {
        self.get_many(ids).await
    }

    async fn search_members(&self, term: &str, limit: i64) -> Result<Vec<MemberRecord>> {
        self.search(term, limit).await
    }

    async fn census(&self) -> Result<MemberCensus> {
        self.count_members().await
    }
}
