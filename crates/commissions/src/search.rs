//! Member lookup by partial username, email, or full name.

use affiliate_core::{MemberDirectory, MemberId, MemberRecord};
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Shortest trimmed query that reaches the store.
pub const MIN_QUERY_CHARS: usize = 2;

/// Most matches returned for one query.
pub const MAX_RESULTS: i64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberMatch {
    pub id: MemberId,
    pub username: String,
    pub email: Option<String>,
    pub fullname: Option<String>,
    pub level: i32,
}

impl From<MemberRecord> for MemberMatch {
    fn from(record: MemberRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: record.email,
            fullname: record.fullname,
            level: record.level,
        }
    }
}

pub struct MemberSearch {
    members: Arc<dyn MemberDirectory>,
}

impl MemberSearch {
    #[must_use]
    pub fn new(members: Arc<dyn MemberDirectory>) -> Self {
        Self { members }
    }

    /// Up to [`MAX_RESULTS`] members matching `query`, by id.
    ///
    /// A query shorter than [`MIN_QUERY_CHARS`] once trimmed matches nothing
    /// and issues no lookup.
    ///
    /// # Errors
    /// Returns an error if the member lookup fails.
    pub async fn search(&self, query: &str) -> Result<Vec<MemberMatch>> {
        let term = query.trim();
        if term.chars().count() < MIN_QUERY_CHARS {
            debug!(chars = term.chars().count(), "Search query too short");
            return Ok(Vec::new());
        }

        let records = self.members.search_members(term, MAX_RESULTS).await?;
        debug!(matches = records.len(), "Searched members");
        Ok(records.into_iter().map(MemberMatch::from).collect())
    }
}
