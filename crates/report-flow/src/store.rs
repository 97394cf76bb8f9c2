//! Collaborators the flow calls out to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::draft::ReportRecord;
use crate::error::Result;
use crate::preference::UserPreference;

/// Read access to a user's completed reports.
#[async_trait]
pub trait ReportHistory: Send + Sync {
    /// Up to `limit` reports of `user_id` with a timestamp at or before
    /// `cursor`, newest first.
    async fn load(
        &self,
        user_id: &str,
        cursor: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ReportRecord>>;
}

/// Read/write access to per-user preferences.
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// The stored preference, or an empty one for a new user.
    async fn read(&self, user_id: &str) -> Result<UserPreference>;

    /// Replace the stored preference.
    async fn write(&self, user_id: &str, preference: &UserPreference) -> Result<()>;
}

/// Resolves stored media keys to URLs the Messenger client can fetch.
pub trait MediaUrls: Send + Sync {
    fn url_for(&self, key: &str) -> String;
}

/// A report history with nothing in it.
#[derive(Debug, Clone, Default)]
pub struct EmptyHistory;

#[async_trait]
impl ReportHistory for EmptyHistory {
    async fn load(
        &self,
        _user_id: &str,
        _cursor: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<ReportRecord>> {
        Ok(Vec::new())
    }
}

/// Media URLs formed by joining a base URL and the key.
#[derive(Debug, Clone)]
pub struct PrefixMediaUrls {
    base_url: String,
}

impl PrefixMediaUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl MediaUrls for PrefixMediaUrls {
    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }
}
