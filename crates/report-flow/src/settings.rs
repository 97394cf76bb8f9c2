//! Tunables for reply rendering.

use chrono::{FixedOffset, Offset, Utc};

use crate::reply::DEFAULT_SUGGESTIONS;

/// Default number of reports per carousel page.
pub const DEFAULT_PAGE_LIMIT: usize = 5;

/// Messenger's generic template holds at most this many elements.
pub const MAX_PAGE_LIMIT: usize = 10;

/// Default local zone for report timestamps (UTC+8).
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// Rendering settings shared by every turn.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    /// Reports per carousel page.
    pub page_limit: usize,
    /// Preference suggestions per reply.
    pub suggestion_size: usize,
    /// Zone report timestamps are shown in.
    pub local_offset: FixedOffset,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            suggestion_size: DEFAULT_SUGGESTIONS,
            local_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

impl FlowSettings {
    /// Set the page limit, clamped to what a carousel can show.
    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = limit.clamp(1, MAX_PAGE_LIMIT);
        self
    }

    pub fn with_local_offset(mut self, offset: FixedOffset) -> Self {
        self.local_offset = offset;
        self
    }

    pub fn with_suggestion_size(mut self, size: usize) -> Self {
        self.suggestion_size = size;
        self
    }
}
