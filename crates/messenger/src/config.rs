//! Configuration types for the Graph API client.

/// Graph API base used when none is configured.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com/v2.8";

/// Configuration for calling the Graph API on behalf of a page.
#[derive(Clone)]
pub struct GraphConfig {
    /// Base URL of the Graph API, including the version segment.
    pub base_url: String,
    /// Page access token sent with every Send API call.
    pub page_access_token: String,
}

impl GraphConfig {
    /// Create a new configuration.
    pub fn new(base_url: impl Into<String>, page_access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            page_access_token: page_access_token.into(),
        }
    }

    /// Create a configuration against the default Graph API base.
    pub fn with_token(page_access_token: impl Into<String>) -> Self {
        Self::new(DEFAULT_GRAPH_URL, page_access_token)
    }

    /// Get the Send API endpoint URL.
    pub fn messages_url(&self) -> String {
        format!("{}/me/messages", self.base_url.trim_end_matches('/'))
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::new(DEFAULT_GRAPH_URL, "")
    }
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("base_url", &self.base_url)
            .field("page_access_token", &"<redacted>")
            .finish()
    }
}
