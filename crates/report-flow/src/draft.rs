//! The report being composed, and the record it becomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A report under construction.
///
/// Lives across turns only as a persisted blob. Never stored on its own:
/// it is either turned into a [`ReportRecord`] or thrown away.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,

    #[serde(default)]
    tags: Vec<String>,

    #[serde(default)]
    images: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
}

impl DraftReport {
    /// An empty draft: no tags, no images, no target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a draft from its persisted JSON form. Missing fields default
    /// to empty; an unreadable blob yields an empty draft.
    pub fn from_blob(blob: &serde_json::Value) -> Self {
        serde_json::from_value(blob.clone()).unwrap_or_default()
    }

    pub fn to_blob(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    pub fn bind_user(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
    }

    /// Append images in order. Duplicates are kept.
    pub fn add_images(&mut self, images: impl IntoIterator<Item = String>) {
        self.images.extend(images);
    }

    /// Append a tag unless the exact same tag is already present.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if tag.is_empty() || self.tags.contains(&tag) {
            return;
        }
        self.tags.push(tag);
    }

    /// Set the report target, replacing any previous one.
    pub fn add_target(&mut self, target: impl Into<String>) {
        let target = target.into();
        if target.is_empty() {
            return;
        }
        self.target = Some(target);
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Snapshot the draft for persistence.
    pub fn to_record(&self, timestamp: DateTime<Utc>) -> ReportRecord {
        ReportRecord {
            user_id: self.user_id.clone().unwrap_or_default(),
            tags: self.tags.clone(),
            images: self.images.clone(),
            target: self.target.clone(),
            timestamp,
        }
    }
}

/// A completed report. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub user_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Media store keys of the attached images.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub target: Option<String>,
    pub timestamp: DateTime<Utc>,
}
