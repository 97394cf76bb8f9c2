//! Most-recently-used tags and targets of a user.

use serde::{Deserialize, Serialize};

use crate::draft::ReportRecord;

/// Per-user suggestion lists, most recently used first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreference {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub targets: Vec<String>,
}

impl UserPreference {
    pub fn new(tags: Vec<String>, targets: Vec<String>) -> Self {
        Self { tags, targets }
    }

    /// Fold a completed report into the preference.
    ///
    /// The report's tags move to the front in report order, followed by the
    /// remaining old tags. The report's target, if any, moves to the front of
    /// the target list.
    pub fn merge_report(&mut self, report: &ReportRecord) {
        self.tags = move_to_front(&self.tags, &report.tags);
        if let Some(target) = &report.target {
            self.targets = move_to_front(&self.targets, std::slice::from_ref(target));
        }
    }
}

fn move_to_front(existing: &[String], recent: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + recent.len());
    for value in recent.iter().chain(existing) {
        if !merged.contains(value) {
            merged.push(value.clone());
        }
    }
    merged
}
