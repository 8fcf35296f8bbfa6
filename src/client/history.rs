use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub const HISTORY_LIMIT: usize = 10;
/// Characters kept in the display form of a history entry.
pub const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHistoryEntry {
    pub query: String,
    pub full_query: String,
    pub timestamp: String,
}

/// The last executed queries, newest first.
#[derive(Debug, Clone, Default)]
pub struct QueryHistory {
    entries: VecDeque<QueryHistoryEntry>,
}

impl QueryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, query: &str) {
        self.push_at(query, Local::now());
    }

    pub fn push_at(&mut self, query: &str, at: DateTime<Local>) {
        self.entries.push_front(QueryHistoryEntry {
            query: preview(query),
            full_query: query.to_string(),
            timestamp: at.format("%-I:%M:%S %p").to_string(),
        });
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryHistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&QueryHistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn preview(query: &str) -> String {
    let mut chars = query.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
