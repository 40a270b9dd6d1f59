//! Bounded log of player-facing notifications.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use starfreight_logic::galaxy::Severity;

/// Default number of notifications kept.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Position in the stream, counting from 1. Keeps increasing after old
    /// entries are dropped.
    pub sequence: u64,
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

/// Ring buffer of the most recent notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLog {
    entries: VecDeque<Notification>,
    capacity: usize,
    total: u64,
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_NOTIFICATION_CAPACITY)
    }
}

impl NotificationLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_NOTIFICATION_CAPACITY)),
            capacity: capacity.max(1),
            total: 0,
        }
    }

    pub fn push(&mut self, severity: Severity, title: &str, message: &str) {
        self.total += 1;
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Notification {
            sequence: self.total,
            severity,
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.entries.back()
    }

    /// Entries newer than `sequence`.
    pub fn since(&self, sequence: u64) -> impl Iterator<Item = &Notification> {
        self.entries.iter().filter(move |n| n.sequence > sequence)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|n| n.severity == severity).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Notifications ever pushed, including dropped ones.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
