//! The user-visible activity log.
//!
//! Distinct from `tracing` diagnostics: these lines are what the operator
//! sees under the payment buttons ("Connected: D135-0042", "Reading card",
//! reader prompts, transaction outcomes).  Lines are only ever appended;
//! the whole log can be cleared by the user.

use chrono::{DateTime, Utc};

/// One timestamped activity line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    lines: Vec<LogLine>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` stamped with the current time.
    pub fn append(&mut self, message: impl Into<String>) {
        self.lines.push(LogLine {
            at: Utc::now(),
            message: message.into(),
        });
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    /// Message of the most recent line, if any.
    pub fn last_message(&self) -> Option<&str> {
        self.lines.last().map(|l| l.message.as_str())
    }
}
