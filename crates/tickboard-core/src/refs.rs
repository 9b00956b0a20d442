//! Ticket-id references embedded in free text.

use std::collections::HashSet;

use regex::Regex;
use serde::Serialize;

use crate::error::Result;
use crate::model::Ticket;

/// A matched reference: byte offsets into the scanned text plus the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefSpan {
    pub start: usize,
    pub end: usize,
    pub id: String,
}

/// Compiled reference pattern. Matching holds no state between calls, so one
/// matcher can be shared across threads and texts.
#[derive(Debug, Clone)]
pub struct RefMatcher {
    pattern: Regex,
}

impl RefMatcher {
    /// # Errors
    ///
    /// Returns [`crate::error::Error::InvalidPattern`] when `pattern` does
    /// not compile.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Every id-shaped substring of `text`, in order of appearance.
    #[must_use]
    pub fn find_spans(&self, text: &str) -> Vec<RefSpan> {
        self.pattern
            .find_iter(text)
            .map(|m| RefSpan {
                start: m.start(),
                end: m.end(),
                id: m.as_str().to_string(),
            })
            .collect()
    }

    /// Spans whose id names a ticket in `tickets`.
    #[must_use]
    pub fn find_known(&self, text: &str, tickets: &[Ticket]) -> Vec<RefSpan> {
        let known: HashSet<&str> = tickets.iter().map(|t| t.id.as_str()).collect();
        self.find_spans(text)
            .into_iter()
            .filter(|span| known.contains(span.id.as_str()))
            .collect()
    }
}
