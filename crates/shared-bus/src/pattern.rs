//! # Topic Patterns
//!
//! Topics are dot-separated (`<domain>.<action>`). A subscription pattern is
//! either an exact topic or ends in a single-segment wildcard:
//!
//! | Pattern | Matches | Does not match |
//! |---------|---------|----------------|
//! | `icode.created` | `icode.created` | `icode.deleted` |
//! | `icode.*` | `icode.created` | `icode`, `icode.a.b`, `node.created` |
//! | `*` | `icode` | `icode.created` |
//!
//! Patterns are compiled once when the subscription is registered.

use std::fmt;

use crate::subscriber::SubscriptionError;

/// Segment separator.
pub const SEPARATOR: char = '.';

/// Single-segment wildcard.
pub const WILDCARD: &str = "*";

/// A compiled subscription pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPattern {
    source: String,
    /// Literal leading segments.
    literals: Vec<String>,
    /// Whether one trailing wildcard segment follows the literals.
    trailing_wildcard: bool,
}

impl TopicPattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// `SubscriptionError::InvalidPattern` if the pattern is empty, has an
    /// empty segment, or uses a wildcard anywhere but the last segment.
    pub fn parse(pattern: &str) -> Result<Self, SubscriptionError> {
        let invalid = |reason: &str| SubscriptionError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if pattern.is_empty() {
            return Err(invalid("empty pattern"));
        }

        let segments: Vec<&str> = pattern.split(SEPARATOR).collect();
        let last = segments.len() - 1;
        let mut literals = Vec::with_capacity(segments.len());
        let mut trailing_wildcard = false;

        for (i, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(invalid("empty segment"));
            }
            if *segment == WILDCARD {
                if i != last {
                    return Err(invalid("wildcard must be the last segment"));
                }
                trailing_wildcard = true;
            } else if segment.contains('*') {
                return Err(invalid("wildcard must be a whole segment"));
            } else {
                literals.push((*segment).to_string());
            }
        }

        Ok(Self {
            source: pattern.to_string(),
            literals,
            trailing_wildcard,
        })
    }

    /// Whether `topic` is routed to this pattern.
    #[must_use]
    pub fn matches(&self, topic: &str) -> bool {
        let mut segments = topic.split(SEPARATOR);

        for literal in &self.literals {
            match segments.next() {
                Some(segment) if segment == literal => {}
                _ => return false,
            }
        }

        match (self.trailing_wildcard, segments.next()) {
            (false, None) => true,
            (true, Some(segment)) => !segment.is_empty() && segments.next().is_none(),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
