//! Rule predicates: conjunctions of field-level matchers evaluated against
//! normalized events.
//!
//! The matcher set is closed and known at compile time (exact, substring,
//! numeric threshold, time window, wildcard), so it is modeled as tagged
//! variants with a uniform evaluate contract rather than dynamic dispatch.

use serde::{Deserialize, Serialize};

use crate::event::Event;

// ============================================================================
// Field matchers
// ============================================================================

/// Matcher over one string field of an event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldMatcher {
    /// Always matches.
    #[default]
    Wildcard,
    /// Case-insensitive exact match.
    Exact { value: String },
    /// Case-insensitive substring match.
    Contains { pattern: String },
}

impl FieldMatcher {
    pub fn exact(value: impl Into<String>) -> Self {
        FieldMatcher::Exact { value: value.into() }
    }

    pub fn contains(pattern: impl Into<String>) -> Self {
        FieldMatcher::Contains { pattern: pattern.into() }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, FieldMatcher::Wildcard)
    }

    /// Evaluate against a field value. Wildcards match anything, including
    /// an empty field.
    pub fn matches(&self, field: &str) -> bool {
        match self {
            FieldMatcher::Wildcard => true,
            FieldMatcher::Exact { value } => field.eq_ignore_ascii_case(value),
            FieldMatcher::Contains { pattern } => {
                field.to_ascii_lowercase().contains(&pattern.to_ascii_lowercase())
            }
        }
    }

    fn validate(&self, field_name: &str) -> Result<(), String> {
        match self {
            FieldMatcher::Wildcard => Ok(()),
            FieldMatcher::Exact { value } if value.trim().is_empty() => {
                Err(format!("empty exact value for field '{}'", field_name))
            }
            FieldMatcher::Contains { pattern } if pattern.trim().is_empty() => {
                Err(format!("empty pattern for field '{}'", field_name))
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Time window
// ============================================================================

/// Hour-of-day window, `[start_hour, end_hour)`. A window whose start is
/// after its end wraps past midnight (e.g. 22 → 6 covers the night shift).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl TimeWindow {
    pub fn new(start_hour: u8, end_hour: u8) -> Self {
        Self { start_hour, end_hour }
    }

    pub fn contains(&self, hour: u32) -> bool {
        let (start, end) = (u32::from(self.start_hour), u32::from(self.end_hour));
        if start < end {
            hour >= start && hour < end
        } else {
            // Wrap-around window.
            hour >= start || hour < end
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.start_hour > 23 || self.end_hour > 23 {
            return Err(format!(
                "time window hours out of range: {}..{}",
                self.start_hour, self.end_hour
            ));
        }
        if self.start_hour == self.end_hour {
            return Err("time window is empty (start == end)".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Predicate
// ============================================================================

/// Conjunction of field-level matchers: a rule matches an event only when
/// every matcher succeeds. A predicate with no non-wildcard matcher is a
/// catch-all.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Predicate {
    #[serde(default)]
    pub source: FieldMatcher,
    #[serde(default)]
    pub event_type: FieldMatcher,
    #[serde(default)]
    pub location: FieldMatcher,
    /// Minimum raw event confidence, in [0, 1].
    #[serde(default)]
    pub min_confidence: Option<f64>,
    /// Hour-of-day window the event timestamp must fall into.
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
}

impl Predicate {
    /// True when every matcher in the conjunction succeeds.
    pub fn evaluate(&self, event: &Event) -> bool {
        if !self.source.matches(&event.source) {
            return false;
        }
        if !self.event_type.matches(&event.event_type) {
            return false;
        }
        if !self.location.matches(&event.location) {
            return false;
        }
        if let Some(min) = self.min_confidence {
            if event.raw_confidence < min {
                return false;
            }
        }
        if let Some(window) = self.time_window {
            if !window.contains(event.hour_of_day()) {
                return false;
            }
        }
        true
    }

    /// Number of non-wildcard matchers. Drives confidence scoring: more
    /// specific rules score higher.
    pub fn specificity(&self) -> usize {
        let mut count = 0;
        if !self.source.is_wildcard() {
            count += 1;
        }
        if !self.event_type.is_wildcard() {
            count += 1;
        }
        if !self.location.is_wildcard() {
            count += 1;
        }
        if self.min_confidence.is_some() {
            count += 1;
        }
        if self.time_window.is_some() {
            count += 1;
        }
        count
    }

    pub fn is_catch_all(&self) -> bool {
        self.specificity() == 0
    }

    /// Structural validation. A failing predicate makes its rule invalid;
    /// the matching engine skips such rules instead of aborting the match.
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate("source")?;
        self.event_type.validate("event_type")?;
        self.location.validate("location")?;
        if let Some(min) = self.min_confidence {
            if !(0.0..=1.0).contains(&min) {
                return Err(format!("min_confidence {} outside [0, 1]", min));
            }
        }
        if let Some(window) = &self.time_window {
            window.validate()?;
        }
        Ok(())
    }
}
