//! Failure taxonomy for the routing engine.
//!
//! Per-event failures stay per-item (a malformed event never aborts a
//! batch), and rule-load failures never touch the serving snapshot. Every
//! variant carries enough context (event or rule id) to be actionable.

use thiserror::Error;

/// Typed failures produced by the routing engine and its serving layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    /// Normalization could not produce a valid event.
    #[error("malformed event: {reason}")]
    MalformedEvent { reason: String },

    /// A stored rule could not be parsed into a usable predicate.
    #[error("invalid rule '{rule_id}': {reason}")]
    InvalidRule { rule_id: String, reason: String },

    /// The rule source could not be reached or returned garbage.
    #[error("rule source unavailable: {0}")]
    RuleSourceUnavailable(String),

    /// Another refresh is already in flight.
    #[error("rule refresh already in progress")]
    RefreshInProgress,

    /// Attempted to build or install a snapshot with zero rules.
    #[error("snapshot contains no rules")]
    EmptySnapshot,

    /// Two rules in one snapshot share an id.
    #[error("duplicate rule id in snapshot: '{0}'")]
    DuplicateRuleId(String),

    /// The batch deadline expired before this item was processed.
    #[error("batch deadline exceeded before the event was processed")]
    DeadlineExceeded,
}

impl RoutingError {
    /// Stable machine-readable code for API error descriptors.
    pub fn code(&self) -> &'static str {
        match self {
            RoutingError::MalformedEvent { .. } => "MalformedEvent",
            RoutingError::InvalidRule { .. } => "InvalidRule",
            RoutingError::RuleSourceUnavailable(_) => "RuleSourceUnavailable",
            RoutingError::RefreshInProgress => "RefreshInProgress",
            RoutingError::EmptySnapshot => "EmptySnapshot",
            RoutingError::DuplicateRuleId(_) => "DuplicateRuleId",
            RoutingError::DeadlineExceeded => "DeadlineExceeded",
        }
    }
}
