//! Rule sources and the stored-rule format.
//!
//! Rules live externally (a database or config service) in a flat row
//! format; [`StoredRule`] mirrors that row and converts into the engine's
//! [`Rule`] model. The [`RuleLoader`] trait abstracts the source so refresh
//! code and tests share one path.

use async_trait::async_trait;
use log::warn;
use serde::Deserialize;
use sop_engine::{FieldMatcher, Predicate, Priority, Rule, RoutingError, TimeWindow};

// ============================================================================
// Loader trait
// ============================================================================

/// Source of the active rule set.
#[async_trait]
pub trait RuleLoader: Send + Sync {
    /// Fetch every currently active rule. A failure here must leave the
    /// caller's serving snapshot untouched.
    async fn load_active_rules(&self) -> Result<Vec<Rule>, RoutingError>;
}

/// Fixed in-memory rule source, for bootstrap and tests.
pub struct StaticRuleLoader {
    rules: Vec<Rule>,
}

impl StaticRuleLoader {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Build from stored rows, skipping unconvertible ones with a warning.
    pub fn from_stored(stored: Vec<StoredRule>) -> Self {
        let (rules, _rejected) = convert_stored_rules(stored);
        Self { rules }
    }
}

#[async_trait]
impl RuleLoader for StaticRuleLoader {
    async fn load_active_rules(&self) -> Result<Vec<Rule>, RoutingError> {
        Ok(self.rules.clone())
    }
}

// ============================================================================
// Stored format
// ============================================================================

/// One rule row as persisted by the rule store.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredRule {
    pub id: String,
    pub sop_id: String,
    pub sop_name: String,
    /// Matcher kind for `rule_value` against the event type:
    /// `"exact"`, `"keyword"` (substring) or `"any"`.
    pub rule_type: String,
    #[serde(default)]
    pub rule_value: String,
    /// Exact source filter; empty means any source.
    #[serde(default)]
    pub source: String,
    /// Substring location filter; empty means any location.
    #[serde(default)]
    pub location_pattern: String,
    #[serde(default)]
    pub min_confidence: Option<f64>,
    /// Hour-of-day window `(start, end)`, end exclusive, wrapping allowed.
    #[serde(default)]
    pub active_hours: Option<(u8, u8)>,
    pub priority: Priority,
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub weight: f64,
}

/// Convert one stored row into an engine rule.
pub fn convert_stored_rule(stored: StoredRule) -> Result<Rule, RoutingError> {
    fn invalid(rule_id: &str, reason: String) -> RoutingError {
        RoutingError::InvalidRule {
            rule_id: rule_id.to_string(),
            reason,
        }
    }

    let event_type = match stored.rule_type.as_str() {
        "exact" => {
            if stored.rule_value.trim().is_empty() {
                return Err(invalid(&stored.id, "exact rule has an empty rule_value".to_string()));
            }
            FieldMatcher::exact(stored.rule_value.clone())
        }
        "keyword" => {
            if stored.rule_value.trim().is_empty() {
                return Err(invalid(&stored.id, "keyword rule has an empty rule_value".to_string()));
            }
            FieldMatcher::contains(stored.rule_value.clone())
        }
        "any" => FieldMatcher::Wildcard,
        other => {
            return Err(invalid(&stored.id, format!("unknown rule_type '{}'", other)));
        }
    };

    let source = if stored.source.trim().is_empty() {
        FieldMatcher::Wildcard
    } else {
        FieldMatcher::exact(stored.source.clone())
    };
    let location = if stored.location_pattern.trim().is_empty() {
        FieldMatcher::Wildcard
    } else {
        FieldMatcher::contains(stored.location_pattern.clone())
    };

    let predicate = Predicate {
        source,
        event_type,
        location,
        min_confidence: stored.min_confidence,
        time_window: stored.active_hours.map(|(start, end)| TimeWindow::new(start, end)),
    };
    if let Err(reason) = predicate.validate() {
        return Err(invalid(&stored.id, reason));
    }

    Ok(Rule::builder(stored.id)
        .predicate(predicate)
        .sop(stored.sop_id, stored.sop_name)
        .priority(stored.priority)
        .agents(stored.agents)
        .weight(stored.weight)
        .build())
}

/// Convert a full row set. Bad rows are dropped and reported, never fatal:
/// one corrupt row must not block a refresh of the remaining rules.
pub fn convert_stored_rules(stored: Vec<StoredRule>) -> (Vec<Rule>, Vec<RoutingError>) {
    let mut rules = Vec::with_capacity(stored.len());
    let mut rejected = Vec::new();
    for row in stored {
        match convert_stored_rule(row) {
            Ok(rule) => rules.push(rule),
            Err(err) => {
                warn!("dropping stored rule: {}", err);
                rejected.push(err);
            }
        }
    }
    (rules, rejected)
}
