//! Immutable, versioned rule sets.
//!
//! A snapshot is validated once at construction and never mutated, so the
//! serving layer can hand out `Arc<RuleSnapshot>` clones to any number of
//! concurrent readers and swap in a replacement atomically.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::RoutingError;
use crate::rule::{Rule, RuleId};

/// An immutable set of rules plus a monotonically increasing generation.
///
/// Invariants enforced at construction: at least one rule, unique rule ids,
/// and catch-all rules ordered after specific rules.
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    rules: Vec<Rule>,
    generation: u64,
    loaded_at: DateTime<Utc>,
}

impl RuleSnapshot {
    /// Validate and seal a rule set.
    pub fn new(mut rules: Vec<Rule>, generation: u64) -> Result<Self, RoutingError> {
        if rules.is_empty() {
            return Err(RoutingError::EmptySnapshot);
        }

        let mut seen = HashSet::with_capacity(rules.len());
        for rule in &rules {
            if !seen.insert(rule.id.clone()) {
                return Err(RoutingError::DuplicateRuleId(rule.id.as_str().to_string()));
            }
        }

        // Stable sort: specific rules keep their load order and are always
        // evaluated before catch-alls.
        rules.sort_by_key(Rule::is_catch_all);

        Ok(Self {
            rules,
            generation,
            loaded_at: Utc::now(),
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: &RuleId) -> Option<&Rule> {
        self.rules.iter().find(|rule| &rule.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{FieldMatcher, Predicate};
    use crate::rule::Priority;

    fn specific(id: &str, event_type: &str) -> Rule {
        Rule::builder(id)
            .predicate(Predicate {
                event_type: FieldMatcher::exact(event_type),
                ..Predicate::default()
            })
            .sop(format!("sop-{}", id), format!("SOP {}", id))
            .priority(Priority::High)
            .build()
    }

    fn catch_all(id: &str) -> Rule {
        Rule::builder(id).sop("sop-default", "Default SOP").build()
    }

    #[test]
    fn rejects_empty_rule_set() {
        assert_eq!(
            RuleSnapshot::new(Vec::new(), 1).unwrap_err(),
            RoutingError::EmptySnapshot
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = RuleSnapshot::new(
            vec![specific("r1", "Fall"), specific("r1", "Fire")],
            1,
        )
        .unwrap_err();
        assert_eq!(err, RoutingError::DuplicateRuleId("r1".to_string()));
    }

    #[test]
    fn catch_alls_sort_after_specific_rules() {
        let snapshot = RuleSnapshot::new(
            vec![
                catch_all("default"),
                specific("fall", "Person Falling Down"),
                specific("fire", "Smoke or Fire"),
            ],
            3,
        )
        .unwrap();

        let ids: Vec<&str> = snapshot.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["fall", "fire", "default"]);
        assert_eq!(snapshot.generation(), 3);
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn lookup_by_id() {
        let snapshot =
            RuleSnapshot::new(vec![specific("fall", "Person Falling Down")], 1).unwrap();
        assert!(snapshot.get(&RuleId::new("fall")).is_some());
        assert!(snapshot.get(&RuleId::new("missing")).is_none());
    }
}
