//! Matching engine: evaluates a normalized event against a rule snapshot
//! and scores every matching rule.
//!
//! Scoring combines the event's detector confidence with the matched rule's
//! specificity, so an exact type-and-location rule beats a catch-all even
//! when the detector is equally sure about both.

use log::warn;

use crate::event::Event;
use crate::rule::{Priority, Rule, RuleId};
use crate::snapshot::RuleSnapshot;

// ============================================================================
// Configuration
// ============================================================================

/// Scoring knobs for the matching engine.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Specificity factor at zero non-wildcard matchers.
    pub specificity_base: f64,
    /// Factor increment per non-wildcard matcher.
    pub specificity_step: f64,
    /// Upper bound on catch-all rule confidence, keeping fallbacks below
    /// any reasonably confident specific match.
    pub catch_all_ceiling: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            specificity_base: 0.7,
            specificity_step: 0.12,
            catch_all_ceiling: 0.5,
        }
    }
}

// ============================================================================
// Match result
// ============================================================================

/// One candidate produced by matching: the SOP a rule routes to, with the
/// rule's routing context and a scored confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct SopMatch {
    pub sop_id: String,
    pub sop_name: String,
    pub matched_rule_id: RuleId,
    /// Scored confidence in [0.0, 1.0].
    pub confidence: f64,
    pub priority: Priority,
    pub agents: Vec<String>,
    pub weight: f64,
}

// ============================================================================
// Engine
// ============================================================================

/// Evaluates events against snapshots. Stateless apart from config; cheap
/// to clone and share.
#[derive(Debug, Clone, Default)]
pub struct MatchEngine {
    config: MatchConfig,
}

impl MatchEngine {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Evaluate `event` against every rule in `snapshot`.
    ///
    /// Returns all matches ordered best-first: confidence descending, then
    /// rule weight descending, then rule id ascending. Rules with invalid
    /// predicates are skipped with a warning; one bad rule never poisons
    /// the rest of the snapshot.
    pub fn match_event(&self, event: &Event, snapshot: &RuleSnapshot) -> Vec<SopMatch> {
        let mut matches = Vec::new();

        for rule in snapshot.rules() {
            if let Err(reason) = rule.predicate.validate() {
                warn!(
                    "skipping invalid rule {} in generation {}: {}",
                    rule.id,
                    snapshot.generation(),
                    reason
                );
                continue;
            }
            if !rule.predicate.evaluate(event) {
                continue;
            }
            matches.push(self.score(event, rule));
        }

        matches.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(b.weight.total_cmp(&a.weight))
                .then_with(|| a.matched_rule_id.cmp(&b.matched_rule_id))
        });
        matches
    }

    /// Best single match, if any.
    pub fn best_match(&self, event: &Event, snapshot: &RuleSnapshot) -> Option<SopMatch> {
        self.match_event(event, snapshot).into_iter().next()
    }

    fn score(&self, event: &Event, rule: &Rule) -> SopMatch {
        let specificity = rule.predicate.specificity();
        let factor =
            self.config.specificity_base + self.config.specificity_step * specificity as f64;
        let mut confidence = (event.raw_confidence * factor).clamp(0.0, 1.0);
        if rule.is_catch_all() {
            confidence = confidence.min(self.config.catch_all_ceiling);
        }

        SopMatch {
            sop_id: rule.sop_id.clone(),
            sop_name: rule.sop_name.clone(),
            matched_rule_id: rule.id.clone(),
            confidence,
            priority: rule.base_priority,
            agents: rule.agents.clone(),
            weight: rule.weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RawEvent;
    use crate::predicate::{FieldMatcher, Predicate};

    fn event(event_type: &str, location: &str, confidence: f64) -> Event {
        Event::normalize(RawEvent {
            source: Some("computer_vision".to_string()),
            event_type: Some(event_type.to_string()),
            location: Some(location.to_string()),
            confidence: Some(confidence),
            ..RawEvent::default()
        })
        .unwrap()
    }

    fn fall_rule() -> Rule {
        Rule::builder("fall-1")
            .predicate(Predicate {
                event_type: FieldMatcher::exact("Person Falling Down"),
                location: FieldMatcher::contains("Lobby"),
                ..Predicate::default()
            })
            .sop("sop-fall", "Fall Response SOP")
            .priority(Priority::High)
            .agent("MedicalAgent")
            .build()
    }

    fn default_rule() -> Rule {
        Rule::builder("default")
            .sop("sop-default", "Default SOP")
            .priority(Priority::Medium)
            .build()
    }

    #[test]
    fn two_matcher_rule_at_95_percent_scores_about_0_9() {
        let snapshot = RuleSnapshot::new(vec![fall_rule()], 1).unwrap();
        let engine = MatchEngine::default();

        let matches =
            engine.match_event(&event("Person Falling Down", "Building A - Lobby", 0.95), &snapshot);
        assert_eq!(matches.len(), 1);
        // 0.95 * (0.7 + 2 * 0.12) = 0.893
        assert!((matches[0].confidence - 0.893).abs() < 1e-9);
        assert_eq!(matches[0].sop_name, "Fall Response SOP");
        assert_eq!(matches[0].priority, Priority::High);
        assert_eq!(matches[0].agents, vec!["MedicalAgent".to_string()]);
    }

    #[test]
    fn specific_rule_outranks_catch_all() {
        let snapshot = RuleSnapshot::new(vec![default_rule(), fall_rule()], 1).unwrap();
        let engine = MatchEngine::default();

        let matches =
            engine.match_event(&event("Person Falling Down", "Lobby", 0.95), &snapshot);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].matched_rule_id, RuleId::new("fall-1"));
        assert_eq!(matches[1].matched_rule_id, RuleId::new("default"));
        // Catch-all confidence is capped even at full detector confidence.
        assert!(matches[1].confidence <= 0.5);
    }

    #[test]
    fn non_matching_event_falls_through_to_catch_all_only() {
        let snapshot = RuleSnapshot::new(vec![default_rule(), fall_rule()], 1).unwrap();
        let engine = MatchEngine::default();

        let matches = engine.match_event(&event("Loitering", "Garage", 0.8), &snapshot);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matched_rule_id, RuleId::new("default"));
    }

    #[test]
    fn confidence_is_clamped_to_one() {
        let maximal = Rule::builder("max")
            .predicate(Predicate {
                source: FieldMatcher::exact("computer_vision"),
                event_type: FieldMatcher::exact("Person Falling Down"),
                location: FieldMatcher::contains("Lobby"),
                min_confidence: Some(0.5),
                ..Predicate::default()
            })
            .sop("sop-fall", "Fall Response SOP")
            .build();
        let snapshot = RuleSnapshot::new(vec![maximal], 1).unwrap();

        let matches = MatchEngine::default()
            .match_event(&event("Person Falling Down", "Lobby", 1.0), &snapshot);
        // 1.0 * (0.7 + 4 * 0.12) = 1.18, clamped.
        assert_eq!(matches[0].confidence, 1.0);
    }

    #[test]
    fn equal_confidence_breaks_ties_by_weight_then_id() {
        let rule = |id: &str, weight: f64| {
            Rule::builder(id)
                .predicate(Predicate {
                    event_type: FieldMatcher::exact("Loitering"),
                    ..Predicate::default()
                })
                .sop(format!("sop-{}", id), format!("SOP {}", id))
                .weight(weight)
                .build()
        };
        let snapshot = RuleSnapshot::new(
            vec![rule("b", 1.0), rule("a", 1.0), rule("c", 5.0)],
            1,
        )
        .unwrap();

        let matches =
            MatchEngine::default().match_event(&event("Loitering", "Lobby", 0.8), &snapshot);
        let ids: Vec<&str> = matches.iter().map(|m| m.matched_rule_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn invalid_rules_are_skipped_not_fatal() {
        let broken = Rule::builder("broken")
            .predicate(Predicate {
                event_type: FieldMatcher::exact(""),
                ..Predicate::default()
            })
            .sop("sop-broken", "Broken SOP")
            .build();
        let snapshot = RuleSnapshot::new(vec![broken, fall_rule()], 1).unwrap();

        let matches = MatchEngine::default()
            .match_event(&event("Person Falling Down", "Lobby", 0.9), &snapshot);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matched_rule_id, RuleId::new("fall-1"));
    }

    #[test]
    fn best_match_returns_top_candidate() {
        let snapshot = RuleSnapshot::new(vec![default_rule(), fall_rule()], 1).unwrap();
        let engine = MatchEngine::default();

        let best = engine
            .best_match(&event("Person Falling Down", "Lobby", 0.9), &snapshot)
            .unwrap();
        assert_eq!(best.matched_rule_id, RuleId::new("fall-1"));

        let none_specific = engine
            .best_match(&event("Loitering", "Garage", 0.9), &snapshot)
            .unwrap();
        assert_eq!(none_specific.matched_rule_id, RuleId::new("default"));
    }
}
