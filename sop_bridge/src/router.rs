//! Single-event routing pipeline: normalize, match against the current
//! snapshot, resolve the assignment.

use std::sync::Arc;

use log::debug;
use sop_engine::{Event, MatchConfig, MatchEngine, RawEvent, RoutingError};

use crate::cache::RuleCache;
use crate::resolver::{AssignmentResolver, ResolverConfig, RoutingDecision};

/// Combined knobs for the routing pipeline.
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    pub matching: MatchConfig,
    pub resolver: ResolverConfig,
}

/// Routes events end to end. Cheap to clone; the cache is shared.
#[derive(Clone)]
pub struct EventRouter {
    cache: Arc<RuleCache>,
    engine: MatchEngine,
    resolver: AssignmentResolver,
}

impl EventRouter {
    pub fn new(cache: Arc<RuleCache>, config: RouterConfig) -> Self {
        Self {
            cache,
            engine: MatchEngine::new(config.matching),
            resolver: AssignmentResolver::new(config.resolver),
        }
    }

    pub fn cache(&self) -> &Arc<RuleCache> {
        &self.cache
    }

    /// Normalize and route one raw event.
    pub fn route(&self, raw: RawEvent) -> Result<RoutingDecision, RoutingError> {
        let event = Event::normalize(raw)?;
        Ok(self.route_normalized(&event))
    }

    /// Route an already-normalized event against the current snapshot.
    ///
    /// The snapshot is pinned once per call, so the whole match runs against
    /// one generation even if a refresh lands mid-flight.
    pub fn route_normalized(&self, event: &Event) -> RoutingDecision {
        let snapshot = self.cache.current_snapshot();
        let best = self.engine.best_match(event, &snapshot);
        self.cache.record_lookup(best.is_some());

        let decision = self.resolver.resolve(event, best);
        debug!(
            "routed event {} to '{}' (priority {}, confidence {:.3}, generation {})",
            decision.event_id,
            decision.matched_sop,
            decision.priority,
            decision.confidence,
            snapshot.generation()
        );
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sop_engine::{FieldMatcher, Predicate, Priority, Rule, RuleId, RuleSnapshot};

    fn router() -> EventRouter {
        let rules = vec![
            Rule::builder("fall-1")
                .predicate(Predicate {
                    event_type: FieldMatcher::exact("Person Falling Down"),
                    location: FieldMatcher::contains("Lobby"),
                    ..Predicate::default()
                })
                .sop("sop-fall", "Fall Response SOP")
                .priority(Priority::High)
                .agent("MedicalAgent")
                .agent("SecurityAgent")
                .build(),
            Rule::builder("default")
                .sop("sop-default", "Default SOP")
                .priority(Priority::Medium)
                .build(),
        ];
        let cache = Arc::new(RuleCache::new(RuleSnapshot::new(rules, 1).unwrap()));
        EventRouter::new(cache, RouterConfig::default())
    }

    fn fall_event() -> RawEvent {
        serde_json::from_value(serde_json::json!({
            "id": "evt_fall001",
            "source": "computer_vision",
            "type": "Person Falling Down",
            "location": "Building A - Lobby",
            "confidence": 0.95
        }))
        .unwrap()
    }

    #[test]
    fn routes_a_fall_event_end_to_end() {
        let decision = router().route(fall_event()).unwrap();

        assert_eq!(decision.event_id, "evt_fall001");
        assert_eq!(decision.matched_sop, "Fall Response SOP");
        assert_eq!(decision.matched_rule_id, Some(RuleId::new("fall-1")));
        assert_eq!(decision.priority, Priority::High);
        assert!((decision.confidence - 0.893).abs() < 1e-9);
        assert_eq!(
            decision.assigned_agents,
            vec!["MedicalAgent".to_string(), "SecurityAgent".to_string()]
        );
        assert_eq!(decision.response_time_estimate, "15ms");
    }

    #[test]
    fn unmatched_event_lands_on_catch_all() {
        let raw = RawEvent {
            event_type: Some("Loitering".to_string()),
            location: Some("Garage".to_string()),
            ..RawEvent::default()
        };
        let decision = router().route(raw).unwrap();
        assert_eq!(decision.matched_sop, "Default SOP");
        assert_eq!(decision.matched_rule_id, Some(RuleId::new("default")));
        assert!(decision.confidence <= 0.5);
    }

    #[test]
    fn malformed_event_is_rejected() {
        let raw = RawEvent {
            source: Some("manual".to_string()),
            ..RawEvent::default()
        };
        let err = router().route(raw).unwrap_err();
        assert!(matches!(err, RoutingError::MalformedEvent { .. }));
    }

    #[test]
    fn lookups_update_cache_stats() {
        let router = router();
        router.route(fall_event()).unwrap();
        let stats = router.cache().stats();
        assert_eq!(stats.total_lookups, 1);
        assert_eq!(stats.cache_hits, 1);
    }
}
