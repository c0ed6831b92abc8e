//! Assignment resolution: turns the best match (or the absence of one) into
//! a final routing decision with priority, agents and a response target.

use serde::Serialize;
use sop_engine::{Event, Priority, RuleId, SopMatch};

// ============================================================================
// Decision
// ============================================================================

/// Final routing outcome for one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub event_id: String,
    pub priority: Priority,
    /// SOP the event was routed to; the configured default when nothing
    /// matched.
    pub matched_sop: String,
    pub matched_sop_id: Option<String>,
    pub matched_rule_id: Option<RuleId>,
    pub confidence: f64,
    /// Deduplicated, order-preserving agent list; never empty.
    pub assigned_agents: Vec<String>,
    /// Human-readable target, e.g. `"15ms"`.
    pub response_time_estimate: String,
}

// ============================================================================
// Resolver
// ============================================================================

/// Fallback and escalation policy applied after matching.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// SOP name used when no rule matched.
    pub default_sop_name: String,
    /// SOP id reported for the fallback, when the deployment has one.
    pub default_sop_id: Option<String>,
    /// Agent assigned when the winning rule names none.
    pub default_agent: String,
    /// Confidence reported for fallback decisions.
    pub fallback_confidence: f64,
    /// Response targets in milliseconds, indexed Low..=Critical.
    pub response_targets_ms: [u64; 4],
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_sop_name: "Default SOP".to_string(),
            default_sop_id: None,
            default_agent: "DocumentationAgent".to_string(),
            fallback_confidence: 0.75,
            response_targets_ms: [40, 25, 15, 10],
        }
    }
}

/// Resolves matches into decisions.
#[derive(Debug, Clone, Default)]
pub struct AssignmentResolver {
    config: ResolverConfig,
}

impl AssignmentResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Build the final decision for `event` from the winning match, if any.
    ///
    /// With a match, the rule's base priority is escalated one level when
    /// the event carries a stronger severity hint. Without one, the event
    /// goes to the default SOP at `Medium` with the fallback confidence;
    /// hints never escalate the fallback path.
    pub fn resolve(&self, event: &Event, best: Option<SopMatch>) -> RoutingDecision {
        match best {
            Some(matched) => self.resolve_matched(event, matched),
            None => self.resolve_fallback(event),
        }
    }

    fn resolve_matched(&self, event: &Event, matched: SopMatch) -> RoutingDecision {
        let priority = match event.severity_hint {
            Some(hint) if hint > matched.priority => matched.priority.escalate(),
            _ => matched.priority,
        };

        let mut agents = dedup_preserving_order(matched.agents);
        if agents.is_empty() {
            agents.push(self.config.default_agent.clone());
        }

        RoutingDecision {
            event_id: event.event_id.clone(),
            priority,
            matched_sop: matched.sop_name,
            matched_sop_id: Some(matched.sop_id),
            matched_rule_id: Some(matched.matched_rule_id),
            confidence: matched.confidence,
            assigned_agents: agents,
            response_time_estimate: self.response_target(priority),
        }
    }

    fn resolve_fallback(&self, event: &Event) -> RoutingDecision {
        let priority = Priority::Medium;
        RoutingDecision {
            event_id: event.event_id.clone(),
            priority,
            matched_sop: self.config.default_sop_name.clone(),
            matched_sop_id: self.config.default_sop_id.clone(),
            matched_rule_id: None,
            confidence: self.config.fallback_confidence,
            assigned_agents: vec![self.config.default_agent.clone()],
            response_time_estimate: self.response_target(priority),
        }
    }

    fn response_target(&self, priority: Priority) -> String {
        let ms = self.config.response_targets_ms[priority as usize];
        format!("{}ms", ms)
    }
}

fn dedup_preserving_order(agents: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    agents
        .into_iter()
        .filter(|agent| seen.insert(agent.clone()))
        .collect()
}
