//! Rule model: a predicate-to-SOP mapping with priority, responder agents
//! and a tie-break weight.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::predicate::Predicate;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique, stable rule identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Priority
// ============================================================================

/// Priority ladder for routed events.
///
/// Variant order matters: `Ord` is used for severity-hint escalation
/// comparisons (`Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// One step up the ladder; saturates at `Critical`.
    pub fn escalate(self) -> Self {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High | Priority::Critical => Priority::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        }
    }

    /// Parse a free-form severity hint ("High", "critical", ...).
    /// Unknown values are not an error; the hint is simply absent.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim();
        for candidate in [
            Priority::Low,
            Priority::Medium,
            Priority::High,
            Priority::Critical,
        ] {
            if hint.eq_ignore_ascii_case(candidate.as_str()) {
                return Some(candidate);
            }
        }
        None
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Rule
// ============================================================================

/// One routing criterion: when `predicate` matches an event, the event is
/// routed to `sop_id` with `base_priority` and `agents` notified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub predicate: Predicate,
    pub sop_id: String,
    pub sop_name: String,
    pub base_priority: Priority,
    /// Ordered responder agents to notify when this rule fires.
    #[serde(default)]
    pub agents: Vec<String>,
    /// Tie-break among rules matching with equal confidence (higher wins).
    #[serde(default)]
    pub weight: f64,
}

impl Rule {
    pub fn builder(id: impl Into<String>) -> RuleBuilder {
        RuleBuilder::new(id)
    }

    /// A rule whose predicate matches any event; sorts last in a snapshot.
    pub fn is_catch_all(&self) -> bool {
        self.predicate.is_catch_all()
    }
}

/// Builder for [`Rule`].
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    id: RuleId,
    predicate: Predicate,
    sop_id: String,
    sop_name: String,
    base_priority: Priority,
    agents: Vec<String>,
    weight: f64,
}

impl RuleBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: RuleId::new(id),
            predicate: Predicate::default(),
            sop_id: String::new(),
            sop_name: String::new(),
            base_priority: Priority::Medium,
            agents: Vec::new(),
            weight: 0.0,
        }
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn sop(mut self, sop_id: impl Into<String>, sop_name: impl Into<String>) -> Self {
        self.sop_id = sop_id.into();
        self.sop_name = sop_name.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.base_priority = priority;
        self
    }

    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agents.push(agent.into());
        self
    }

    pub fn agents(mut self, agents: impl IntoIterator<Item = String>) -> Self {
        self.agents.extend(agents);
        self
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn build(self) -> Rule {
        Rule {
            id: self.id,
            predicate: self.predicate,
            sop_id: self.sop_id,
            sop_name: self.sop_name,
            base_priority: self.base_priority,
            agents: self.agents,
            weight: self.weight,
        }
    }
}
