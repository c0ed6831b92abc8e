//! # SOP Routing Engine
//!
//! Rule model and matching engine for routing security/monitoring events to
//! Standard Operating Procedures (SOPs). This crate holds the pure, shareable
//! pieces: rules and their predicates, event normalization, immutable rule
//! snapshots and the scoring/matching algorithm. The serving layer (cache,
//! batch pipeline, refresh) lives in the `sop-bridge` crate.

pub mod error;
pub mod event;
pub mod matcher;
pub mod predicate;
pub mod rule;
pub mod snapshot;

pub use error::RoutingError;

pub use event::{Event, RawEvent};

pub use matcher::{
    MatchConfig,    // Scoring knobs (specificity factors, catch-all ceiling)
    MatchEngine,    // Evaluates an event against a snapshot
    SopMatch,       // One (SOP, confidence) candidate
};

pub use predicate::{FieldMatcher, Predicate, TimeWindow};

pub use rule::{Priority, Rule, RuleBuilder, RuleId};

pub use snapshot::RuleSnapshot;
