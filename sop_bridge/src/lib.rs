//! # SOP Bridge
//!
//! Serving layer around the `sop_engine` matching core: the shared rule
//! cache with atomic snapshot swap, the single-event router, the concurrent
//! order-preserving batch pipeline, rule loading/refresh and the wire-level
//! response types.

pub mod api_types;
pub mod batch;
pub mod cache;
pub mod loader;
pub mod refresh;
pub mod resolver;
pub mod router;

pub use api_types::{
    BatchEntry, BatchResponse, CacheStatsResponse, DecisionResponse, ErrorResponse,
    RefreshResponse,
};

pub use batch::{BatchConfig, BatchOutcome, BatchProcessor, BatchSummary};

pub use cache::{CacheStats, RuleCache};

pub use loader::{
    convert_stored_rule, convert_stored_rules, RuleLoader, StaticRuleLoader, StoredRule,
};

pub use refresh::{RefreshScheduler, RefreshService, RefreshStats, SchedulerConfig};

pub use resolver::{AssignmentResolver, ResolverConfig, RoutingDecision};

pub use router::{EventRouter, RouterConfig};
