//! Serialized response shapes for the routing API surface.
//!
//! These mirror the internal types but pin the wire contract: field names,
//! optionality and formatting stay stable here even when internals move.

use serde::Serialize;
use sop_engine::RoutingError;

use crate::batch::BatchOutcome;
use crate::cache::CacheStats;
use crate::refresh::RefreshStats;
use crate::resolver::RoutingDecision;

// ============================================================================
// Routing responses
// ============================================================================

/// One routing decision on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionResponse {
    pub event_id: String,
    pub priority: String,
    pub matched_sop: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_sop_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule_id: Option<String>,
    pub confidence: f64,
    pub assigned_agents: Vec<String>,
    pub response_time_estimate: String,
}

impl From<RoutingDecision> for DecisionResponse {
    fn from(decision: RoutingDecision) -> Self {
        Self {
            event_id: decision.event_id,
            priority: decision.priority.as_str().to_string(),
            matched_sop: decision.matched_sop,
            matched_sop_id: decision.matched_sop_id,
            matched_rule_id: decision.matched_rule_id.map(|id| id.as_str().to_string()),
            confidence: decision.confidence,
            assigned_agents: decision.assigned_agents,
            response_time_estimate: decision.response_time_estimate,
        }
    }
}

/// One slot of a batch response: a decision or an error descriptor, at the
/// same index the event was submitted.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Decision(DecisionResponse),
    Error { index: usize, error: &'static str, message: String },
}

/// Whole-batch response.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub processed_count: usize,
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub results: Vec<BatchEntry>,
}

impl From<BatchOutcome> for BatchResponse {
    fn from(outcome: BatchOutcome) -> Self {
        let results = outcome
            .results
            .into_iter()
            .enumerate()
            .map(|(index, result)| match result {
                Ok(decision) => BatchEntry::Decision(decision.into()),
                Err(err) => BatchEntry::Error {
                    index,
                    error: err.code(),
                    message: err.to_string(),
                },
            })
            .collect();

        Self {
            processed_count: outcome.summary.processed,
            succeeded_count: outcome.summary.succeeded,
            failed_count: outcome.summary.failed,
            results,
        }
    }
}

/// Error descriptor for single-event endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl From<&RoutingError> for ErrorResponse {
    fn from(err: &RoutingError) -> Self {
        Self {
            error: err.code(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Operational responses
// ============================================================================

/// Cache statistics on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub snapshot_size: usize,
    pub generation: u64,
    pub total_lookups: u64,
    pub cache_hits: u64,
    pub hit_rate: f64,
    pub total_refreshes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_since_last_refresh: Option<u64>,
}

impl From<CacheStats> for CacheStatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            snapshot_size: stats.snapshot_size,
            generation: stats.generation,
            total_lookups: stats.total_lookups,
            cache_hits: stats.cache_hits,
            hit_rate: stats.hit_rate,
            total_refreshes: stats.total_refreshes,
            seconds_since_last_refresh: stats.since_last_refresh.map(|d| d.as_secs()),
        }
    }
}

/// Manual refresh result on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    pub rules_loaded: usize,
    pub generation: u64,
    pub duration_ms: u64,
    /// RFC 3339 timestamp of the refresh.
    pub refreshed_at: String,
}

impl From<RefreshStats> for RefreshResponse {
    fn from(stats: RefreshStats) -> Self {
        Self {
            rules_loaded: stats.rules_loaded,
            generation: stats.generation,
            duration_ms: stats.duration_ms,
            refreshed_at: stats.refreshed_at.to_rfc3339(),
        }
    }
}
