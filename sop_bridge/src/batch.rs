//! Concurrent batch routing with order preservation.
//!
//! Events in a batch are routed concurrently under a bounded permit count,
//! and results land in slots addressed by submission index, so the response
//! order always mirrors the request order regardless of completion order.
//! One bad event fails its own slot, never the batch.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use sop_engine::{RawEvent, RoutingError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::resolver::RoutingDecision;
use crate::router::EventRouter;

// ============================================================================
// Configuration and results
// ============================================================================

/// Knobs for batch processing.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum events routed concurrently.
    pub max_concurrency: usize,
    /// Overall wall-clock budget for the whole batch. Items still pending
    /// when it expires fail with `DeadlineExceeded`.
    pub deadline: Option<Duration>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            deadline: None,
        }
    }
}

/// Aggregate counts over one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Per-item results in submission order, plus the summary.
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<Result<RoutingDecision, RoutingError>>,
    pub summary: BatchSummary,
}

// ============================================================================
// Processor
// ============================================================================

/// Routes batches of raw events through a shared [`EventRouter`].
#[derive(Clone)]
pub struct BatchProcessor {
    router: EventRouter,
    config: BatchConfig,
}

impl BatchProcessor {
    pub fn new(router: EventRouter, config: BatchConfig) -> Self {
        Self { router, config }
    }

    /// Route every event in `events`, concurrently, preserving order.
    pub async fn process(&self, events: Vec<RawEvent>) -> BatchOutcome {
        let total = events.len();
        let mut slots: Vec<Option<Result<RoutingDecision, RoutingError>>> =
            (0..total).map(|_| None).collect();

        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, raw) in events.into_iter().enumerate() {
            let router = self.router.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                // Acquire fails only after the semaphore is closed on
                // deadline expiry.
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => router.route(raw),
                    Err(_) => Err(RoutingError::DeadlineExceeded),
                };
                (index, result)
            });
        }

        match self.config.deadline {
            Some(deadline) => {
                let drained =
                    tokio::time::timeout(deadline, drain(&mut tasks, &mut slots)).await;
                if drained.is_err() {
                    // Cut off items that have not started, then harvest the
                    // rest: tasks already past the permit finish routing and
                    // keep their results; tasks still waiting on a permit
                    // fail their own slot with DeadlineExceeded.
                    permits.close();
                    drain(&mut tasks, &mut slots).await;
                    let expired = slots
                        .iter()
                        .filter(|slot| {
                            matches!(slot, None | Some(Err(RoutingError::DeadlineExceeded)))
                        })
                        .count();
                    warn!(
                        "batch deadline of {:?} expired with {}/{} events unfinished",
                        deadline, expired, total
                    );
                }
            }
            None => drain(&mut tasks, &mut slots).await,
        }

        let results: Vec<Result<RoutingDecision, RoutingError>> = slots
            .into_iter()
            .map(|slot| slot.unwrap_or(Err(RoutingError::DeadlineExceeded)))
            .collect();

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let summary = BatchSummary {
            processed: total,
            succeeded,
            failed: total - succeeded,
        };
        info!(
            "batch complete: {} processed, {} succeeded, {} failed",
            summary.processed, summary.succeeded, summary.failed
        );

        BatchOutcome { results, summary }
    }
}

async fn drain(
    tasks: &mut JoinSet<(usize, Result<RoutingDecision, RoutingError>)>,
    slots: &mut [Option<Result<RoutingDecision, RoutingError>>],
) {
    while let Some(joined) = tasks.join_next().await {
        // A panicked task surfaces as a join error; its slot stays unfilled
        // and is reported as DeadlineExceeded.
        if let Ok((index, result)) = joined {
            slots[index] = Some(result);
        }
    }
}
