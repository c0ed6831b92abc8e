//! Rule refresh: rebuilds the serving snapshot from the rule source.
//!
//! At most one refresh runs at a time; a failed load or an invalid rule set
//! leaves the previous snapshot serving. The scheduler drives periodic
//! refreshes in the background.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{error, info};
use sop_engine::{RoutingError, RuleSnapshot};
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::cache::RuleCache;
use crate::loader::RuleLoader;

// ============================================================================
// Refresh service
// ============================================================================

/// Outcome of one successful refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshStats {
    pub rules_loaded: usize,
    pub generation: u64,
    pub duration_ms: u64,
    pub refreshed_at: DateTime<Utc>,
}

/// Loads rules from a [`RuleLoader`] and installs them into a [`RuleCache`].
pub struct RefreshService {
    cache: Arc<RuleCache>,
    loader: Arc<dyn RuleLoader>,
}

impl RefreshService {
    pub fn new(cache: Arc<RuleCache>, loader: Arc<dyn RuleLoader>) -> Self {
        Self { cache, loader }
    }

    pub fn cache(&self) -> &Arc<RuleCache> {
        &self.cache
    }

    /// Run one refresh cycle: load, validate, install.
    ///
    /// Fails with `RefreshInProgress` when another refresh holds the slot.
    /// On any failure the serving snapshot is left untouched.
    pub async fn refresh(&self) -> Result<RefreshStats, RoutingError> {
        let _guard = self.cache.try_begin_refresh()?;
        let started = Instant::now();

        let rules = self.loader.load_active_rules().await?;
        let generation = self.cache.generation() + 1;
        let snapshot = RuleSnapshot::new(rules, generation)?;

        let stats = RefreshStats {
            rules_loaded: snapshot.len(),
            generation,
            duration_ms: started.elapsed().as_millis() as u64,
            refreshed_at: Utc::now(),
        };
        self.cache.install(snapshot);
        info!(
            "rule refresh complete: {} rules at generation {} in {}ms",
            stats.rules_loaded, stats.generation, stats.duration_ms
        );
        Ok(stats)
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Periodic refresh policy.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub refresh_interval: Duration,
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(300),
            enabled: true,
        }
    }
}

/// Drives [`RefreshService::refresh`] on a fixed interval.
pub struct RefreshScheduler {
    service: Arc<RefreshService>,
    config: SchedulerConfig,
}

impl RefreshScheduler {
    pub fn new(service: Arc<RefreshService>, config: SchedulerConfig) -> Self {
        Self { service, config }
    }

    /// Spawn the background refresh loop. Returns the task handle; abort it
    /// to stop the scheduler.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if !self.config.enabled {
                info!("rule refresh scheduler disabled");
                return;
            }
            info!(
                "rule refresh scheduler started (every {:?})",
                self.config.refresh_interval
            );

            let mut ticker = interval(self.config.refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; the cache was already
            // seeded at startup, so skip it.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match self.service.refresh().await {
                    Ok(stats) => info!(
                        "scheduled refresh installed generation {} ({} rules)",
                        stats.generation, stats.rules_loaded
                    ),
                    Err(RoutingError::RefreshInProgress) => {
                        info!("scheduled refresh skipped: another refresh in flight")
                    }
                    Err(err) => error!("scheduled refresh failed: {}", err),
                }
            }
        })
    }
}
