//! One collection cycle: fetch from every source, validate, dedup, store,
//! distribute.

use std::collections::HashSet;
use std::time::Instant;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use secfeed_distributor::Distributor;
use secfeed_shared::{AppConfig, CuratedSnippet, CycleSummary, Resource};
use secfeed_sources::{SourceClient, normalize};
use secfeed_storage::Store;

// ---------------------------------------------------------------------------
// CollectPlan
// ---------------------------------------------------------------------------

/// What one cycle collects: the configured queries, scrape targets, and
/// locally authored snippets. Immutable for the collector's lifetime.
#[derive(Debug, Clone)]
pub struct CollectPlan {
    /// Search queries sent to every query-based source.
    pub queries: Vec<String>,
    /// Page URLs handed to every page-based source.
    pub scrape_targets: Vec<String>,
    /// Snippets injected into every cycle without a network fetch.
    pub curated: Vec<CuratedSnippet>,
}

impl CollectPlan {
    /// Build a plan from the application config.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            queries: config.collect.queries.clone(),
            scrape_targets: config.collect.scrape_targets.clone(),
            curated: config.curated.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// CycleObserver
// ---------------------------------------------------------------------------

/// Progress callback for reporting cycle status.
pub trait CycleObserver: Send + Sync {
    /// Called when the cycle enters a new phase.
    fn phase(&self, name: &str);
    /// Called after each source fetch with the candidate count it produced.
    fn source_fetched(&self, source: &str, target: &str, count: usize);
    /// Called when the cycle completes.
    fn done(&self, summary: &CycleSummary);
}

/// No-op observer for headless/test usage.
pub struct SilentObserver;

impl CycleObserver for SilentObserver {
    fn phase(&self, _name: &str) {}
    fn source_fetched(&self, _source: &str, _target: &str, _count: usize) {}
    fn done(&self, _summary: &CycleSummary) {}
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Runs collection cycles over a fixed set of sources, one store, and one
/// distributor.
pub struct Collector {
    plan: CollectPlan,
    query_clients: Vec<Box<dyn SourceClient>>,
    target_clients: Vec<Box<dyn SourceClient>>,
    store: Store,
    distributor: Distributor,
    /// Guards against overlapping cycles when triggers arrive faster than
    /// cycles finish.
    cycle_lock: Mutex<()>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Collector {
    /// Build a collector with no sources registered.
    pub fn new(plan: CollectPlan, store: Store, distributor: Distributor) -> Self {
        Self {
            plan,
            query_clients: Vec::new(),
            target_clients: Vec::new(),
            store,
            distributor,
            cycle_lock: Mutex::new(()),
            shutdown: None,
        }
    }

    /// Register a source fetched once per configured query.
    pub fn with_query_client(mut self, client: Box<dyn SourceClient>) -> Self {
        self.query_clients.push(client);
        self
    }

    /// Register a source fetched once per configured scrape target.
    pub fn with_target_client(mut self, client: Box<dyn SourceClient>) -> Self {
        self.target_clients.push(client);
        self
    }

    /// Observe a shutdown signal. Collection stops at the next fetch
    /// boundary after the signal flips to `true`; work already collected
    /// still flows through the rest of the cycle.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// The store this collector persists into.
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Run one full cycle. Never fails: every component-level failure is
    /// logged and absorbed, and the summary reports what actually happened.
    /// A trigger that arrives while a cycle is still running is skipped.
    #[instrument(skip_all)]
    pub async fn run_cycle(&self, observer: &dyn CycleObserver) -> CycleSummary {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            warn!("previous cycle still running, skipping this trigger");
            let summary = CycleSummary::skipped();
            observer.done(&summary);
            return summary;
        };

        let start = Instant::now();
        info!("starting collection cycle");

        observer.phase("Collecting");
        let candidates = self.collect(observer).await;
        let collected = candidates.len();

        observer.phase("Validating");
        let mut rejected = 0usize;
        let mut duplicates = 0usize;
        let mut seen = HashSet::new();
        let mut accepted: Vec<Resource> = Vec::new();
        for resource in candidates {
            if resource.kind.is_executable() && !secfeed_filter::is_safe(&resource.description) {
                rejected += 1;
                continue;
            }
            if !seen.insert(resource.fingerprint()) {
                debug!(title = %resource.title, "dropping within-cycle duplicate");
                duplicates += 1;
                continue;
            }
            accepted.push(resource);
        }

        observer.phase("Persisting");
        let mut stored = 0usize;
        let mut store_failures = 0usize;
        for resource in &accepted {
            match self.store.save(resource).await {
                Ok(_) => stored += 1,
                Err(e) => {
                    warn!(title = %resource.title, error = %e, "save failed, continuing cycle");
                    store_failures += 1;
                }
            }
        }

        // Resources whose save failed are still delivered; the cycle favors
        // reaching subscribers over strict store/sink consistency.
        observer.phase("Distributing");
        let mut delivered = 0usize;
        let mut delivery_failures = 0usize;
        for resource in &accepted {
            let report = self.distributor.distribute(resource).await;
            delivered += report.delivered;
            delivery_failures += report.failed();
        }

        let summary = CycleSummary {
            collected,
            rejected,
            duplicates,
            stored,
            store_failures,
            delivered,
            delivery_failures,
            skipped: false,
            elapsed: start.elapsed(),
        };

        info!(
            collected = summary.collected,
            rejected = summary.rejected,
            duplicates = summary.duplicates,
            stored = summary.stored,
            store_failures = summary.store_failures,
            delivered = summary.delivered,
            delivery_failures = summary.delivery_failures,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "collection cycle complete"
        );
        observer.done(&summary);
        summary
    }

    /// Fetch every configured target from every registered client, in plan
    /// order. Sources never fail outward, so this function cannot either.
    async fn collect(&self, observer: &dyn CycleObserver) -> Vec<Resource> {
        let mut candidates = Vec::new();

        'fetch: for (targets, clients) in [
            (&self.plan.queries, &self.query_clients),
            (&self.plan.scrape_targets, &self.target_clients),
        ] {
            for target in targets {
                for client in clients {
                    if self.shutdown_requested() {
                        info!("shutdown requested, stopping collection early");
                        break 'fetch;
                    }
                    let batch = client.fetch(target).await;
                    observer.source_fetched(client.tag().as_str(), target, batch.len());
                    candidates.extend(batch);
                }
            }
        }

        if !self.shutdown_requested() {
            for snippet in &self.plan.curated {
                candidates.push(normalize::curated(snippet));
            }
        }

        candidates
    }
}
