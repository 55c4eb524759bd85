//! Delivery fan-out for collected resources.
//!
//! A [`Distributor`] holds an ordered set of [`Sink`]s and pushes each
//! resource to every sink exactly once, best effort: a failing sink is
//! logged and skipped, never retried, and never blocks the sinks after it.

pub mod discord;
pub mod render;
pub mod telegram;
pub mod webhook;

use async_trait::async_trait;
use secfeed_shared::{Resource, Result, SecfeedError};
use tracing::{debug, instrument, warn};

pub use discord::DiscordSink;
pub use render::{RenderedMessage, render};
pub use telegram::TelegramSink;
pub use webhook::WebhookSink;

/// Timeout in seconds for delivery requests.
const DELIVERY_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for all delivery requests.
const USER_AGENT: &str = concat!("secfeed/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// One delivery target. Sinks are pluggable: the distributor only ever
/// talks to this contract.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Sink name used in logs and delivery reports.
    fn name(&self) -> &str;

    /// Deliver one rendered message. At most one attempt per call.
    async fn deliver(&self, message: &RenderedMessage) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Distributor
// ---------------------------------------------------------------------------

/// One failed sink delivery within a [`DeliveryReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Name of the sink that failed.
    pub sink: String,
    /// What went wrong, for the cycle log.
    pub reason: String,
}

/// Outcome of distributing one resource across all sinks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Number of sinks that confirmed delivery.
    pub delivered: usize,
    /// Sinks that failed, in attempt order.
    pub failures: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    /// Number of sinks that failed.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Fans resources out to an ordered set of sinks.
pub struct Distributor {
    sinks: Vec<Box<dyn Sink>>,
}

impl Distributor {
    /// Build a distributor over the given sinks. Sink order is delivery
    /// order.
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks }
    }

    /// A distributor with no sinks; distribution becomes a no-op.
    pub fn disabled() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Push one resource to every sink in order. Failures are collected
    /// in the report, never propagated.
    #[instrument(skip_all, fields(title = %resource.title))]
    pub async fn distribute(&self, resource: &Resource) -> DeliveryReport {
        let message = render(resource);
        let mut report = DeliveryReport::default();

        for sink in &self.sinks {
            match sink.deliver(&message).await {
                Ok(()) => {
                    debug!(sink = sink.name(), "delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(sink = sink.name(), error = %e, "delivery failed");
                    report.failures.push(DeliveryFailure {
                        sink: sink.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }
}

/// Build a reqwest client with the shared delivery settings.
pub(crate) fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(DELIVERY_TIMEOUT_SECS))
        .build()
        .map_err(|e| SecfeedError::Network(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;
    use secfeed_shared::{ResourceKind, SourceTag};

    struct RecordingSink {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Sink for RecordingSink {
        fn name(&self) -> &str {
            self.name
        }

        async fn deliver(&self, _message: &RenderedMessage) -> Result<()> {
            self.log.lock().unwrap().push(self.name.to_string());
            if self.fail {
                Err(SecfeedError::Delivery(format!("{} is down", self.name)))
            } else {
                Ok(())
            }
        }
    }

    fn sample_resource() -> Resource {
        Resource {
            kind: ResourceKind::Repository,
            title: "nmap-scripts".into(),
            description: "Collection of nmap NSE scripts".into(),
            url: "https://github.com/example/nmap-scripts".into(),
            source: SourceTag::Github,
        }
    }

    #[tokio::test]
    async fn failing_sink_does_not_block_later_sinks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let distributor = Distributor::new(vec![
            Box::new(RecordingSink {
                name: "broken",
                log: Arc::clone(&log),
                fail: true,
            }),
            Box::new(RecordingSink {
                name: "healthy",
                log: Arc::clone(&log),
                fail: false,
            }),
        ]);

        let report = distributor.distribute(&sample_resource()).await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].sink, "broken");
        assert!(report.failures[0].reason.contains("broken is down"));
        assert_eq!(*log.lock().unwrap(), vec!["broken", "healthy"]);
    }

    #[tokio::test]
    async fn sinks_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let distributor = Distributor::new(vec![
            Box::new(RecordingSink {
                name: "first",
                log: Arc::clone(&log),
                fail: false,
            }),
            Box::new(RecordingSink {
                name: "second",
                log: Arc::clone(&log),
                fail: false,
            }),
            Box::new(RecordingSink {
                name: "third",
                log: Arc::clone(&log),
                fail: false,
            }),
        ]);

        let report = distributor.distribute(&sample_resource()).await;

        assert_eq!(report.delivered, 3);
        assert!(report.failures.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn empty_distributor_is_a_noop() {
        let distributor = Distributor::disabled();
        assert_eq!(distributor.sink_count(), 0);

        let report = distributor.distribute(&sample_resource()).await;
        assert_eq!(report, DeliveryReport::default());
    }
}
