use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use shared::types::Registry;
use crate::interface::LocalInterface;
use super::registry::RegistryHandle;
use super::targets::Cidr;
use super::{Prober, ScanError};

pub const DEFAULT_CONCURRENCY: usize = 50;

/// Ranges larger than this are refused before any worker starts
pub const MAX_TARGETS: u128 = 1 << 20;

/// Slack added to the collection timeout before a target is abandoned
pub const WATCHDOG_SLACK: Duration = Duration::from_secs(1);

/// What every worker needs for each exchange
struct WorkerContext {
    prober: Arc<dyn Prober>,
    interface: LocalInterface,
    services: Vec<String>,
    timeout: Duration,
    watchdog: Duration,
}

/// Bounded pool of workers sweeping a CIDR range with a [`Prober`]
pub struct Scanner {
    prober: Arc<dyn Prober>,
    concurrency: usize,
}

impl Scanner {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Cap on simultaneous exchanges (and so on open sockets); at least one
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Probe every host of `cidr` and return the merged registry.
    ///
    /// Only an unusable CIDR fails the scan. Cancelling `cancel` stops the
    /// workers and returns whatever was merged so far.
    pub async fn scan(
        &self,
        interface: &LocalInterface,
        services: &[String],
        cidr: &str,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<Registry, ScanError> {
        let cidr: Cidr = cidr.parse()?;
        let hosts = cidr.host_count();
        if hosts > MAX_TARGETS {
            return Err(ScanError::TooManyTargets {
                cidr: cidr.to_string(),
                hosts,
                limit: MAX_TARGETS,
            });
        }

        let (queue_tx, queue_rx) = flume::unbounded::<IpAddr>();
        for host in cidr.hosts() {
            if queue_tx.send(host).is_err() {
                break;
            }
        }
        // Closing the queue lets workers exit once it is drained
        drop(queue_tx);

        info!(
            "Scanning {} ({} hosts) on {} ({}) for {} service types with {} workers",
            cidr,
            hosts,
            interface.name,
            interface.ip,
            services.len(),
            self.concurrency
        );

        let context = Arc::new(WorkerContext {
            prober: self.prober.clone(),
            interface: interface.clone(),
            services: services.to_vec(),
            timeout,
            watchdog: timeout + WATCHDOG_SLACK,
        });

        let (registry, aggregator) = RegistryHandle::spawn();
        let pool_size = self.concurrency.min(hosts as usize).max(1);
        let workers: Vec<_> = (0..pool_size)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    context.clone(),
                    queue_rx.clone(),
                    registry.clone(),
                    cancel.clone(),
                ))
            })
            .collect();
        drop(queue_rx);
        drop(registry);

        let mut probed = 0;
        for result in futures::future::join_all(workers).await {
            match result {
                Ok(count) => probed += count,
                Err(e) => warn!("Scan worker failed: {}", e),
            }
        }

        let registry = aggregator
            .await
            .map_err(|e| ScanError::Aggregator(e.to_string()))?;

        if cancel.is_cancelled() {
            info!("Scan cancelled after {} of {} hosts", probed, hosts);
        }
        info!("Scan of {} finished: {} responding addresses", cidr, registry.len());
        Ok(registry)
    }
}

async fn run_worker(
    id: usize,
    context: Arc<WorkerContext>,
    queue: flume::Receiver<IpAddr>,
    registry: RegistryHandle,
    cancel: CancellationToken,
) -> usize {
    let mut probed = 0;

    loop {
        let target = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = queue.recv_async() => match next {
                Ok(target) => target,
                Err(_) => break,
            },
        };

        let exchange = tokio::time::timeout(
            context.watchdog,
            context.prober.query(&context.interface, &context.services, target, context.timeout),
        );
        let found = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = exchange => match result {
                Ok(found) => found,
                Err(_) => {
                    warn!("Exchange with {} exceeded {:?}, skipping", target, context.watchdog);
                    Registry::new()
                }
            },
        };
        probed += 1;

        if found.is_empty() {
            continue;
        }
        let answered = found.len();
        if let Err(e) = registry.merge(found).await {
            warn!("Worker {} could not merge results: {}", id, e);
            break;
        }
        debug!("Worker {}: {} answered from {} addresses", id, target, answered);
    }

    debug!("Worker {} done after {} targets", id, probed);
    probed
}
