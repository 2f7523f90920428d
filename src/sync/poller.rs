//! Periodic refresh of the post list
//!
//! Fetches immediately on start, then on every tick of the configured
//! interval until stopped. Ticks do not wait for the previous request, so
//! requests can overlap; the [`SequenceGate`] keeps only the newest result.
//! A failed fetch is logged and leaves the last published snapshot in place.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::core::config::SyncConfig;
use crate::data::entity::GeoEntity;
use crate::sync::snapshot::{apply_display_names, owner_ids, SequenceGate, Snapshot};
use crate::traits::EntitySource;
use crate::{MapError, Result};

/// Counters for the lifetime of one synchronizer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    /// Responses that arrived after a newer one had been published
    pub stale_discarded: u64,
    pub enrichment_failures: u64,
}

struct SyncShared {
    gate: Mutex<SequenceGate>,
    stats: Mutex<SyncStats>,
    stopped: AtomicBool,
    tx: watch::Sender<Snapshot>,
}

impl SyncShared {
    fn begin(&self) -> u64 {
        if let Ok(mut stats) = self.stats.lock() {
            stats.requests += 1;
        }
        self.gate.lock().map(|mut gate| gate.begin()).unwrap_or(0)
    }

    fn record<F: FnOnce(&mut SyncStats)>(&self, f: F) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }

    fn publish(&self, seq: u64, entities: Vec<GeoEntity>) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        let accepted = self
            .gate
            .lock()
            .map(|mut gate| gate.accept(seq))
            .unwrap_or(false);

        if accepted {
            log::debug!("publishing snapshot #{} with {} posts", seq, entities.len());
            self.tx.send_replace(Snapshot::new(seq, entities));
            self.record(|s| s.successes += 1);
        } else {
            log::debug!("discarding stale response #{}", seq);
            self.record(|s| s.stale_discarded += 1);
        }
    }
}

pub struct PollingSynchronizer {
    source: Arc<dyn EntitySource>,
    config: SyncConfig,
}

impl PollingSynchronizer {
    /// Fails with [`MapError::Config`] for a zero poll interval
    pub fn new(source: Arc<dyn EntitySource>, config: SyncConfig) -> Result<Self> {
        if config.poll_interval_ms == 0 {
            return Err(MapError::Config(
                "poll interval must be at least 1 ms".to_string(),
            ));
        }
        Ok(Self { source, config })
    }

    /// Starts polling on the current tokio runtime
    pub fn start(self) -> SyncHandle {
        let (tx, rx) = watch::channel(Snapshot::empty());
        let shared = Arc::new(SyncShared {
            gate: Mutex::new(SequenceGate::new()),
            stats: Mutex::new(SyncStats::default()),
            stopped: AtomicBool::new(false),
            tx,
        });

        log::info!(
            "starting post polling every {:?}",
            self.config.poll_interval()
        );
        let task = tokio::spawn(run(self.source, self.config, Arc::clone(&shared)));

        SyncHandle {
            task: Some(task),
            rx,
            shared,
        }
    }
}

async fn run(source: Arc<dyn EntitySource>, config: SyncConfig, shared: Arc<SyncShared>) {
    let mut ticker = tokio::time::interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Dropped with this task on stop, which aborts every request still in flight
    let mut in_flight: JoinSet<(u64, Result<Vec<GeoEntity>>)> = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let seq = shared.begin();
                let source = Arc::clone(&source);
                let shared = Arc::clone(&shared);
                let enrich = config.enrich_display_names;
                in_flight.spawn(async move {
                    let result = fetch(source.as_ref(), enrich, &shared).await;
                    (seq, result)
                });
            }
            Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
                match done {
                    Ok((seq, Ok(entities))) => shared.publish(seq, entities),
                    Ok((seq, Err(e))) => {
                        log::warn!("post fetch #{} failed, keeping previous list: {}", seq, e);
                        shared.record(|s| s.failures += 1);
                    }
                    Err(e) if e.is_panic() => {
                        log::error!("post fetch task panicked: {}", e);
                        shared.record(|s| s.failures += 1);
                    }
                    Err(_) => {}
                }
            }
        }
    }
}

async fn fetch(
    source: &dyn EntitySource,
    enrich: bool,
    shared: &SyncShared,
) -> Result<Vec<GeoEntity>> {
    let mut entities = source.fetch_entities().await?;
    if !enrich {
        return Ok(entities);
    }

    let owners = owner_ids(&entities);
    if owners.is_empty() {
        return Ok(entities);
    }
    match source.fetch_display_names(&owners).await {
        Ok(profiles) => apply_display_names(&mut entities, &profiles),
        Err(e) => {
            log::warn!("display name lookup failed, publishing without names: {}", e);
            shared.record(|s| s.enrichment_failures += 1);
        }
    }
    Ok(entities)
}

/// Owner of a running synchronizer. Dropping it stops polling.
pub struct SyncHandle {
    task: Option<JoinHandle<()>>,
    rx: watch::Receiver<Snapshot>,
    shared: Arc<SyncShared>,
}

impl SyncHandle {
    /// Receiver that wakes on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.rx.clone()
    }

    /// Most recently published snapshot
    pub fn latest(&self) -> Snapshot {
        self.rx.borrow().clone()
    }

    pub fn stats(&self) -> SyncStats {
        self.shared.stats.lock().map(|s| *s).unwrap_or_default()
    }

    /// `false` once stopped, or if the polling task ended on its own
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancels the interval and every pending request.
    ///
    /// Returns `true` on the call that actually stopped polling; later calls
    /// do nothing.
    pub fn stop(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        self.shared.stopped.store(true, Ordering::SeqCst);
        task.abort();
        log::info!("post polling stopped");
        true
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
