//! Quantboard store: snapshot builder and the capacity-1 conduit between the
//! background listener and the render loop.

#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use metrics::{counter, histogram};
use quantboard_core::{DatasetSnapshot, Listing, StrategyRecord};
use tokio::sync::watch;
use tracing::{debug, info};

/// Builds dataset snapshots from full listings.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    epoch: u64,
}

impl SnapshotBuilder {
    pub fn new() -> Self { Self { epoch: 0 } }

    pub fn epoch(&self) -> u64 { self.epoch }

    /// Materialize a listing. Every call yields a fresh snapshot with the
    /// next epoch; documents without fields are dropped.
    pub fn build(&mut self, listing: Listing) -> Arc<DatasetSnapshot> {
        let docs = listing.len();
        let records: Vec<StrategyRecord> = listing.into_iter().filter_map(StrategyRecord::from_document).collect();
        if records.len() < docs {
            debug!(skipped = docs - records.len(), "builder: skipped empty documents");
        }
        self.epoch = self.epoch.saturating_add(1);
        counter!("snapshots_built_total").increment(1);
        Arc::new(DatasetSnapshot { epoch: self.epoch, records })
    }
}

struct Slot {
    latest: ArcSwapOption<DatasetSnapshot>,
    epoch_tx: watch::Sender<u64>,
    published: AtomicU64,
    coalesced: AtomicU64,
}

/// Producer half of the conduit.
#[derive(Clone)]
pub struct SnapshotPublisher {
    slot: Arc<Slot>,
}

/// Consumer half of the conduit. Never blocks.
pub struct SnapshotDrain {
    slot: Arc<Slot>,
    epoch_rx: watch::Receiver<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConduitStats {
    pub published: u64,
    /// Snapshots replaced before the consumer read them.
    pub coalesced: u64,
}

/// Create a conduit holding at most the most recent unread snapshot.
pub fn conduit() -> (SnapshotPublisher, SnapshotDrain) {
    let (epoch_tx, epoch_rx) = watch::channel(0u64);
    let slot = Arc::new(Slot {
        latest: ArcSwapOption::empty(),
        epoch_tx,
        published: AtomicU64::new(0),
        coalesced: AtomicU64::new(0),
    });
    (SnapshotPublisher { slot: Arc::clone(&slot) }, SnapshotDrain { slot, epoch_rx })
}

impl SnapshotPublisher {
    /// Replace the slot content. An unread snapshot still in the slot is
    /// discarded.
    pub fn publish(&self, snap: Arc<DatasetSnapshot>) {
        let epoch = snap.epoch;
        let prev = self.slot.latest.swap(Some(snap));
        self.slot.published.fetch_add(1, Ordering::Relaxed);
        counter!("snapshots_published_total").increment(1);
        if let Some(old) = prev {
            self.slot.coalesced.fetch_add(1, Ordering::Relaxed);
            counter!("snapshots_coalesced_total").increment(1);
            debug!(dropped_epoch = old.epoch, epoch, "conduit: unread snapshot replaced");
        }
        self.slot.epoch_tx.send_replace(epoch);
    }

    pub fn stats(&self) -> ConduitStats { stats_of(&self.slot) }
}

impl SnapshotDrain {
    /// Take the pending snapshot, if any, leaving the slot empty.
    pub fn try_drain(&self) -> Option<Arc<DatasetSnapshot>> {
        self.slot.latest.swap(None)
    }

    pub fn has_pending(&self) -> bool { self.slot.latest.load().is_some() }

    /// Wake-up signal carrying the epoch of the latest publish.
    pub fn subscribe_epoch(&self) -> watch::Receiver<u64> { self.epoch_rx.clone() }

    pub fn stats(&self) -> ConduitStats { stats_of(&self.slot) }
}

fn stats_of(slot: &Slot) -> ConduitStats {
    ConduitStats {
        published: slot.published.load(Ordering::Relaxed),
        coalesced: slot.coalesced.load(Ordering::Relaxed),
    }
}

/// Change callback for a collection subscription: each full listing becomes
/// a snapshot and is published.
pub fn bridge_listener(publisher: SnapshotPublisher) -> impl FnMut(Listing) + Send + 'static {
    let mut builder = SnapshotBuilder::new();
    move |listing: Listing| {
        let t0 = Instant::now();
        let snap = builder.build(listing);
        let (epoch, records) = (snap.epoch, snap.records.len());
        publisher.publish(snap);
        histogram!("snapshot_build_ms").record(t0.elapsed().as_secs_f64() * 1000.0);
        info!(epoch, records, took_ms = %t0.elapsed().as_millis(), "bridge: snapshot published");
    }
}
