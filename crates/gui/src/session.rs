//! Session-scoped state for the render loop: the working dataset, the
//! user's filter selections and a cached filter result.
//!
//! Nothing here touches egui, so the drain/filter cycle can be driven
//! directly from tests.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use quantboard_core::filter::{apply_filters, category_options, Category, FilterOutcome, FilterState, MetricKey};
use quantboard_core::{DatasetSnapshot, StrategyRecord};
use quantboard_store::SnapshotDrain;
use tracing::{debug, info};

/// Returned by state-changing user actions. `Rerender` asks the caller to
/// schedule exactly one more render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum RenderSignal {
    Rerender,
    Unchanged,
}

impl RenderSignal {
    pub fn needs_render(self) -> bool { self == RenderSignal::Rerender }
}

#[derive(Default)]
pub struct Session {
    dataset: Arc<DatasetSnapshot>,
    filter: FilterState,
    outcome: Option<FilterOutcome>,
    drain: Option<SnapshotDrain>,
    last_update: Option<chrono::DateTime<chrono::Local>>,
}

impl Session {
    pub fn new() -> Self { Self::default() }

    pub fn with_drain(drain: SnapshotDrain) -> Self {
        let mut s = Self::new();
        s.attach(drain);
        s
    }

    pub fn attach(&mut self, drain: SnapshotDrain) { self.drain = Some(drain); }

    pub fn drain(&self) -> Option<&SnapshotDrain> { self.drain.as_ref() }

    /// Start of a foreground cycle: take at most one pending snapshot and
    /// make it the working dataset. Returns true if the dataset changed.
    pub fn begin_cycle(&mut self) -> bool {
        let Some(next) = self.drain.as_ref().and_then(|d| d.try_drain()) else { return false; };
        info!(epoch = next.epoch, records = next.records.len(), prev_epoch = self.dataset.epoch, "session: dataset replaced");
        self.dataset = next;
        self.outcome = None;
        self.last_update = Some(chrono::Local::now());
        true
    }

    pub fn dataset(&self) -> &Arc<DatasetSnapshot> { &self.dataset }

    pub fn filter(&self) -> &FilterState { &self.filter }

    pub fn last_update(&self) -> Option<chrono::DateTime<chrono::Local>> { self.last_update }

    pub fn set_category(&mut self, category: Category) -> RenderSignal {
        if self.filter.category == category {
            return RenderSignal::Unchanged;
        }
        debug!(from = %self.filter.category, to = %category, "session: category changed");
        self.filter.category = category;
        self.outcome = None;
        RenderSignal::Rerender
    }

    pub fn threshold(&self, key: MetricKey) -> f64 {
        match key {
            MetricKey::Sharpe => self.filter.min_sharpe,
            MetricKey::ProfitFactor => self.filter.min_profit_factor,
            MetricKey::Sortino => self.filter.min_sortino,
            MetricKey::TotalReturn => self.filter.min_total_return_pct,
        }
    }

    /// Set a minimum threshold. For `TotalReturn` the value is a percentage.
    pub fn set_threshold(&mut self, key: MetricKey, value: f64) -> RenderSignal {
        let slot = match key {
            MetricKey::Sharpe => &mut self.filter.min_sharpe,
            MetricKey::ProfitFactor => &mut self.filter.min_profit_factor,
            MetricKey::Sortino => &mut self.filter.min_sortino,
            MetricKey::TotalReturn => &mut self.filter.min_total_return_pct,
        };
        if *slot == value {
            return RenderSignal::Unchanged;
        }
        *slot = value;
        self.outcome = None;
        RenderSignal::Rerender
    }

    /// Filter result for the current dataset and selections; recomputed only
    /// after one of them changed.
    pub fn outcome(&mut self) -> &FilterOutcome {
        if self.outcome.is_none() {
            let t0 = Instant::now();
            let out = apply_filters(&self.dataset.records, &self.filter);
            histogram!("filter_pass_ms").record(t0.elapsed().as_secs_f64() * 1000.0);
            debug!(
                total = self.dataset.records.len(),
                visible = out.visible.len(),
                malformed = out.excluded_malformed,
                "session: filter pass"
            );
            self.outcome = Some(out);
        }
        self.outcome.get_or_insert_with(FilterOutcome::default)
    }

    /// Visible records in display order.
    pub fn visible_records(&mut self) -> Vec<&StrategyRecord> {
        self.outcome();
        let Some(out) = self.outcome.as_ref() else { return Vec::new(); };
        out.visible.iter().filter_map(|i| self.dataset.records.get(*i)).collect()
    }

    /// Selector options; the current selection stays listed even when no
    /// record carries it any more.
    pub fn category_options(&self) -> Vec<String> {
        let mut opts = category_options(&self.dataset.records);
        let current = self.filter.category.label();
        if !opts.iter().any(|o| o == current) {
            opts.push(current.to_string());
        }
        opts
    }
}
