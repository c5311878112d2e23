//! Shared in-memory state around the pipeline: the current filter value, the
//! last snapshot handed to the dashboard, and the single-flight guard that
//! keeps at most one fetch in flight. A filter change that lands during a
//! fetch is queued and re-runs once that fetch finishes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tracing::{debug, info};

use crate::filters::FilterSelection;
use crate::intel::{FetchError, FetchOutcome, IntelPipeline};
use crate::model::{Event, SCHEMA_VERSION};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Snapshot {
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FetchError>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub filters: FilterSelection,
    pub schema_version: &'static str,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            error: None,
            fetched_at: None,
            filters: FilterSelection::default(),
            schema_version: SCHEMA_VERSION,
        }
    }
}

/// What triggered a refresh; only used for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Timer,
    User,
    FilterChange,
}

impl Trigger {
    fn as_str(self) -> &'static str {
        match self {
            Trigger::Timer => "timer",
            Trigger::User => "user",
            Trigger::FilterChange => "filters",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshStatus {
    Completed(FetchOutcome),
    /// Another fetch was in flight; this trigger was dropped.
    Skipped,
    /// Filters changed during a fetch; the running fetch goes again once it
    /// finishes.
    Queued,
}

/// Holds the in-flight slot; releases it on drop.
pub struct FlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct IntelService {
    pipeline: IntelPipeline,
    filters: RwLock<FilterSelection>,
    snapshot: RwLock<Snapshot>,
    in_flight: Arc<AtomicBool>,
    rerun_pending: AtomicBool,
}

impl IntelService {
    pub fn new(pipeline: IntelPipeline) -> Self {
        Self {
            pipeline,
            filters: RwLock::new(FilterSelection::default()),
            snapshot: RwLock::new(Snapshot::default()),
            in_flight: Arc::new(AtomicBool::new(false)),
            rerun_pending: AtomicBool::new(false),
        }
    }

    pub fn pipeline(&self) -> &IntelPipeline {
        &self.pipeline
    }

    pub fn filters(&self) -> FilterSelection {
        self.filters
            .read()
            .map(|g| g.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Replace the whole filter value.
    pub fn set_filters(&self, filters: FilterSelection) {
        let filters = filters.normalized();
        debug!(target: "api", ?filters, "filters updated");
        match self.filters.write() {
            Ok(mut g) => *g = filters,
            Err(e) => *e.into_inner() = filters,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
            .read()
            .map(|g| g.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the in-flight slot, or `None` if a fetch is already running.
    pub fn try_begin(&self) -> Option<FlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                flag: Arc::clone(&self.in_flight),
            })
    }

    /// Run a fetch while holding `guard` and publish the result. Goes again
    /// with the current filters if a filter change was queued meanwhile.
    pub async fn run_with(&self, guard: FlightGuard, trigger: Trigger) -> FetchOutcome {
        let mut guard = guard;
        let mut trigger = trigger;
        loop {
            self.rerun_pending.store(false, Ordering::Release);
            let filters = self.filters();
            debug!(target: "intel", trigger = trigger.as_str(), "refresh started");
            let outcome = self.pipeline.fetch_intelligence(&filters).await;
            self.publish(&outcome, filters);
            drop(guard);

            if !self.rerun_pending.load(Ordering::Acquire) {
                return outcome;
            }
            // Whoever holds the slot now reads the newer filters anyway.
            match self.try_begin() {
                Some(next) => {
                    info!(target: "intel", "re-running refresh for queued filter change");
                    guard = next;
                    trigger = Trigger::FilterChange;
                }
                None => return outcome,
            }
        }
    }

    /// Single-flight refresh. Overlapping timer and user triggers are
    /// dropped; an overlapping filter change is queued behind the running
    /// fetch.
    pub async fn refresh(&self, trigger: Trigger) -> RefreshStatus {
        match self.try_begin() {
            Some(guard) => RefreshStatus::Completed(self.run_with(guard, trigger).await),
            None if trigger == Trigger::FilterChange => {
                self.rerun_pending.store(true, Ordering::Release);
                // The running fetch may have finished before the flag was set.
                match self.try_begin() {
                    Some(guard) => RefreshStatus::Completed(self.run_with(guard, trigger).await),
                    None => {
                        info!(target: "intel", "filter change queued behind fetch in flight");
                        RefreshStatus::Queued
                    }
                }
            }
            None => {
                counter!("intel_refresh_skipped_total").increment(1);
                info!(target: "intel", trigger = trigger.as_str(), "refresh skipped: fetch in flight");
                RefreshStatus::Skipped
            }
        }
    }

    /// Successful fetches replace the event list wholesale; failed ones keep
    /// the last known events and record the error.
    fn publish(&self, outcome: &FetchOutcome, filters: FilterSelection) {
        let mut snap = match self.snapshot.write() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        if outcome.is_ok() {
            snap.events = outcome.events.clone();
            snap.fetched_at = Some(Utc::now());
            snap.filters = filters;
        }
        snap.error = outcome.error.clone();
    }
}
