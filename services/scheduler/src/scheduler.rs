//! Scheduling loop.
//!
//! The loop:
//! - Opens one watch for unplaced units carrying this scheduler's name
//! - Handles created-events only, one unit at a time, in delivery order
//! - Runs select -> bind -> notify per unit, containing every failure
//! - Stops on shutdown, or fails once the watch breaks (no resubscription)
//!
//! A failed unit is not retried here; redelivery by the store is the only
//! retry path. Duplicate deliveries are absorbed by the store's bind conflict.

use std::sync::Arc;

use futures_util::StreamExt;
use rsched_api::{FieldSelector, Host, Unit, WatchEvent};
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::binder::Binder;
use crate::cluster::ClusterClient;
use crate::error::{ScheduleError, SelectionError, StreamError};
use crate::notifier::{placement_message, Notifier};
use crate::selector::PlacementSelector;

/// Counters for one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleStats {
    /// Events received from the watch.
    pub events_seen: u64,
    /// Events that did not describe a schedulable unit.
    pub events_ignored: u64,
    /// Units bound to a host (including those whose record failed).
    pub units_placed: u64,
    /// Units already bound elsewhere.
    pub units_conflicted: u64,
    /// Units that failed at select or bind.
    pub units_failed: u64,
    /// Placements whose outcome record could not be written.
    pub notify_failures: u64,
}

/// The scheduler control loop.
pub struct Scheduler {
    name: String,
    client: Arc<dyn ClusterClient>,
    selector: Box<dyn PlacementSelector>,
    binder: Binder,
    notifier: Notifier,
}

impl Scheduler {
    /// Create a scheduler answering to `name`.
    pub fn new(
        name: impl Into<String>,
        client: Arc<dyn ClusterClient>,
        selector: Box<dyn PlacementSelector>,
    ) -> Self {
        let name = name.into();
        Self {
            binder: Binder::new(Arc::clone(&client)),
            notifier: Notifier::new(Arc::clone(&client), name.clone()),
            name,
            client,
            selector,
        }
    }

    /// Run until shutdown is signaled or the watch is lost.
    ///
    /// Returns the counters on shutdown. Fails with `StreamError` if the
    /// watch cannot be opened, errors, or is closed by the store.
    pub async fn run(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<ScheduleStats, StreamError> {
        let mut stats = ScheduleStats::default();
        if *shutdown.borrow() {
            return Ok(stats);
        }

        let selector = FieldSelector::unplaced_for(&self.name);
        let mut events = self
            .client
            .watch_unplaced_units(&selector)
            .await
            .map_err(StreamError::Subscribe)?;

        info!(scheduler = %self.name, selector = %selector, "Scheduler started");

        loop {
            let next = tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    // A dropped sender also means nobody can keep us running.
                    if changed.is_err() || *shutdown.borrow() {
                        info!(
                            events_seen = stats.events_seen,
                            units_placed = stats.units_placed,
                            units_conflicted = stats.units_conflicted,
                            units_failed = stats.units_failed,
                            notify_failures = stats.notify_failures,
                            "Scheduler shutting down"
                        );
                        return Ok(stats);
                    }
                    continue;
                }
                next = events.next() => next,
            };

            match next {
                Some(Ok(event)) => self.handle_event(event, &mut stats).await,
                Some(Err(e)) => {
                    error!(error = %e, units_placed = stats.units_placed, "Unit watch failed");
                    return Err(StreamError::Lost(e));
                }
                None => {
                    error!(units_placed = stats.units_placed, "Unit watch closed");
                    return Err(StreamError::Closed);
                }
            }
        }
    }

    /// Filter one event and, if it announces a schedulable unit, place it.
    async fn handle_event(&mut self, event: WatchEvent, stats: &mut ScheduleStats) {
        stats.events_seen += 1;

        if !event.is_created() {
            debug!(event_type = %event.event_type, "Ignoring event");
            stats.events_ignored += 1;
            return;
        }

        let unit = match event.unit() {
            Ok(unit) => unit,
            Err(e) => {
                warn!(error = %e, "Ignoring created event without a unit");
                stats.events_ignored += 1;
                return;
            }
        };

        if !unit.is_unplaced() || !unit.is_owned_by(&self.name) {
            debug!(unit = %unit.key(), "Ignoring unit outside this scheduler's authority");
            stats.events_ignored += 1;
            return;
        }

        let span = info_span!("schedule", namespace = %unit.namespace(), name = %unit.name());
        match self.schedule_unit(&unit).instrument(span).await {
            Ok(_) => stats.units_placed += 1,
            Err(e) if e.is_placed() => {
                stats.units_placed += 1;
                stats.notify_failures += 1;
            }
            Err(e) if e.is_conflict() => stats.units_conflicted += 1,
            Err(_) => stats.units_failed += 1,
        }
    }

    /// Run select -> bind -> notify for one unit.
    ///
    /// Every failure is logged here with the unit identity and stage. A
    /// `ScheduleError::Notify` means the unit *was* placed.
    pub async fn schedule_unit(&mut self, unit: &Unit) -> Result<Host, ScheduleError> {
        info!(uid = %unit.uid(), "Found unit to schedule");

        let result = self.place(unit).await;
        match &result {
            Ok(host) => info!(host = %host.name(), "Unit scheduled"),
            Err(e) if e.is_placed() => {
                warn!(stage = %e.stage(), error = %e, "Unit placed but outcome record failed")
            }
            Err(e) if e.is_conflict() => {
                info!(stage = %e.stage(), error = %e, "Unit already bound, skipping")
            }
            Err(e) => warn!(stage = %e.stage(), error = %e, "Failed to schedule unit"),
        }
        result
    }

    async fn place(&mut self, unit: &Unit) -> Result<Host, ScheduleError> {
        // Fresh snapshot per decision; never cached.
        let hosts = self
            .client
            .list_hosts()
            .await
            .map_err(SelectionError::ListHosts)?;
        let host = self.selector.select(&hosts)?.clone();
        debug!(host = %host.name(), candidates = hosts.len(), "Selected host");

        self.binder.bind(unit, &host).await?;

        let message = placement_message(unit, &host);
        self.notifier.emit(unit, &message).await?;

        Ok(host)
    }
}
