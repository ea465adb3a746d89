//! In-memory cluster state store.
//!
//! Behaves like the real store where the scheduler can observe it: watches
//! are filtered by the field selector, a second bind of the same unit is a
//! conflict, and every call is recorded so tests can assert on it.

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::{future, StreamExt};
use rsched_api::{Binding, FieldSelector, Host, OutcomeRecord, Unit, WatchEvent};
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use super::{ClusterClient, UnitEventStream};
use crate::error::ClusterError;

type WatchItem = Result<WatchEvent, ClusterError>;

#[derive(Default)]
struct StoreState {
    hosts: Vec<Host>,

    /// `namespace/name` -> host name.
    bindings: HashMap<String, String>,

    bind_attempts: Vec<Binding>,
    records: Vec<OutcomeRecord>,
    list_calls: usize,
    selectors: Vec<FieldSelector>,

    list_failure: Option<ClusterError>,
    bind_failure: Option<ClusterError>,
    record_failure: Option<ClusterError>,
    watch_failure: Option<ClusterError>,
}

/// In-memory implementation of [`ClusterClient`].
pub struct InMemoryCluster {
    state: Mutex<StoreState>,
    watch_tx: Mutex<Option<mpsc::UnboundedSender<WatchItem>>>,
    watch_rx: Mutex<Option<mpsc::UnboundedReceiver<WatchItem>>>,
}

impl InMemoryCluster {
    /// Create an empty store with no hosts.
    pub fn new() -> Self {
        Self::from_state(StoreState::default())
    }

    /// Create a store holding hosts with the given names.
    pub fn with_hosts<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_state(StoreState {
            hosts: names.into_iter().map(Host::new).collect(),
            ..StoreState::default()
        })
    }

    fn from_state(state: StoreState) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(state),
            watch_tx: Mutex::new(Some(tx)),
            watch_rx: Mutex::new(Some(rx)),
        }
    }

    pub async fn set_hosts(&self, hosts: Vec<Host>) {
        self.state.lock().await.hosts = hosts;
    }

    /// Deliver an event to the open (or future) watch.
    pub async fn push_event(&self, event: WatchEvent) {
        self.push(Ok(event)).await;
    }

    /// Deliver a created-event for `unit`.
    pub async fn push_created(&self, unit: &Unit) {
        self.push_event(WatchEvent::added(unit)).await;
    }

    /// Break the watch with a transport failure.
    pub async fn fail_watch(&self, error: ClusterError) {
        self.push(Err(error)).await;
    }

    /// End the watch as if the server closed the connection.
    pub async fn close_watch(&self) {
        self.watch_tx.lock().await.take();
    }

    async fn push(&self, item: WatchItem) {
        if let Some(tx) = self.watch_tx.lock().await.as_ref() {
            // The receiver is only gone once the watch consumer dropped it.
            let _ = tx.send(item);
        }
    }

    /// Bind a unit out of band, as a concurrent scheduler would.
    pub async fn bind_directly(&self, unit: &Unit, host: &str) {
        self.state
            .lock()
            .await
            .bindings
            .insert(unit.key(), host.to_string());
    }

    pub async fn fail_list_hosts(&self, error: Option<ClusterError>) {
        self.state.lock().await.list_failure = error;
    }

    pub async fn fail_bind(&self, error: Option<ClusterError>) {
        self.state.lock().await.bind_failure = error;
    }

    pub async fn fail_record_event(&self, error: Option<ClusterError>) {
        self.state.lock().await.record_failure = error;
    }

    pub async fn fail_watch_open(&self, error: Option<ClusterError>) {
        self.state.lock().await.watch_failure = error;
    }

    /// Host the unit is bound to, if any.
    pub async fn binding_for(&self, namespace: &str, name: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .bindings
            .get(&format!("{namespace}/{name}"))
            .cloned()
    }

    /// Every bind request received, successful or not, in arrival order.
    pub async fn bind_attempts(&self) -> Vec<Binding> {
        self.state.lock().await.bind_attempts.clone()
    }

    /// Every outcome record successfully written.
    pub async fn records(&self) -> Vec<OutcomeRecord> {
        self.state.lock().await.records.clone()
    }

    pub async fn list_calls(&self) -> usize {
        self.state.lock().await.list_calls
    }

    /// Selectors used to open watches.
    pub async fn watch_selectors(&self) -> Vec<FieldSelector> {
        self.state.lock().await.selectors.clone()
    }
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn list_hosts(&self) -> Result<Vec<Host>, ClusterError> {
        let mut state = self.state.lock().await;
        state.list_calls += 1;
        if let Some(err) = state.list_failure.clone() {
            return Err(err);
        }
        Ok(state.hosts.clone())
    }

    async fn watch_unplaced_units(
        &self,
        selector: &FieldSelector,
    ) -> Result<UnitEventStream, ClusterError> {
        {
            let mut state = self.state.lock().await;
            if let Some(err) = state.watch_failure.clone() {
                return Err(err);
            }
            state.selectors.push(selector.clone());
        }

        let rx = self
            .watch_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| ClusterError::Transport("watch already open".to_string()))?;

        debug!(selector = %selector, "Opened in-memory watch");

        let selector = selector.clone();
        let stream = UnboundedReceiverStream::new(rx).filter(move |item| {
            // Objects that are not units (status, bookmarks) pass through.
            let keep = match item {
                Ok(event) => event.unit().map_or(true, |unit| selector.matches(&unit)),
                Err(_) => true,
            };
            future::ready(keep)
        });

        Ok(Box::pin(stream))
    }

    async fn bind(&self, binding: &Binding) -> Result<(), ClusterError> {
        let mut state = self.state.lock().await;
        state.bind_attempts.push(binding.clone());

        if let Some(err) = state.bind_failure.clone() {
            return Err(err);
        }

        let key = format!("{}/{}", binding.unit_namespace(), binding.unit_name());
        if let Some(existing) = state.bindings.get(&key) {
            return Err(ClusterError::Conflict(format!(
                "unit {key} is already assigned to host {existing}"
            )));
        }

        state.bindings.insert(key, binding.host_name().to_string());
        Ok(())
    }

    async fn record_event(&self, record: &OutcomeRecord) -> Result<(), ClusterError> {
        let mut state = self.state.lock().await;
        if let Some(err) = state.record_failure.clone() {
            return Err(err);
        }
        state.records.push(record.clone());
        Ok(())
    }
}
