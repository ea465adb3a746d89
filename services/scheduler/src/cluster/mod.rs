//! Cluster state client interface.
//!
//! The scheduler only needs four capabilities from the store:
//! - List hosts
//! - Watch unplaced units (server-side filtered)
//! - Bind a unit to a host
//! - Record an outcome event
//!
//! `HttpClusterClient` talks to a real API server; `InMemoryCluster` is used
//! for tests and local runs.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use rsched_api::{Binding, FieldSelector, Host, OutcomeRecord, WatchEvent};

use crate::error::ClusterError;

mod http;
mod memory;

pub use http::HttpClusterClient;
pub use memory::InMemoryCluster;

/// Stream of watch events. Has exactly one reader.
pub type UnitEventStream = Pin<Box<dyn Stream<Item = Result<WatchEvent, ClusterError>> + Send>>;

/// Cluster state client interface.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetch a point-in-time snapshot of all hosts.
    async fn list_hosts(&self) -> Result<Vec<Host>, ClusterError>;

    /// Open a long-lived watch on units matching `selector`.
    async fn watch_unplaced_units(
        &self,
        selector: &FieldSelector,
    ) -> Result<UnitEventStream, ClusterError>;

    /// Commit a placement. Rebinding an already bound unit is a `Conflict`.
    async fn bind(&self, binding: &Binding) -> Result<(), ClusterError>;

    /// Append an outcome record.
    async fn record_event(&self, record: &OutcomeRecord) -> Result<(), ClusterError>;
}
