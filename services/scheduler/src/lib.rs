//! rsched Scheduler Library
//!
//! A minimal workload scheduler. It watches for newly created units that name
//! this scheduler as their placement authority, picks a host for each one, and
//! records the placement in the cluster state store.
//!
//! ## Architecture
//!
//! ```text
//! watch (unplaced units)
//!   └── Scheduler            (single reader, one unit at a time)
//!         ├── PlacementSelector  (fresh host snapshot -> one host)
//!         ├── Binder             (commit; conflict vs transport)
//!         └── Notifier           (best-effort outcome record)
//! ```
//!
//! ## Modules
//!
//! - `cluster`: cluster state client trait, HTTP and in-memory implementations
//! - `selector`: placement strategies
//! - `binder` / `notifier`: the commit and observability writes
//! - `scheduler`: the control loop
//! - `signal`: SIGINT/SIGTERM handling for the binary

pub mod binder;
pub mod cluster;
pub mod config;
pub mod error;
pub mod notifier;
pub mod scheduler;
pub mod selector;
pub mod signal;

// Re-export commonly used types
pub use cluster::{ClusterClient, HttpClusterClient, InMemoryCluster, UnitEventStream};
pub use config::{Config, SCHEDULER_NAME};
pub use error::{
    BindError, ClusterError, NotifyError, ScheduleError, SelectionError, Stage, StreamError,
};
pub use scheduler::{ScheduleStats, Scheduler};
pub use selector::{PlacementSelector, RandomSelector};
pub use signal::ShutdownSignals;
