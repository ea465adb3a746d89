//! # rsched-api
//!
//! Wire model shared by the rsched scheduler and its cluster clients.
//!
//! ## Objects
//!
//! - [`Unit`]: a work item waiting for placement (a core/v1 `Pod`)
//! - [`Host`]: an execution target (a core/v1 `Node`)
//! - [`Binding`]: the placement commit for a unit onto a host
//! - [`OutcomeRecord`]: the observability record emitted after a placement
//!   (a core/v1 `Event`)
//!
//! ## Watch protocol
//!
//! Watches deliver newline-delimited JSON objects of the form
//! `{"type": "ADDED", "object": {...}}`. [`LineDecoder`] reassembles lines
//! across arbitrary chunk boundaries and [`WatchEvent`] decodes each line.
//!
//! Server-side filtering is expressed with [`FieldSelector`].

mod error;
mod selector;
mod types;
mod watch;

pub use error::ApiError;
pub use selector::FieldSelector;
pub use types::*;
pub use watch::{LineDecoder, WatchEvent, WatchEventType};
