//! Placement selection.
//!
//! A selector maps a host snapshot to one host. The default strategy is a
//! uniform pick driven by a generator the selector owns, so a seeded
//! generator makes placement reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rsched_api::Host;

use crate::error::SelectionError;

/// Placement strategy.
pub trait PlacementSelector: Send {
    /// Pick one host from `hosts`. Fails with `NoHostsAvailable` when empty.
    fn select<'a>(&mut self, hosts: &'a [Host]) -> Result<&'a Host, SelectionError>;
}

/// Uniform-random selection over the full snapshot.
#[derive(Debug)]
pub struct RandomSelector<R = StdRng> {
    rng: R,
}

impl<R: Rng> RandomSelector<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomSelector<StdRng> {
    /// Selector seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Deterministic selector for tests and reproductions.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> PlacementSelector for RandomSelector<R> {
    fn select<'a>(&mut self, hosts: &'a [Host]) -> Result<&'a Host, SelectionError> {
        if hosts.is_empty() {
            return Err(SelectionError::NoHostsAvailable);
        }
        let index = self.rng.random_range(0..hosts.len());
        Ok(&hosts[index])
    }
}
