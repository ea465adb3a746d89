//! Outcome records for completed placements.

use std::sync::Arc;

use chrono::Utc;
use rsched_api::{Host, OutcomeRecord, Unit};

use crate::cluster::ClusterClient;
use crate::error::NotifyError;

/// Emits outcome records. Best effort: a failure here never touches the
/// placement that was already committed.
pub struct Notifier {
    client: Arc<dyn ClusterClient>,
    component: String,
}

impl Notifier {
    /// `component` is reported as the record's source.
    pub fn new(client: Arc<dyn ClusterClient>, component: impl Into<String>) -> Self {
        Self {
            client,
            component: component.into(),
        }
    }

    /// Write a record about `unit` carrying `message`, stamped now.
    pub async fn emit(&self, unit: &Unit, message: &str) -> Result<OutcomeRecord, NotifyError> {
        let record = OutcomeRecord::scheduled(unit, &self.component, message, Utc::now());
        self.client
            .record_event(&record)
            .await
            .map_err(|source| NotifyError {
                unit: unit.key(),
                source,
            })?;
        Ok(record)
    }
}

/// Human-readable text for a successful placement.
pub fn placement_message(unit: &Unit, host: &Host) -> String {
    format!("Placed unit [{}] on {}", unit.key(), host.name())
}
