//! Placement commit.

use std::sync::Arc;

use rsched_api::{Binding, Host, Unit};
use tracing::debug;

use crate::cluster::ClusterClient;
use crate::error::{BindError, ClusterError};

/// Commits placement decisions to the cluster state store.
///
/// Does not retry. A conflict means the unit is already bound and is
/// reported separately from transport failures.
pub struct Binder {
    client: Arc<dyn ClusterClient>,
}

impl Binder {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }

    /// Bind `unit` to `host`, returning the committed binding.
    pub async fn bind(&self, unit: &Unit, host: &Host) -> Result<Binding, BindError> {
        let binding = Binding::new(unit, host);
        debug!(unit = %unit.key(), host = %host.name(), "Submitting binding");

        match self.client.bind(&binding).await {
            Ok(()) => Ok(binding),
            Err(ClusterError::Conflict(message)) => Err(BindError::Conflict {
                unit: unit.key(),
                message,
            }),
            Err(source) => Err(BindError::Transport {
                unit: unit.key(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::InMemoryCluster;

    fn unit() -> Unit {
        Unit::new("default", "web-1", "u-1", "random-scheduler")
    }

    #[tokio::test]
    async fn test_bind_commits_to_store() {
        let cluster = Arc::new(InMemoryCluster::with_hosts(["h1"]));
        let binder = Binder::new(cluster.clone());

        let binding = binder.bind(&unit(), &Host::new("h1")).await.unwrap();
        assert_eq!(binding.host_name(), "h1");
        assert_eq!(
            cluster.binding_for("default", "web-1").await.as_deref(),
            Some("h1")
        );
    }

    #[tokio::test]
    async fn test_rebind_is_a_conflict() {
        let cluster = Arc::new(InMemoryCluster::with_hosts(["h1", "h2"]));
        let binder = Binder::new(cluster.clone());

        binder.bind(&unit(), &Host::new("h1")).await.unwrap();
        let err = binder.bind(&unit(), &Host::new("h2")).await.unwrap_err();

        assert!(matches!(err, BindError::Conflict { ref unit, .. } if unit == "default/web-1"));
        assert_eq!(
            cluster.binding_for("default", "web-1").await.as_deref(),
            Some("h1")
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_transport() {
        let cluster = Arc::new(InMemoryCluster::with_hosts(["h1"]));
        cluster
            .fail_bind(Some(ClusterError::Status {
                status: 403,
                body: "forbidden".to_string(),
            }))
            .await;
        let binder = Binder::new(cluster.clone());

        let err = binder.bind(&unit(), &Host::new("h1")).await.unwrap_err();
        assert!(matches!(
            err,
            BindError::Transport {
                source: ClusterError::Status { status: 403, .. },
                ..
            }
        ));
    }
}
