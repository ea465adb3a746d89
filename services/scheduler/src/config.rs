//! Configuration for the scheduler.
//!
//! The scheduler identity is fixed at compile time. Everything here only
//! controls how the process reaches the cluster state store.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Placement authority tag this scheduler answers to.
pub const SCHEDULER_NAME: &str = "random-scheduler";

/// Service-account token mounted into in-cluster workloads.
pub const IN_CLUSTER_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Service-account CA bundle mounted into in-cluster workloads.
pub const IN_CLUSTER_CA_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the cluster API server.
    pub api_server_url: String,

    /// File holding the bearer token, if any.
    pub token_path: Option<PathBuf>,

    /// PEM bundle used to verify the API server, if any.
    pub ca_cert_path: Option<PathBuf>,

    /// Upper bound for list, bind and record round-trips.
    pub request_timeout: Duration,

    /// Upper bound for establishing a connection (applies to the watch too).
    pub connect_timeout: Duration,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let in_cluster = match (
            lookup("KUBERNETES_SERVICE_HOST"),
            lookup("KUBERNETES_SERVICE_PORT"),
        ) {
            (Some(host), Some(port)) if !host.is_empty() => Some(format!("https://{host}:{port}")),
            _ => None,
        };

        let api_server_url = lookup("RSCHED_API_SERVER")
            .or_else(|| in_cluster.clone())
            .unwrap_or_else(|| "http://127.0.0.1:8001".to_string())
            .trim_end_matches('/')
            .to_string();

        let token_path = lookup("RSCHED_TOKEN_PATH")
            .map(PathBuf::from)
            .or_else(|| in_cluster.as_ref().map(|_| PathBuf::from(IN_CLUSTER_TOKEN_PATH)));

        let ca_cert_path = lookup("RSCHED_CA_PATH")
            .map(PathBuf::from)
            .or_else(|| in_cluster.as_ref().map(|_| PathBuf::from(IN_CLUSTER_CA_PATH)));

        let request_timeout = parse_secs(&lookup, "RSCHED_REQUEST_TIMEOUT_SECS", 30)?;
        let connect_timeout = parse_secs(&lookup, "RSCHED_CONNECT_TIMEOUT_SECS", 10)?;

        let log_level = lookup("RSCHED_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            api_server_url,
            token_path,
            ca_cert_path,
            request_timeout,
            connect_timeout,
            log_level,
        })
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration> {
    let Some(raw) = lookup(key) else {
        return Ok(Duration::from_secs(default));
    };
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds, got {raw:?}"))?;
    if secs == 0 {
        anyhow::bail!("{key} must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}
