//! HTTP cluster client speaking the core/v1 REST API.
//!
//! Provides:
//! - `GET  /api/v1/nodes`
//! - `GET  /api/v1/pods?watch=true&fieldSelector=...` (newline-delimited JSON)
//! - `POST /api/v1/namespaces/{ns}/pods/{name}/binding`
//! - `POST /api/v1/namespaces/{ns}/events`

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use rsched_api::{Binding, FieldSelector, Host, HostList, LineDecoder, OutcomeRecord, WatchEvent};
use tracing::{debug, error};

use super::{ClusterClient, UnitEventStream};
use crate::config::Config;
use crate::error::ClusterError;

/// Cluster API client.
pub struct HttpClusterClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    request_timeout: Duration,
}

impl HttpClusterClient {
    /// Create a new client from configuration.
    ///
    /// Reads the bearer token and CA bundle eagerly so a misconfigured
    /// deployment fails at startup instead of on the first request.
    pub fn new(config: &Config) -> Result<Self> {
        // No client-wide timeout: it would also cut the long-lived watch.
        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout);

        if let Some(path) = &config.ca_cert_path {
            let pem = std::fs::read(path)
                .with_context(|| format!("failed to read CA bundle {}", path.display()))?;
            let certs = reqwest::Certificate::from_pem_bundle(&pem)
                .with_context(|| format!("invalid CA bundle {}", path.display()))?;
            if certs.is_empty() {
                anyhow::bail!("CA bundle {} contains no certificates", path.display());
            }
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }

        let token = match &config.token_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read token {}", path.display()))?;
                Some(raw.trim().to_string())
            }
            None => None,
        };

        let client = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_server_url.trim_end_matches('/').to_string(),
            token,
            request_timeout: config.request_timeout,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Map non-success answers to `ClusterError`, keeping the body for logs.
    async fn check(response: Response, what: &str) -> Result<Response, ClusterError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT {
            debug!(status = %status, body = %body, "{what} rejected with conflict");
            return Err(ClusterError::Conflict(body));
        }

        error!(status = %status, body = %body, "{what} failed");
        Err(ClusterError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ClusterClient for HttpClusterClient {
    async fn list_hosts(&self) -> Result<Vec<Host>, ClusterError> {
        let response = self
            .request(Method::GET, "/api/v1/nodes")
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = Self::check(response, "List hosts").await?;

        let list: HostList = response.json().await?;
        debug!(host_count = list.items.len(), "Listed hosts");
        Ok(list.items)
    }

    async fn watch_unplaced_units(
        &self,
        selector: &FieldSelector,
    ) -> Result<UnitEventStream, ClusterError> {
        let field_selector = selector.to_string();
        debug!(selector = %field_selector, "Opening unit watch");

        let response = self
            .request(Method::GET, "/api/v1/pods")
            .query(&[("watch", "true"), ("fieldSelector", field_selector.as_str())])
            .send()
            .await?;
        let response = Self::check(response, "Watch units").await?;

        Ok(decode_watch(response))
    }

    async fn bind(&self, binding: &Binding) -> Result<(), ClusterError> {
        let path = format!(
            "/api/v1/namespaces/{}/pods/{}/binding",
            binding.unit_namespace(),
            binding.unit_name()
        );
        let response = self
            .request(Method::POST, &path)
            .json(binding)
            .timeout(self.request_timeout)
            .send()
            .await?;
        Self::check(response, "Bind").await?;
        Ok(())
    }

    async fn record_event(&self, record: &OutcomeRecord) -> Result<(), ClusterError> {
        let path = format!("/api/v1/namespaces/{}/events", record.namespace());
        let response = self
            .request(Method::POST, &path)
            .json(record)
            .timeout(self.request_timeout)
            .send()
            .await?;
        Self::check(response, "Record event").await?;
        Ok(())
    }
}

/// Frame the chunked response body into watch events.
///
/// A body error is yielded once; buffered lines are still drained before the
/// stream ends.
fn decode_watch(response: Response) -> UnitEventStream {
    let body = Box::pin(response.bytes_stream());

    let events = stream::unfold(
        (body, LineDecoder::new(), false),
        |(mut body, mut decoder, mut done)| async move {
            loop {
                if let Some(line) = decoder.next_line() {
                    let event = WatchEvent::decode_line(&line).map_err(ClusterError::from);
                    return Some((event, (body, decoder, done)));
                }
                if done {
                    let event = decoder
                        .finish()
                        .map(|line| WatchEvent::decode_line(&line).map_err(ClusterError::from))?;
                    return Some((event, (body, decoder, done)));
                }
                match body.next().await {
                    Some(Ok(chunk)) => decoder.push(&chunk),
                    Some(Err(e)) => {
                        return Some((Err(ClusterError::from(e)), (body, decoder, true)));
                    }
                    None => done = true,
                }
            }
        },
    );

    Box::pin(events)
}
