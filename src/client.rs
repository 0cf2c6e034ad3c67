//! HTTP client for the run-ingestion REST API.
//!
//! The client is a thin authenticated wrapper over `reqwest`: it knows
//! the endpoint paths (`POST /runs`, `PATCH /runs/{id}`, batch ingest,
//! run read-back, feedback) and maps response statuses onto crate
//! errors. Ordering and lifecycle bookkeeping live in
//! [`RunOrderTracker`](crate::RunOrderTracker), not here.

use std::env;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::feedback::FeedbackCreate;
use crate::run::{Run, RunCreate, RunUpdate};

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "TRACESMITH_API_KEY";

/// Environment variable overriding the service endpoint.
pub const ENDPOINT_ENV: &str = "TRACESMITH_ENDPOINT";

/// Default service endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.tracesmith.dev";

const API_KEY_HEADER: &str = "x-api-key";

/// A batch of run creations and updates for one ingest call.
///
/// Serialized as `{"post": [...], "patch": [...]}`; each patch entry
/// carries the id of the run it closes.
#[derive(Debug, Default)]
pub struct BatchIngest {
    pub post: Vec<RunCreate>,
    pub patch: Vec<(Uuid, RunUpdate)>,
}

impl BatchIngest {
    /// Whether the batch contains nothing to submit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.post.is_empty() && self.patch.is_empty()
    }

    /// Number of operations in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.post.len() + self.patch.len()
    }

    fn to_body(&self) -> Result<Value> {
        let patch: Vec<Value> = self
            .patch
            .iter()
            .map(|(id, update)| {
                let mut value = serde_json::to_value(update)?;
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("id".to_string(), json!(id));
                }
                Ok(value)
            })
            .collect::<Result<_>>()?;
        Ok(json!({ "post": self.post, "patch": patch }))
    }
}

/// Authenticated client for the tracing service.
///
/// # Example
///
/// ```no_run
/// use tracesmith::{Client, RunCreate, RunType};
/// use uuid::Uuid;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::builder().api_key("your-api-key").build()?;
///
///     let run = RunCreate::new(Uuid::new_v4(), "my-chain", RunType::Chain);
///     client.create_run(&run).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl Client {
    /// Start building a client.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// The endpoint this client submits to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Create a run. `POST /runs`.
    pub async fn create_run(&self, run: &RunCreate) -> Result<()> {
        debug!(run_id = %run.id, name = %run.name, "creating run");
        let response = self.authed(self.http.post(self.url("runs")?)).json(run).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// Update (usually close) a run. `PATCH /runs/{id}`.
    ///
    /// The service rejects an update for a run whose `end_time` is
    /// already set; that rejection surfaces as [`Error::Api`].
    pub async fn update_run(&self, run_id: Uuid, update: &RunUpdate) -> Result<()> {
        debug!(run_id = %run_id, "updating run");
        let url = self.url(&format!("runs/{run_id}"))?;
        let response = self.authed(self.http.patch(url)).json(update).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// Submit a batch of creates and updates in one call. `POST /runs/batch`.
    pub async fn batch_ingest_runs(&self, batch: &BatchIngest) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        debug!(
            creates = batch.post.len(),
            updates = batch.patch.len(),
            "batch ingesting runs"
        );
        let body = batch.to_body()?;
        let response = self
            .authed(self.http.post(self.url("runs/batch")?))
            .json(&body)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// Read a run back from the service. `GET /runs/{id}`.
    pub async fn read_run(&self, run_id: Uuid) -> Result<Run> {
        let url = self.url(&format!("runs/{run_id}"))?;
        let response = self.authed(self.http.get(url)).send().await?;
        Self::json_body(response).await
    }

    /// Attach evaluation feedback to a run. `POST /feedback`.
    pub async fn create_feedback(&self, feedback: &FeedbackCreate) -> Result<()> {
        debug!(run_id = %feedback.run_id, key = %feedback.key, "creating feedback");
        let response = self
            .authed(self.http.post(self.url("feedback")?))
            .json(feedback)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.endpoint
            .join(path)
            .map_err(|e| Error::InvalidConfig(format!("cannot build URL for '{path}': {e}")))
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, &self.api_key)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "<no response body>".to_string());
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited(message));
        }
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn json_body<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Builder for [`Client`].
///
/// The API key is required; when not set explicitly it is read from
/// the `TRACESMITH_API_KEY` environment variable. The endpoint falls
/// back to `TRACESMITH_ENDPOINT`, then to the hosted default.
#[derive(Debug, Default)]
pub struct ClientBuilder {
    api_key: Option<String>,
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Set the API key.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the service endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client, validating the endpoint URL.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when no API key is available or the
    /// endpoint is not a valid URL.
    pub fn build(self) -> Result<Client> {
        let api_key = self
            .api_key
            .or_else(|| env::var(API_KEY_ENV).ok())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::InvalidConfig(format!("no API key set and {API_KEY_ENV} is unset"))
            })?;

        let endpoint = self
            .endpoint
            .or_else(|| env::var(ENDPOINT_ENV).ok())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        // A trailing slash keeps Url::join from replacing the last path segment
        let endpoint = if endpoint.ends_with('/') {
            endpoint
        } else {
            format!("{endpoint}/")
        };
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| Error::InvalidConfig(format!("invalid endpoint '{endpoint}': {e}")))?;

        let mut http = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }
        let http = http.build()?;

        Ok(Client {
            http,
            endpoint,
            api_key,
        })
    }
}
