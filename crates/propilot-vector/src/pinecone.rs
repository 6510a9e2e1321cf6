//! Pinecone control plane client.
//!
//! Startup only needs three calls: list indexes, create the index when it
//! is missing, and describe it to learn its data plane host. Each call is
//! retried on transient failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use propilot_types::{PineconeSettings, VectorBackend};

use crate::error::VectorError;
use crate::retry::{with_retry, RetryPolicy};
use crate::store::{VectorStoreHandle, VectorStoreProvider};

/// API version pinned for control plane requests
const API_VERSION: &str = "2024-07";

/// Pod type used when creating pod-based indexes
const DEFAULT_POD_TYPE: &str = "p1.x1";

/// Readiness reported by the control plane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub state: String,
}

/// An index as returned by `GET /indexes` and `GET /indexes/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    #[serde(default)]
    pub dimension: Option<u32>,
    #[serde(default)]
    pub metric: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum IndexSpec {
    Pod {
        environment: String,
        pod_type: String,
        pods: u32,
    },
    Serverless {
        cloud: String,
        region: String,
    },
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest {
    name: String,
    dimension: u32,
    metric: String,
    spec: IndexSpec,
}

/// Handle to a named remote index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PineconeIndex {
    pub name: String,
    /// Data plane host, e.g. "propilot-index-abc123.svc.us-east1-gcp.pinecone.io"
    pub host: String,
    pub dimension: Option<u32>,
    pub metric: Option<String>,
}

impl From<IndexDescription> for PineconeIndex {
    fn from(desc: IndexDescription) -> Self {
        Self {
            name: desc.name,
            host: desc.host,
            dimension: desc.dimension,
            metric: desc.metric,
        }
    }
}

/// Creates the configured index if needed and opens a handle to it.
pub struct PineconeProvider {
    client: Client,
    api_key: SecretString,
    settings: PineconeSettings,
    retry: RetryPolicy,
}

impl PineconeProvider {
    /// Build a provider. A missing API key is sent as an empty header and
    /// rejected by the service on first use.
    pub fn new(settings: &PineconeSettings) -> Result<Self, VectorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| VectorError::Config(e.to_string()))?;

        if settings.api_key.is_none() {
            warn!("PINECONE_API_KEY is not set; control plane calls will be rejected");
        }

        Ok(Self {
            client,
            api_key: SecretString::from(settings.api_key.clone().unwrap_or_default()),
            settings: settings.clone(),
            retry: RetryPolicy::from_settings(settings),
        })
    }

    /// Override the retry policy (tests use millisecond backoff).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{}",
            self.settings.controller_url.trim_end_matches('/'),
            path
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", self.api_key.expose_secret())
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    fn create_request(&self) -> CreateIndexRequest {
        let spec = match &self.settings.environment {
            Some(environment) => IndexSpec::Pod {
                environment: environment.clone(),
                pod_type: DEFAULT_POD_TYPE.to_string(),
                pods: 1,
            },
            None => IndexSpec::Serverless {
                cloud: self.settings.cloud.clone(),
                region: self.settings.region.clone(),
            },
        };

        CreateIndexRequest {
            name: self.settings.index_name.clone(),
            dimension: self.settings.dimension,
            metric: self.settings.metric.clone(),
            spec,
        }
    }

    /// Names and hosts of every index in the project.
    pub async fn list_indexes(&self) -> Result<Vec<IndexDescription>, VectorError> {
        with_retry(&self.retry, "list_indexes", move || async move {
            let response = self
                .authorized(self.client.get(self.url("/indexes")))
                .send()
                .await?;
            let list: IndexList = check_status(response).await?.json().await?;
            Ok(list.indexes)
        })
        .await
    }

    /// Create the configured index. A concurrent creation (409) is success.
    pub async fn create_index(&self) -> Result<(), VectorError> {
        let request = self.create_request();
        info!(
            index = %request.name,
            dimension = request.dimension,
            metric = %request.metric,
            "Creating Pinecone index"
        );

        let body = &request;
        let result = with_retry(&self.retry, "create_index", move || async move {
            let response = self
                .authorized(self.client.post(self.url("/indexes")))
                .json(body)
                .send()
                .await?;
            check_status(response).await?;
            Ok(())
        })
        .await;

        match result {
            Err(VectorError::Rejected { status: 409, .. }) => {
                info!(index = %request.name, "Index already exists");
                Ok(())
            }
            other => other,
        }
    }

    /// Describe a single index.
    pub async fn describe_index(&self, name: &str) -> Result<IndexDescription, VectorError> {
        with_retry(&self.retry, "describe_index", move || async move {
            let response = self
                .authorized(self.client.get(self.url(&format!("/indexes/{}", name))))
                .send()
                .await?;
            let desc: IndexDescription = check_status(response).await?.json().await?;
            Ok(desc)
        })
        .await
    }
}

async fn check_status(response: Response) -> Result<Response, VectorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(VectorError::from_status(status.as_u16(), body))
}

#[async_trait]
impl VectorStoreProvider for PineconeProvider {
    fn backend(&self) -> VectorBackend {
        VectorBackend::Pinecone
    }

    async fn ensure_store(&self) -> Result<(), VectorError> {
        let indexes = self.list_indexes().await?;
        let name = &self.settings.index_name;

        if indexes.iter().any(|index| &index.name == name) {
            info!(index = %name, "Pinecone index exists");
            return Ok(());
        }
        self.create_index().await
    }

    async fn open_handle(&self) -> Result<VectorStoreHandle, VectorError> {
        let desc = self.describe_index(&self.settings.index_name).await?;
        match &desc.status {
            Some(status) if !status.ready => {
                warn!(index = %desc.name, state = %status.state, "Pinecone index is not ready yet");
            }
            _ => {}
        }
        if desc.host.is_empty() {
            warn!(index = %desc.name, "Pinecone index has no data plane host yet");
        }
        info!(index = %desc.name, host = %desc.host, "Opened Pinecone index");
        Ok(VectorStoreHandle::Pinecone(desc.into()))
    }
}
