//! Remote per-user document store for calculation records.
//!
//! - `RemoteStore` is the seam the reconciler is generic over; tests plug in
//!   an in-memory fake here.
//! - `CalcApiClient` is the production implementation: a thin asynchronous
//!   client for the calculations document API.

use std::fmt;

use reqwest::{Client, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;

use crate::domain::record::{CalculationRecord, RecordPatch};

const DEFAULT_BASE_URL: &str = "https://api.cargovaluator.app/v1/";
const COLLECTION: &str = "calculations";
const USER_AGENT: &str = "cargo-valuator/1.0.0";

/// Remote operation kind, carried in permission errors for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteOp {
    Create,
    List,
    Update,
    Delete,
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteOp::Create => "create",
            RemoteOp::List => "list",
            RemoteOp::Update => "update",
            RemoteOp::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum RemoteStoreError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The store rejected the operation outright. Terminal for the attempt;
    /// not retried automatically.
    #[error("permission denied: {operation} on {path}")]
    PermissionDenied { operation: RemoteOp, path: String },
    #[error("api error: {0}")]
    Api(String),
}

impl RemoteStoreError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, RemoteStoreError::PermissionDenied { .. })
    }
}

/// Operations the reconciler needs from the per-user document store.
///
/// Records are filtered by owning user and ordered by creation timestamp
/// descending. Push-style subscriptions are the transport's concern; a
/// delivered snapshot is fed back through
/// [`HistoryReconciler::apply_remote_snapshot`](crate::reconciler::HistoryReconciler::apply_remote_snapshot).
#[allow(async_fn_in_trait)] // consumed through generics, never as dyn
pub trait RemoteStore {
    /// Persists a new record and returns its canonical remote id.
    async fn create(&self, record: &CalculationRecord) -> Result<String, RemoteStoreError>;
    /// Full snapshot of the user's records, newest first.
    async fn fetch_all(&self, uid: &str) -> Result<Vec<CalculationRecord>, RemoteStoreError>;
    /// Targeted field update; untouched fields are not transmitted.
    async fn update(&self, id: &str, patch: &RecordPatch) -> Result<(), RemoteStoreError>;
    async fn delete(&self, id: &str) -> Result<(), RemoteStoreError>;
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedDto {
    id: String,
}

/// HTTP client for the hosted calculations API.
#[derive(Clone, Debug)]
pub struct CalcApiClient {
    http: Client,
    base_url: Url,
}

impl CalcApiClient {
    pub fn new() -> Result<Self, RemoteStoreError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base: &str) -> Result<Self, RemoteStoreError> {
        let base_url = Url::parse(base)?;
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, base_url })
    }

    fn collection_url(&self) -> Result<Url, RemoteStoreError> {
        Ok(self.base_url.join(COLLECTION)?)
    }

    fn document_url(&self, id: &str) -> Result<Url, RemoteStoreError> {
        Ok(self.base_url.join(&format!("{COLLECTION}/{id}"))?)
    }

    async fn expect_data<T: DeserializeOwned>(
        response: Response,
        operation: RemoteOp,
        path: String,
    ) -> Result<T, RemoteStoreError> {
        let envelope = Self::unwrap_envelope::<T>(response, operation, path).await?;
        envelope
            .data
            .ok_or_else(|| RemoteStoreError::Api(format!("{operation} response missing data")))
    }

    async fn expect_ok(
        response: Response,
        operation: RemoteOp,
        path: String,
    ) -> Result<(), RemoteStoreError> {
        Self::unwrap_envelope::<serde_json::Value>(response, operation, path).await?;
        Ok(())
    }

    async fn unwrap_envelope<T: DeserializeOwned>(
        response: Response,
        operation: RemoteOp,
        path: String,
    ) -> Result<ApiEnvelope<T>, RemoteStoreError> {
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(RemoteStoreError::PermissionDenied { operation, path });
        }

        let envelope: ApiEnvelope<T> = response.error_for_status()?.json().await?;
        if envelope.status != "ok" {
            return Err(RemoteStoreError::Api(
                envelope
                    .message
                    .unwrap_or_else(|| format!("{operation} rejected by server")),
            ));
        }
        Ok(envelope)
    }
}

impl RemoteStore for CalcApiClient {
    async fn create(&self, record: &CalculationRecord) -> Result<String, RemoteStoreError> {
        let url = self.collection_url()?;
        tracing::debug!(local_id = %record.id, "creating remote calculation");
        let response = self.http.post(url).json(record).send().await?;
        let created: CreatedDto =
            Self::expect_data(response, RemoteOp::Create, COLLECTION.to_string()).await?;
        Ok(created.id)
    }

    async fn fetch_all(&self, uid: &str) -> Result<Vec<CalculationRecord>, RemoteStoreError> {
        let mut url = self.collection_url()?;
        url.query_pairs_mut()
            .append_pair("uid", uid)
            .append_pair("order", "createdAt.desc");
        let response = self.http.get(url).send().await?;
        Self::expect_data(response, RemoteOp::List, COLLECTION.to_string()).await
    }

    async fn update(&self, id: &str, patch: &RecordPatch) -> Result<(), RemoteStoreError> {
        let url = self.document_url(id)?;
        tracing::debug!(%id, "patching remote calculation");
        let response = self.http.patch(url).json(patch).send().await?;
        Self::expect_ok(response, RemoteOp::Update, format!("{COLLECTION}/{id}")).await
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteStoreError> {
        let url = self.document_url(id)?;
        tracing::debug!(%id, "deleting remote calculation");
        let response = self.http.delete(url).send().await?;
        Self::expect_ok(response, RemoteOp::Delete, format!("{COLLECTION}/{id}")).await
    }
}
