//! Bulk upload of recorded locations.
//!
//! All records go out in one POST as a JSON array of [`WireLocation`]s. The
//! request carries an `Idempotency-Key` derived from the record ids, so
//! re-sending the same set after a failure is safe for servers that
//! deduplicate on it.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::record::{LocationRecord, WireLocation};

/// Header carrying the deduplication key.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// HTTP status returned by the endpoint.
    pub status: u16,
    /// Response body as text.
    pub body: String,
    /// Number of records sent.
    pub record_count: usize,
    /// Key sent in the idempotency header.
    pub idempotency_key: String,
}

/// Compute the idempotency key for a batch: the BLAKE3 digest of the record
/// ids in order.
#[must_use]
pub fn idempotency_key(records: &[LocationRecord]) -> String {
    let mut hasher = blake3::Hasher::new();
    for record in records {
        hasher.update(record.id.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// HTTP client for the upload endpoint.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUploader {
    /// Create an uploader posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("geotrail/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// The endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send `records` in a single request.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the request fails in transit and
    /// `Error::UploadRejected` if the endpoint answers with a non-2xx status.
    pub async fn upload(&self, records: &[LocationRecord]) -> Result<UploadReceipt> {
        let payload: Vec<WireLocation> = records.iter().map(LocationRecord::to_wire).collect();
        let key = idempotency_key(records);
        info!(
            "Uploading {} locations to {}",
            payload.len(),
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(IDEMPOTENCY_HEADER, &key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                warn!("Upload to {} failed: {}", self.endpoint, e);
                Error::Http(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!("Upload rejected with status {}", status);
            return Err(Error::UploadRejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Upload response: {}", body);
        Ok(UploadReceipt {
            status: status.as_u16(),
            body,
            record_count: records.len(),
            idempotency_key: key,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;

    /// A request captured by [`spawn_endpoint`].
    #[derive(Debug, Clone)]
    pub(crate) struct Received {
        pub content_type: Option<String>,
        pub idempotency_key: Option<String>,
        pub body: serde_json::Value,
    }

    #[derive(Clone)]
    struct EndpointState {
        status: StatusCode,
        received: Arc<Mutex<Vec<Received>>>,
    }

    async fn accept(
        State(state): State<EndpointState>,
        headers: HeaderMap,
        body: String,
    ) -> (StatusCode, &'static str) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        state.received.lock().unwrap().push(Received {
            content_type: header("content-type"),
            idempotency_key: header("idempotency-key"),
            body: serde_json::from_str(&body).unwrap(),
        });
        let reply = if state.status.is_success() {
            "stored"
        } else {
            "try later"
        };
        (state.status, reply)
    }

    /// Start a local endpoint answering `/locations` with `status`.
    pub(crate) async fn spawn_endpoint(status: StatusCode) -> (String, Arc<Mutex<Vec<Received>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/locations", post(accept))
            .with_state(EndpointState {
                status,
                received: received.clone(),
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/locations"), received)
    }

    fn records() -> Vec<LocationRecord> {
        vec![
            LocationRecord::new(42.5, -71.0, Some("Harbor".to_string())).unwrap(),
            LocationRecord::new(1.0, 2.25, None).unwrap(),
        ]
    }

    #[test]
    fn test_idempotency_key_is_stable() {
        let batch = records();
        assert_eq!(idempotency_key(&batch), idempotency_key(&batch.clone()));
        assert_eq!(idempotency_key(&batch).len(), 64);

        let other = records();
        assert_ne!(idempotency_key(&batch), idempotency_key(&other));
    }

    #[tokio::test]
    async fn test_upload_sends_stringified_array() {
        let (url, received) = spawn_endpoint(StatusCode::CREATED).await;
        let uploader = HttpUploader::new(&url, Duration::from_secs(5)).unwrap();
        let batch = records();

        let receipt = uploader.upload(&batch).await.unwrap();
        assert_eq!(receipt.status, 201);
        assert_eq!(receipt.body, "stored");
        assert_eq!(receipt.record_count, 2);

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let request = &received[0];
        assert_eq!(request.content_type.as_deref(), Some("application/json"));
        assert_eq!(
            request.idempotency_key.as_deref(),
            Some(receipt.idempotency_key.as_str())
        );
        assert_eq!(
            request.body,
            serde_json::json!([
                {"latitude": "42.5", "longitude": "-71", "address": "Harbor"},
                {"latitude": "1", "longitude": "2.25"}
            ])
        );
    }

    #[tokio::test]
    async fn test_upload_empty_sends_empty_array() {
        let (url, received) = spawn_endpoint(StatusCode::OK).await;
        let uploader = HttpUploader::new(&url, Duration::from_secs(5)).unwrap();

        let receipt = uploader.upload(&[]).await.unwrap();
        assert_eq!(receipt.record_count, 0);
        assert_eq!(received.lock().unwrap()[0].body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_upload_non_success_is_rejected() {
        let (url, _received) = spawn_endpoint(StatusCode::SERVICE_UNAVAILABLE).await;
        let uploader = HttpUploader::new(&url, Duration::from_secs(5)).unwrap();

        let err = uploader.upload(&records()).await.unwrap_err();
        match err {
            Error::UploadRejected { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "try later");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_upload_connection_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let uploader =
            HttpUploader::new(format!("http://{addr}/locations"), Duration::from_secs(2)).unwrap();
        let err = uploader.upload(&records()).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        assert!(err.is_retryable());
    }
}
