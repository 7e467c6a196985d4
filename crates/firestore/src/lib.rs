//! Quantboard firestore: read-only access to one collection over the
//! Firestore REST surface, plus a change watcher that re-delivers the full
//! listing whenever the collection changes.

#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use anyhow::Context;
use metrics::histogram;
use quantboard_core::{Document, Listing};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use url::Url;

mod path;
pub mod value;
mod watch;

pub use path::{CollectionPath, PathError};
pub use watch::{Fingerprint, Watcher};

const PRODUCTION_BASE: &str = "https://firestore.googleapis.com/v1/";
const EMULATOR_TOKEN: &str = "owner";

/// How requests authenticate. Sourcing the secret is the caller's concern.
#[derive(Clone, Default)]
pub struct Credentials {
    pub bearer_token: Option<String>,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "***"))
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.bearer_token.is_none() && self.api_key.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub project_id: String,
    pub database: String,
    /// `host:port` of a local emulator; switches to plain HTTP and emulator auth.
    pub emulator_host: Option<String>,
    pub credentials: Credentials,
    pub page_size: u32,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl ClientConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: "(default)".to_string(),
            emulator_host: None,
            credentials: Credentials::default(),
            page_size: 300,
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FirestoreError {
    #[error("credentials rejected ({status}): {body}")]
    Unauthorized { status: u16, body: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unreachable: {0}")]
    Unreachable(String),
    #[error("http {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("decode: {0:#}")]
    Decode(anyhow::Error),
    #[error("transport: {0}")]
    Transport(String),
}

impl From<reqwest_middleware::Error> for FirestoreError {
    fn from(e: reqwest_middleware::Error) -> Self {
        match e {
            reqwest_middleware::Error::Reqwest(re) => re.into(),
            reqwest_middleware::Error::Middleware(me) => FirestoreError::Transport(format!("{:#}", me)),
        }
    }
}

impl From<reqwest::Error> for FirestoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            FirestoreError::Unreachable(e.to_string())
        } else if e.is_decode() {
            FirestoreError::Decode(anyhow::Error::new(e))
        } else {
            FirestoreError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
    update_time: Option<String>,
}

impl RawDocument {
    fn into_document(self) -> anyhow::Result<Document> {
        let fields = value::decode_fields(&self.fields).with_context(|| format!("document {}", self.name))?;
        Ok(Document {
            id: value::document_id(&self.name).to_string(),
            fields,
            update_time: self.update_time,
        })
    }
}

/// Thin REST client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FirestoreClient {
    http: ClientWithMiddleware,
    base: Url,
    cfg: ClientConfig,
}

impl FirestoreClient {
    pub fn new(cfg: ClientConfig) -> Result<Self, FirestoreError> {
        if cfg.project_id.trim().is_empty() {
            return Err(FirestoreError::Config("project id is empty".into()));
        }
        if cfg.emulator_host.is_none() && cfg.credentials.is_empty() {
            return Err(FirestoreError::Config("no access token or api key configured".into()));
        }
        let base = match cfg.emulator_host.as_deref() {
            Some(host) => Url::parse(&format!("http://{}/v1/", host)),
            None => Url::parse(PRODUCTION_BASE),
        }
        .map_err(|e| FirestoreError::Config(format!("base url: {}", e)))?;
        let inner = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| FirestoreError::Config(format!("http client: {}", e)))?;
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(500), Duration::from_secs(5))
            .build_with_max_retries(cfg.max_retries);
        let http = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        Ok(Self { http, base, cfg })
    }

    pub fn config(&self) -> &ClientConfig { &self.cfg }

    /// `{base}/projects/{p}/databases/{db}/documents/{collection path}`
    pub fn collection_url(&self, path: &CollectionPath) -> Result<Url, FirestoreError> {
        let mut url = self.base.clone();
        {
            let mut segs = url
                .path_segments_mut()
                .map_err(|_| FirestoreError::Config("base url cannot hold a path".into()))?;
            segs.pop_if_empty();
            segs.extend(["projects", self.cfg.project_id.as_str(), "databases", self.cfg.database.as_str(), "documents"]);
            segs.extend(path.segments().iter().map(String::as_str));
        }
        Ok(url)
    }

    /// List every document of the collection, following page tokens.
    pub async fn list_documents(&self, path: &CollectionPath) -> Result<Listing, FirestoreError> {
        let t0 = Instant::now();
        let url = self.collection_url(path)?;
        let mut out: Listing = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;
        loop {
            let mut req = self.http.get(url.clone()).query(&[("pageSize", self.cfg.page_size.to_string())]);
            if let Some(tok) = page_token.as_deref() {
                req = req.query(&[("pageToken", tok)]);
            }
            if let Some(key) = self.cfg.credentials.api_key.as_deref() {
                req = req.query(&[("key", key)]);
            }
            if self.cfg.emulator_host.is_some() {
                req = req.bearer_auth(EMULATOR_TOKEN);
            } else if let Some(token) = self.cfg.credentials.bearer_token.as_deref() {
                req = req.bearer_auth(token);
            }
            let resp = req.send().await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(classify_status(status, body, path));
            }
            let page: ListResponse = resp.json().await?;
            pages += 1;
            for raw in page.documents {
                out.push(raw.into_document().map_err(FirestoreError::Decode)?);
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }
        histogram!("firestore_list_ms").record(t0.elapsed().as_secs_f64() * 1000.0);
        debug!(path = %path, docs = out.len(), pages, took_ms = %t0.elapsed().as_millis(), "firestore: listed collection");
        Ok(out)
    }

    /// Start a change watcher for a collection.
    pub fn watcher(&self, path: CollectionPath, interval: Duration) -> Watcher {
        info!(path = %path, interval_ms = %interval.as_millis(), "firestore: watcher created");
        Watcher::new(self.clone(), path, interval)
    }
}

fn classify_status(status: StatusCode, body: String, path: &CollectionPath) -> FirestoreError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FirestoreError::Unauthorized { status: status.as_u16(), body },
        StatusCode::NOT_FOUND => FirestoreError::NotFound(format!("{} ({})", path, body.trim())),
        _ => FirestoreError::Status { status: status.as_u16(), body },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(emulator: Option<&str>) -> FirestoreClient {
        let mut cfg = ClientConfig::new("demo-proj");
        cfg.emulator_host = emulator.map(String::from);
        cfg.credentials.bearer_token = Some("tok".into());
        FirestoreClient::new(cfg).unwrap()
    }

    #[test]
    fn collection_url_for_production_and_emulator() {
        let path: CollectionPath = "artifacts/app/public/data/quant_strategies".parse().unwrap();
        let url = client(None).collection_url(&path).unwrap();
        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/demo-proj/databases/(default)/documents/artifacts/app/public/data/quant_strategies"
        );
        let url = client(Some("localhost:8080")).collection_url(&path).unwrap();
        assert!(url.as_str().starts_with("http://localhost:8080/v1/projects/demo-proj/"));
    }

    #[test]
    fn missing_credentials_rejected_outside_emulator() {
        let cfg = ClientConfig::new("p");
        assert!(matches!(FirestoreClient::new(cfg), Err(FirestoreError::Config(_))));
        let mut emu = ClientConfig::new("p");
        emu.emulator_host = Some("localhost:8080".into());
        assert!(FirestoreClient::new(emu).is_ok());
    }

    #[test]
    fn list_response_page_decodes_documents() {
        let page: ListResponse = serde_json::from_value(json!({
            "documents": [{
                "name": "projects/p/databases/(default)/documents/artifacts/a/public/data/quant_strategies/doc1",
                "fields": {
                    "Strategy_Name": { "stringValue": "RSI 14" },
                    "Performance_Metrics": { "mapValue": { "fields": {
                        "Sharpe_Ratio": { "doubleValue": 0.5 },
                        "Profit_Factor": { "integerValue": "2" }
                    } } }
                },
                "createTime": "2024-01-01T00:00:00Z",
                "updateTime": "2024-01-02T00:00:00Z"
            }],
            "nextPageToken": ""
        }))
        .unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some(""));
        let doc = page.documents.into_iter().next().unwrap().into_document().unwrap();
        assert_eq!(doc.id, "doc1");
        assert_eq!(doc.update_time.as_deref(), Some("2024-01-02T00:00:00Z"));
        assert_eq!(doc.fields["Strategy_Name"], json!("RSI 14"));
        assert_eq!(doc.fields["Performance_Metrics"], json!({ "Sharpe_Ratio": 0.5, "Profit_Factor": 2 }));
    }

    #[test]
    fn empty_collection_page_has_no_documents() {
        let page: ListResponse = serde_json::from_value(json!({})).unwrap();
        assert!(page.documents.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn status_classification() {
        let path: CollectionPath = "c".parse().unwrap();
        assert!(matches!(classify_status(StatusCode::FORBIDDEN, String::new(), &path), FirestoreError::Unauthorized { status: 403, .. }));
        assert!(matches!(classify_status(StatusCode::NOT_FOUND, String::new(), &path), FirestoreError::NotFound(_)));
        assert!(matches!(classify_status(StatusCode::INTERNAL_SERVER_ERROR, "x".into(), &path), FirestoreError::Status { status: 500, .. }));
    }
}
