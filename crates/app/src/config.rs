#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use quantboard_api::{ClientConfig, CollectionPath, Credentials};

#[derive(Parser, Debug, Clone)]
#[command(name = "quantboard", version, about = "Live dashboard of pre-validated quant strategies")]
pub struct Config {
    /// Firestore project id
    #[arg(long = "project-id", env = "QB_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Firestore database id
    #[arg(long = "database", env = "QB_DATABASE", default_value = "(default)")]
    pub database: String,

    /// App id used to derive `artifacts/{app_id}/public/data/{collection}`
    #[arg(long = "app-id", env = "QB_APP_ID")]
    pub app_id: Option<String>,

    /// Collection name under the app's public data
    #[arg(long = "collection", env = "QB_COLLECTION", default_value = "quant_strategies")]
    pub collection: String,

    /// Full collection path; overrides --app-id/--collection
    #[arg(long = "collection-path", env = "QB_COLLECTION_PATH")]
    pub collection_path: Option<String>,

    /// OAuth bearer token
    #[arg(long = "access-token", env = "QB_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// File holding an OAuth bearer token
    #[arg(long = "access-token-file", env = "QB_ACCESS_TOKEN_FILE")]
    pub access_token_file: Option<PathBuf>,

    /// Web API key, sent as `key=` query parameter
    #[arg(long = "api-key", env = "QB_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// `host:port` of a Firestore emulator
    #[arg(long = "emulator-host", env = "FIRESTORE_EMULATOR_HOST")]
    pub emulator_host: Option<String>,

    /// Change polling interval in milliseconds
    #[arg(long = "poll-ms", env = "QB_POLL_MS", default_value_t = 2000)]
    pub poll_ms: u64,

    /// Documents per list page
    #[arg(long = "page-size", env = "QB_PAGE_SIZE", default_value_t = 300)]
    pub page_size: u32,

    /// Per-request HTTP timeout in seconds
    #[arg(long = "http-timeout-secs", env = "QB_HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms.max(100))
    }

    /// Collection to watch: the explicit path, else the per-app public path.
    pub fn collection_path(&self) -> Result<CollectionPath> {
        if let Some(p) = self.collection_path.as_deref() {
            return p.parse().with_context(|| format!("invalid --collection-path {p:?}"));
        }
        let Some(app_id) = self.app_id.as_deref().filter(|s| !s.trim().is_empty()) else {
            bail!("either --app-id or --collection-path is required");
        };
        CollectionPath::for_app(app_id.trim(), &self.collection)
            .with_context(|| format!("invalid app id {app_id:?} or collection {:?}", self.collection))
    }

    pub fn credentials(&self) -> Result<Credentials> {
        let bearer_token = match (&self.access_token, &self.access_token_file) {
            (Some(t), _) => Some(t.trim().to_string()),
            (None, Some(path)) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading access token file {}", path.display()))?;
                Some(raw.trim().to_string())
            }
            (None, None) => None,
        }
        .filter(|t| !t.is_empty());
        let api_key = self.api_key.as_ref().map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
        Ok(Credentials { bearer_token, api_key })
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        let Some(project_id) = self.project_id.as_deref().filter(|s| !s.trim().is_empty()) else {
            bail!("--project-id (or QB_PROJECT_ID) is required");
        };
        let mut cfg = ClientConfig::new(project_id.trim());
        cfg.database = self.database.clone();
        cfg.emulator_host = self.emulator_host.clone().filter(|h| !h.trim().is_empty());
        cfg.credentials = self.credentials()?;
        cfg.page_size = self.page_size.max(1);
        cfg.timeout = Duration::from_secs(self.http_timeout_secs.max(1));
        Ok(cfg)
    }
}
