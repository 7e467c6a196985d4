#![forbid(unsafe_code)]

use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use quantboard_api::{CollectionApi, FirestoreApi};
use quantboard_gui::UiSettings;
use tracing::{error, info};

mod config;
use config::Config;

fn init_tracing() {
    let env = std::env::var("QB_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("QB_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid QB_METRICS_ADDR; expected host:port");
        }
    }
}

fn connect(cfg: &Config) -> anyhow::Result<(Arc<dyn CollectionApi>, quantboard_api::CollectionPath)> {
    let path = cfg.collection_path()?;
    let client = cfg.client_config()?;
    info!(
        project = %client.project_id,
        database = %client.database,
        emulator = client.emulator_host.is_some(),
        path = %path,
        poll_ms = cfg.poll_ms,
        "app: configured"
    );
    let api = FirestoreApi::new(client, cfg.poll_interval())?;
    Ok((Arc::new(api), path))
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    init_tracing();
    init_metrics();
    let cfg = Config::parse();
    let settings = UiSettings::from_env();

    let res = match connect(&cfg) {
        Ok((api, path)) => quantboard_gui::run_native(api, path, settings),
        Err(e) => {
            error!(error = %format!("{e:#}"), "app: setup failed");
            quantboard_gui::run_native_error(format!("{e:#}"), settings)
        }
    };
    if let Err(e) = res {
        eprintln!("GUI error: {}", e);
        std::process::exit(1);
    }
}
