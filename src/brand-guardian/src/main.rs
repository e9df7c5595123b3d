//! Brand Guardian: brand-compliance validation engine.
//!
//! Serves the REST API or runs a one-shot validation pass from a JSON file.

use anyhow::Context;
use brand_api::ApiServer;
use brand_compliance::{ComplianceEngine, RuleRegistry, ValidationOptions, ValidatorRegistry};
use brand_core::config::AppConfig;
use brand_core::{Asset, BrandIdentity, ValidationContext};
use brand_monitoring::{MonitoringManager, StaticAssetSource};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "brand-guardian")]
#[command(about = "Validate creative assets against brand rules")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "BRAND_GUARDIAN__NODE_ID")]
    node_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API and metrics exporter
    Serve {
        /// HTTP port (overrides config)
        #[arg(long, env = "BRAND_GUARDIAN__API__HTTP_PORT")]
        http_port: Option<u16>,

        /// Metrics port (overrides config)
        #[arg(long, env = "BRAND_GUARDIAN__METRICS__PORT")]
        metrics_port: Option<u16>,
    },
    /// Run one validation pass and print the report
    Validate {
        /// JSON file with `assets`, `brand`, and optional `context`/`options`
        #[arg(long, short)]
        input: PathBuf,

        /// Pretty-print the report
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Print the default rule set
    Rules,
}

#[derive(Debug, Deserialize)]
struct ValidateInput {
    assets: Vec<Asset>,
    brand: BrandIdentity,
    #[serde(default)]
    context: Option<ValidationContext>,
    #[serde(default)]
    options: ValidationOptions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "brand_guardian=info,brand_compliance=info,tower_http=info".into()
            }),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }

    let engine = ComplianceEngine::new(
        RuleRegistry::with_default_rules(),
        ValidatorRegistry::with_builtins(),
        config.compliance.clone(),
    );

    match cli.command {
        Command::Serve {
            http_port,
            metrics_port,
        } => {
            if let Some(port) = http_port {
                config.api.http_port = port;
            }
            if let Some(port) = metrics_port {
                config.metrics.port = port;
            }
            serve(config, engine).await
        }
        Command::Validate { input, pretty } => validate(&engine, input, pretty).await,
        Command::Rules => {
            let rules = engine.registry().snapshot();
            println!("{}", serde_json::to_string_pretty(rules.as_ref())?);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, engine: ComplianceEngine) -> anyhow::Result<()> {
    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        rules = engine.registry().len(),
        "Configuration loaded"
    );

    let monitoring = Arc::new(MonitoringManager::new(
        engine.clone(),
        Arc::new(StaticAssetSource::new()),
        Arc::new(brand_core::event_bus::LogSink),
        config.monitoring.clone(),
    ));

    let api_server = ApiServer::new(config, engine, monitoring);

    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Brand Guardian is ready to serve traffic");

    api_server.start_http().await
}

async fn validate(engine: &ComplianceEngine, input: PathBuf, pretty: bool) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    let request: ValidateInput = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", input.display()))?;

    let context = request
        .context
        .unwrap_or_else(|| ValidationContext::for_brand(request.brand.id.clone()));

    let report = engine
        .validate(&request.assets, &request.brand, &context, &request.options)
        .await?;

    let out = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{out}");
    Ok(())
}
