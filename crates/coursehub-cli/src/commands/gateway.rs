//! Gateway command - start and health-check the account service.

use std::time::Duration;

use anyhow::Result;
use coursehub_gateway::GatewayConfig;

use crate::ui;

/// Gateway command arguments.
#[derive(Debug, Clone)]
pub struct GatewayArgs {
    /// Subcommand.
    pub action: GatewayAction,
}

/// Gateway actions.
#[derive(Debug, Clone)]
pub enum GatewayAction {
    /// Serve until Ctrl-C.
    Run {
        /// Port to listen on.
        port: Option<u16>,
        /// Bind address.
        bind: Option<String>,
    },
    /// Health-check a running instance.
    Status,
}

/// Run the gateway command.
pub async fn run_gateway(args: GatewayArgs) -> Result<()> {
    match args.action {
        GatewayAction::Run { port, bind } => run_gateway_server(port, bind).await,
        GatewayAction::Status => gateway_status().await,
    }
}

fn load_config() -> coursehub_core::Config {
    match coursehub_core::Config::load_default() {
        Ok(config) => config,
        Err(e) => {
            ui::warning(&format!("Could not load configuration ({e}), using defaults"));
            coursehub_core::Config::default()
        }
    }
}

/// Resolve a `--bind` value to an address.
fn bind_address(bind: &str) -> String {
    match bind {
        "loopback" | "local" => "127.0.0.1".to_string(),
        "lan" | "public" => "0.0.0.0".to_string(),
        addr => addr.to_string(),
    }
}

async fn run_gateway_server(port: Option<u16>, bind: Option<String>) -> Result<()> {
    let core = load_config();
    let mut config = GatewayConfig::from(&core).with_env_overrides();

    if let Some(port) = port {
        config.port = port;
    }
    if let Some(bind) = bind {
        config.bind_address = bind_address(&bind);
    }

    ui::header("Starting CourseHub Gateway");
    ui::kv("Address", &format!("{}:{}", config.bind_address, config.port));
    ui::kv(
        "Session cache",
        if config.cache_url.is_some() { "redis" } else { "in-process" },
    );
    ui::kv("Data", &config.data_dir.display().to_string());
    println!();
    ui::info("Press Ctrl+C to stop");

    coursehub_gateway::start(config).await?;
    Ok(())
}

async fn gateway_status() -> Result<()> {
    ui::header("Gateway Status");

    let port = load_config().gateway.port;
    let url = format!("http://127.0.0.1:{port}/health");

    let client = reqwest::Client::new();
    match client
        .get(&url)
        .timeout(Duration::from_secs(2))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            ui::success(&format!("Gateway is running on port {port}"));
        }
        Ok(resp) => {
            ui::warning(&format!("Health check returned {}", resp.status()));
        }
        Err(_) => {
            ui::warning(&format!("Gateway is not running on port {port}"));
            ui::info("Start with: coursehub gateway run");
        }
    }

    Ok(())
}
