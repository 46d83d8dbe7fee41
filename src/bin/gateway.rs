// Copyright 2025 Daniel Gehriger
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Signing Gateway Server
//!
//! Serves the remote signing workflow over HTTP. The browser configures a
//! signature, relays the data to sign to the local signing agent and posts
//! the signature value back; the gateway assembles the signed document.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use signing_gateway::{
    build_routes, ConfigManager, CryptoEngine, ExportFormat, GatewayConfiguration, GatewayState,
    InMemorySessionStore, LocalCryptoEngine,
};
use warp::Filter;

#[derive(Parser)]
#[command(name = "signing-gateway")]
#[command(about = "Remote signing gateway for browser-based signing with an external agent")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind to, overrides the configuration file
    #[arg(short, long)]
    bind: Option<String>,

    /// URL of the signing agent handed to the browser
    #[arg(long, env = "SIGNING_GATEWAY_NEXU_URL")]
    nexu_url: Option<String>,

    /// Where users download the signing agent
    #[arg(long, env = "SIGNING_GATEWAY_DOWNLOAD_URL")]
    download_url: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Export configuration
    Export {
        /// Export format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum ExportFormatArg {
    Toml,
    Json,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Toml => ExportFormat::Toml,
            ExportFormatArg::Json => ExportFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    if let Some(Commands::Config(command)) = cli.command {
        return handle_config_command(&manager, command);
    }

    let mut config = manager
        .load_or_create_default()
        .with_context(|| format!("loading {}", manager.config_path().display()))?;

    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }
    if let Some(url) = cli.nexu_url {
        config.nexu_url = url;
    }
    if let Some(url) = cli.download_url {
        config.download_nexu_url = url;
    }
    config.validate()?;

    serve(config).await
}

async fn serve(config: GatewayConfiguration) -> anyhow::Result<()> {
    let addr = config.bind_socket_addr()?;

    let engine: Arc<dyn CryptoEngine> = if config.use_mock_tsp {
        Arc::new(LocalCryptoEngine::new())
    } else {
        log::warn!("No timestamp source configured; content timestamp requests will fail");
        Arc::new(LocalCryptoEngine::without_timestamps())
    };
    let sessions = Arc::new(InMemorySessionStore::new(Duration::from_secs(
        config.session_ttl_seconds,
    )));
    let state = Arc::new(GatewayState::new(&config, engine, sessions));

    let routes = build_routes(state).with(warp::log("signing_gateway::http"));

    let (bound, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {e}");
            }
        })
        .with_context(|| format!("binding {addr}"))?;

    log::info!("Signing gateway listening on http://{bound}");
    log::info!("   Signing agent: {}", config.nexu_url);
    log::info!("   Endpoints: /sign-a-digest, /sign-multiple-documents");

    server.await;
    log::info!("Signing gateway stopped");
    Ok(())
}

fn handle_config_command(manager: &ConfigManager, command: ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = manager.load_or_create_default()?;
            println!("Current configuration ({}):", manager.config_path().display());
            println!("  Bind address: {}", config.bind_address);
            println!("  Signing agent URL: {}", config.nexu_url);
            println!("  Agent download URL: {}", config.download_nexu_url);
            println!("  Session TTL: {}s", config.session_ttl_seconds);
            println!("  Mock TSP: {}", config.use_mock_tsp);
            println!("  Max upload: {} bytes", config.max_upload_bytes);
        }

        ConfigCommands::Set { key, value } => {
            manager.load_or_create_default()?;
            manager.update_value(&key, &value)?;
            println!("Configuration updated: {key} = {value}");
        }

        ConfigCommands::Export { format, output } => {
            manager.load_or_create_default()?;
            let content = manager.export_config(format.into())?;
            if let Some(output_path) = output {
                std::fs::write(&output_path, content)
                    .with_context(|| format!("writing {}", output_path.display()))?;
                println!("Configuration exported to: {}", output_path.display());
            } else {
                println!("{content}");
            }
        }
    }
    Ok(())
}
