//! ragquery CLI
//!
//! Command-line interface for running the query service.

use clap::{Parser, Subcommand};
use std::path::Path;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ragquery::{
    ApiServer, AppState, Error, HealthResponse, MetricsService, QueryContext, Result,
    ServiceConfig,
};

#[derive(Parser)]
#[command(name = "ragquery")]
#[command(author, version, about = "Retrieval-augmented query service", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config.toml")]
        output: String,
    },

    /// Start the HTTP API
    Serve {
        /// HTTP API listen address (overrides the config file)
        #[arg(long)]
        api_addr: Option<String>,

        /// Do not expose /metrics
        #[arg(long, default_value = "false")]
        no_metrics: bool,
    },

    /// Run a single query locally and print the JSON response
    Query {
        /// Prompt text
        prompt: String,

        /// Number of records to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<u64>,
    },

    /// Check service health
    Health {
        /// API endpoint to check
        #[arg(long, default_value = "http://localhost:5000")]
        endpoint: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: &str) -> Result<ServiceConfig> {
    if Path::new(path).exists() {
        info!("Loading configuration from: {}", path);
        ServiceConfig::load(path)
    } else {
        info!("Using default configuration");
        Ok(ServiceConfig::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Init { output } => {
            info!("Writing default configuration to: {}", output);
            ServiceConfig::default().save(&output)?;
            info!("Configuration saved successfully");
        }

        Commands::Serve {
            api_addr,
            no_metrics,
        } => {
            info!("Starting query service...");

            let mut config = load_config(&cli.config)?;
            if let Some(addr) = api_addr {
                config.api.listen_address = addr;
            }
            config.validate()?;

            // 1. Load embedder, index and store once for the process lifetime
            let context = QueryContext::from_config(&config).await?;

            // 2. Shared state for the API server
            let mut state = AppState::new(context.query_service(&config));
            if !no_metrics {
                match MetricsService::install() {
                    Ok(metrics) => state = state.with_metrics(metrics),
                    Err(e) => warn!("Metrics disabled: {}", e),
                }
            }

            // 3. Serve until Ctrl+C
            let server = ApiServer::with_state(config.api.clone(), state);
            info!("Press Ctrl+C to stop");
            server
                .run(async {
                    if let Err(e) = signal::ctrl_c().await {
                        error!("Failed to listen for shutdown signal: {}", e);
                    }
                    info!("Received shutdown signal");
                })
                .await?;
        }

        Commands::Query { prompt, top_k } => {
            let config = load_config(&cli.config)?;
            let context = QueryContext::from_config(&config).await?;
            let service = context.query_service(&config);

            let mut body = serde_json::json!({ "prompt": prompt });
            if let Some(k) = top_k {
                body["top_k"] = k.into();
            }

            let reply = service.handle(body.to_string().as_bytes()).await;
            println!("{}", serde_json::to_string_pretty(&reply.body)?);
            if !reply.status.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Health { endpoint } => {
            info!("Checking service health at: {}", endpoint);

            let health_url = format!("{}/health", endpoint.trim_end_matches('/'));

            match tokio::time::timeout(std::time::Duration::from_secs(5), check_health(&health_url))
                .await
            {
                Ok(Ok(response)) => {
                    info!("Status: {}", response.status);
                    info!("Version: {}", response.version);
                    info!("Uptime: {} seconds", response.uptime);
                }
                Ok(Err(e)) => {
                    error!("Health check failed: {}", e);
                    std::process::exit(1);
                }
                Err(_) => {
                    error!("Health check timed out");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Perform a health check against the API endpoint.
///
/// Plain `http://` over HTTP/1.1 only.
async fn check_health(url: &str) -> Result<HealthResponse> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let url = url.trim_start_matches("http://");
    let (host_port, path) = url
        .split_once('/')
        .map(|(h, p)| (h, format!("/{}", p)))
        .unwrap_or((url, "/health".to_string()));

    let mut stream = TcpStream::connect(host_port)
        .await
        .map_err(|e| Error::Api(format!("Connection failed: {}", e)))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host_port
    );
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| Error::Api(format!("Write failed: {}", e)))?;

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .await
        .map_err(|e| Error::Api(format!("Read failed: {}", e)))?;

    let response_str = String::from_utf8_lossy(&response);

    // Body follows the blank line after the headers
    let body = response_str
        .split("\r\n\r\n")
        .nth(1)
        .ok_or_else(|| Error::Api("Invalid HTTP response".to_string()))?;

    serde_json::from_str(body).map_err(|e| Error::Api(format!("JSON parse error: {}", e)))
}
