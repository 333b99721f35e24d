//! Sample API entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sample_api::api::{create_router, AppState};
use sample_api::applog::AppLog;
use sample_api::cache::RedisCache;
use sample_api::config::Config;
use sample_api::metrics;
use sample_api::utils::shutdown_signal;
use sample_api::AppError;

/// Sample HTTP API with a Redis-backed counter.
#[derive(Parser, Debug)]
#[command(name = "sample-api")]
#[command(about = "Demo HTTP API: health, users, and a counter that degrades without Redis")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// Listen port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// Listen port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("sample_api=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if args.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Serve { port }) => cmd_serve(port.or(args.port)).await,
        None => cmd_serve(args.port).await,
    }
}

/// Load configuration and apply the CLI port override.
fn load_config(port_override: Option<u16>) -> Result<Config, AppError> {
    let mut config = Config::load()?;
    if let Some(port) = port_override {
        config.port = port;
    }
    config.validate().map_err(AppError::InvalidConfig)?;
    Ok(config)
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("SAMPLE API - CONFIGURATION CHECK");
    println!("======================================================================");

    let config = match load_config(None) {
        Ok(c) => c,
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(e.into());
        }
    };

    println!("  Port: {}", config.port);
    println!("  Environment: {}", config.app_env);
    println!("  Log Dir: {}", config.log_dir.display());
    println!(
        "  Redis: {} ({})",
        config.redis_url(),
        if config.redis_enabled { "enabled" } else { "disabled" }
    );
    println!(
        "  Timeouts: connect {}ms, command {}ms",
        config.redis_connect_timeout_ms, config.redis_command_timeout_ms
    );
    println!(
        "  Health Check: {}",
        match config.health_check_interval() {
            Some(interval) => format!("every {}ms", interval.as_millis()),
            None => "disabled".to_string(),
        }
    );
    println!(
        "  Reconnect: {}",
        if config.redis_reconnect {
            format!(
                "backoff {}ms..{}ms",
                config.redis_reconnect_initial_ms, config.redis_reconnect_max_ms
            )
        } else {
            "disabled".to_string()
        }
    );
    println!("  Counter Key: {}", config.counter_key);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Run the HTTP server until a shutdown signal arrives.
async fn cmd_serve(port_override: Option<u16>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let config = load_config(port_override).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    metrics::init_metrics();
    let prometheus = metrics::install_recorder();

    let log = Arc::new(AppLog::open(&config.log_dir)?);
    let client = Arc::new(RedisCache::new(&config.redis_host, config.redis_port)?);
    let state = AppState::from_config(&config, client, log.clone()).with_prometheus(prometheus);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    if config.redis_enabled {
        state.monitor.initiate();
        state
            .monitor
            .spawn_reconnect(config.reconnect_policy(), shutdown_tx.subscribe());
        if let Some(interval) = config.health_check_interval() {
            state
                .monitor
                .spawn_health_check(interval, shutdown_tx.subscribe());
        }
    } else {
        info!("Redis disabled, counter will serve the local fallback");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    log.append(&format!("Server started on port {}", config.port));

    let router = create_router(state);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(());
    })
    .await?;

    info!("Server stopped");
    Ok(())
}
