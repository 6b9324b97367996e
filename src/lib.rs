pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod security;
pub mod services;
pub mod state;

use std::future::IntoFuture;

use anyhow::Context;
pub use config::Config;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    let prometheus_handle = init_observability(&config)?;

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        print_help();
        return Ok(());
    };

    match command.as_str() {
        "serve" | "-d" | "--daemon" => {
            config.validate()?;
            run_server(config, prometheus_handle).await
        }

        "init" | "--init" => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Edit config.toml and run again.");
            } else {
                println!("config.toml already exists, leaving it untouched.");
            }
            Ok(())
        }

        "secret" => {
            cmd_secret();
            Ok(())
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        _ => {
            println!("Unknown command: {command}");
            println!();
            print_help();
            Ok(())
        }
    }
}

/// Installs the Prometheus recorder (when enabled) and the tracing
/// subscriber stack, optionally shipping logs to Loki.
fn init_observability(config: &Config) -> anyhow::Result<Option<PrometheusHandle>> {
    let prometheus_handle = config
        .observability
        .metrics_enabled
        .then(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .context("Failed to install Prometheus recorder")
        })
        .transpose()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;
        let (loki_layer, task) = tracing_loki::builder()
            .label("app", "bouncer")?
            .extra_field("env", "production")?
            .build_url(url)?;

        tokio::spawn(task);
        registry.with(loki_layer).init();
        info!(url = %config.observability.loki_url, "Shipping logs to Loki");
    } else {
        registry.init();
    }

    if prometheus_handle.is_some() {
        info!("Prometheus metrics recorder installed");
    }

    Ok(prometheus_handle)
}

fn print_help() {
    println!("Bouncer - Identity & Session Service");
    println!("Account registration, login and stateless session tokens over HTTP");
    println!();
    println!("USAGE:");
    println!("  bouncer <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("  serve             Start the HTTP API server");
    println!("  init              Create default config file");
    println!("  secret            Generate a signing secret for session tokens");
    println!("  help              Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("  bouncer secret                    # Generate a token secret");
    println!("  bouncer init                      # Write config.toml");
    println!("  bouncer serve                     # Start the API");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml to configure the port, token ttl, hashing costs, etc.");
    println!("  BOUNCER_TOKEN_SECRET and BOUNCER_DATABASE_PATH override the file.");
}

fn cmd_secret() {
    use rand::{Rng, distr::Alphanumeric};

    let secret: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();

    println!("{secret}");
    println!();
    println!("Set this under [token] secret in config.toml, or export it as");
    println!("BOUNCER_TOKEN_SECRET before starting the server.");
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("Bouncer v{} starting...", env!("CARGO_PKG_VERSION"));

    let retention_days = config.security.event_retention_days;
    let bind_address = config.server.bind_address.clone();
    let port = config.server.port;

    let state = api::create_app_state_from_config(config, prometheus_handle).await?;

    state
        .shared
        .security_log
        .clone()
        .start_retention_task(retention_days);

    let app = api::router(state).await;
    let addr = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API listening at http://{addr}");

    tokio::select! {
        result = axum::serve(listener, app).into_future() => {
            result.context("Server error")?;
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("Stopped");
    Ok(())
}
