use std::future::IntoFuture;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use fragments_registry::FragmentRegistry;
use fragments_server::api::AppState;
use fragments_server::auth::AuthProvider;
use fragments_server::config::FragmentsConfig;
use fragments_server::store_factory::create_store;

/// Fragments -- typed fragment storage with on-the-fly conversion.
#[derive(Parser, Debug)]
#[command(name = "fragments-server", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "fragments.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber from RUST_LOG or default to info.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config: FragmentsConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        info!(path = %cli.config, "loaded configuration");
        toml::from_str(&contents)?
    } else {
        info!(path = %cli.config, "config file not found, using defaults");
        toml::from_str("")?
    };

    let store = create_store(&config.store, config.limits.max_payload_bytes).await?;
    info!(backend = %config.store.backend, "fragment store initialized");

    let registry = FragmentRegistry::builder()
        .store(store)
        .max_payload_bytes(config.limits.max_payload_bytes)
        .build()?;

    let auth = AuthProvider::from_config(&config.auth)?.map(Arc::new);
    match &auth {
        Some(provider) => info!(scheme = provider.scheme(), "authentication enabled"),
        None => tracing::warn!("authentication disabled, all requests share one anonymous owner"),
    }

    // Finish deletes that a crash or restart interrupted.
    let _sweep_handle = if config.store.sweep_interval_seconds > 0 {
        let interval = Duration::from_secs(config.store.sweep_interval_seconds);
        let registry = registry.clone();
        Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            loop {
                timer.tick().await;
                match registry.sweep_pending_deletes().await {
                    Ok(0) => {}
                    Ok(n) => info!(completed = n, "sweep finished pending deletes"),
                    Err(e) => tracing::warn!(error = %e, "sweep of pending deletes failed"),
                }
            }
        }))
    } else {
        None
    };

    let state = AppState {
        registry,
        auth,
        api_url: config.server.api_url.as_deref().map(Arc::from),
    };
    let app = fragments_server::api::router(state);

    // Resolve the bind address (CLI overrides take precedence).
    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "fragments-server listening");

    // Serve with graceful shutdown on SIGINT / SIGTERM, bounded by the
    // configured timeout once the signal arrives.
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    tokio::select! {
        result = server => result?,
        () = async {
            shutdown_signal().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            tracing::warn!(
                timeout_secs = config.server.shutdown_timeout_seconds,
                "shutdown timeout exceeded, dropping in-flight requests"
            );
        }
    }

    info!("fragments-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
