use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use save_text_gateway::config::{Args, StoreBackend};
use save_text_gateway::rate_limit::run_sweeper;
use save_text_gateway::router;
use save_text_gateway::state::AppState;
use save_text_gateway::store::{FirestoreStore, MemoryStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // credentials are checked here, before we accept any traffic
    let store: Arc<dyn Store> = match args.store {
        StoreBackend::Firestore => {
            let creds = args
                .firestore_credentials()
                .context("Firestore credentials missing")?;
            let client = reqwest::Client::builder()
                .timeout(args.store_timeout())
                .build()
                .context("Failed to build HTTP client")?;
            info!(
                project = %creds.project_id,
                collection = %args.collection,
                "using firestore store"
            );
            Arc::new(FirestoreStore::new(
                client,
                &args.firestore_url,
                &creds.project_id,
                &args.collection,
                creds.auth,
            ))
        }
        StoreBackend::Memory => {
            info!("using in-memory store, entries are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let state = Arc::new(AppState::from_args(&args, store).context("Invalid configuration")?);

    tokio::spawn(run_sweeper(state.rate_limiter.clone(), args.sweep_interval()));

    let app = router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("save-text gateway listening on http://{}", addr);
    info!(
        cooldown_secs = args.cooldown,
        duplicate_window_secs = args.duplicate_window,
        origins = ?args.allowed_origins,
        "admission control configured"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
