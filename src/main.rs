use crosslist_api::api::openapi_document;
use crosslist_api::{AppConfig, AppState, router};
use eyre::WrapErr;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target = "crosslist.api", "server crashed: {err:?}");
        std::process::exit(1);
    }
}

async fn run() -> eyre::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    openapi_document().wrap_err("parsing docs/openapi.yaml")?;
    let config = AppConfig::from_env();
    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .wrap_err("installing prometheus recorder")?;
    let state = AppState::from_config(config, prometheus).wrap_err("opening batch store")?;
    info!(
        target = "crosslist.api",
        store = state.store.backend_name(),
        storage = state.files.backend_name(),
        mock_listing = state.vision.mock_mode(),
        "state ready"
    );

    let addr: SocketAddr = ([0, 0, 0, 0], state.config.port).into();
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("binding {addr}"))?;
    info!(target = "crosslist.api", "listening on {addr}");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!(target = "crosslist.api", "shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "crosslist.api", "failed to listen for ctrl-c: {err}");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = fmt().with_env_filter(filter).try_init();
}
