use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use livable::config::AppConfig;
use livable::email::Mailer;
use livable::engine::Engine;
use livable::notify::Notifier;
use livable::rate_limit::RateLimiter;
use livable::state::AppState;
use livable::zoom::ZoomClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    livable::observability::init(config.metrics_port);

    // Ensure data directory exists
    std::fs::create_dir_all(&config.data_dir)?;
    let wal_path = PathBuf::from(&config.data_dir).join("requests.wal");
    let engine = Arc::new(Engine::open(wal_path)?);

    let state = AppState {
        engine: engine.clone(),
        meetings: Arc::new(ZoomClient::new(config.zoom.clone())),
        mailer: Mailer::new(config.email.clone()),
        notifier: Notifier::new(config.discord_webhook_url.clone()),
        limiter: Arc::new(RateLimiter::default()),
        admin_secret: config.admin_secret.clone(),
        webhook_secret: config.webhook_secret.clone(),
        app_url: config.app_url.clone(),
    };
    let app = livable::routes::router(state);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("livable listening on {addr}");
    info!("  data_dir: {}", config.data_dir);
    info!("  requests: {}", engine.request_count().await);
    info!(
        "  admin auth: {}",
        if config.admin_secret.is_some() {
            "enabled"
        } else {
            "DISABLED (set ADMIN_SECRET)"
        }
    );
    info!(
        "  email: {}",
        if config.email.is_some() { "enabled" } else { "disabled" }
    );
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    // Graceful shutdown: stop accepting on SIGTERM/ctrl-c, drain in-flight requests
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("livable stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    info!("shutdown signal received");
}
