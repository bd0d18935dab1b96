use anyhow::Result;
use dockermon::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let docker = Arc::new(runtime::DockerRuntime::connect()?);
    if let Err(e) = docker.ping().await {
        tracing::warn!(error = %e, "Docker daemon is not reachable; lookups will fail until it is");
    }

    if app_config.facade.enabled {
        let app = routes::app(docker.clone(), app_config.streams.log_tail);
        let addr = format!("{}:{}", app_config.facade.host, app_config.facade.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("HTTP facade listening on http://{}", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!(error = %e, "HTTP facade stopped");
            }
        });
    }

    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        concurrent_sessions = app_config.server.concurrent_sessions,
        "Server is running on {}",
        addr
    );

    let server = server::ConnectionServer::new(
        docker,
        server::SessionSettings::from_config(&app_config),
        app_config.server.concurrent_sessions,
    );
    server
        .run(listener, async {
            shutdown_signal().await;
            tracing::info!("Received shutdown signal");
        })
        .await
}
