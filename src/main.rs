#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use revalidator::{
    build_router, ActivityManager, AppState, ContentSource, DirectorySource,
    RevalidationScheduler, ServerConfig, TracingHook,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn content_source(config: &ServerConfig) -> Arc<dyn ContentSource> {
    if let Some(url) = &config.content_url {
        #[cfg(feature = "http-source")]
        {
            info!(url = %url, "Using HTTP content source");
            return Arc::new(revalidator::source::HttpSource::new(url.clone()));
        }
        #[cfg(not(feature = "http-source"))]
        warn!(
            url = %url,
            "REVALIDATOR_CONTENT_URL set but http-source feature is disabled; using directory"
        );
    }
    info!(dir = %config.content_dir.display(), "Using directory content source");
    Arc::new(DirectorySource::with_extensions(
        config.content_dir.clone(),
        config.content_extensions.clone(),
    ))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env();
    init_tracing(config.log_json);
    config.validate()?;

    let source = content_source(&config);
    let manager = Arc::new(ActivityManager::new(config.manager.clone(), source)?);

    let scheduler = config.scheduler_enabled.then(|| {
        RevalidationScheduler::new(Arc::clone(&manager), Arc::new(TracingHook)).spawn()
    });

    let app = build_router(AppState::with_rate_limit(
        Arc::clone(&manager),
        config.rate_limit,
    ));
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "Revalidator listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(handle) = scheduler {
        handle.shutdown().await;
    }
    info!("Revalidator stopped");
    Ok(())
}
