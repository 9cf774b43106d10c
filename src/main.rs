use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};

use discount_admin as api;
use discount_admin::services::discounts::InMemoryDiscountStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    let state = api::in_memory_state(
        Arc::new(InMemoryDiscountStore::new()),
        api::CatalogSeed::default(),
        cfg.discount_settings(),
    );
    let mut app = api::app(state, Arc::new(api::auth::UserPermissionGate));

    if cfg.is_development() {
        warn!("Development environment: every request acts as a local admin");
        app = app.layer(axum::middleware::from_fn(
            api::auth::development_user_middleware,
        ));
    }

    let addr = cfg.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("discount-admin listening on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("failed to install signal handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
