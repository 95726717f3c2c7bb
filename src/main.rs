use axum::middleware::from_fn;
use orderdesk::api::{self, ApiState};
use orderdesk::config::AppConfig;
use orderdesk::database::{self, PgOrderStore};
use orderdesk::gateway::RestGatewayClient;
use orderdesk::logging::init_tracing;
use orderdesk::middleware::{request_logging_middleware, UuidRequestId};
use orderdesk::services::{
    CancellationService, ConfirmationService, NotificationService, RestFulfillmentClient,
};
use orderdesk::health;
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    config.validate()?;
    init_tracing(&config.logging);

    info!(
        host = %config.server.host,
        port = config.server.port,
        gateway_environment = %config.gateway.environment,
        "starting orderdesk backend"
    );

    let pool = database::init_pool(&config.database).await?;

    let store = Arc::new(PgOrderStore::new(pool.clone()));
    let gateway = Arc::new(RestGatewayClient::new(config.gateway.clone())?);
    let fulfillment = Arc::new(RestFulfillmentClient::new(config.fulfillment.clone())?);
    let notifications = Arc::new(NotificationService::new());

    let confirmations = Arc::new(ConfirmationService::new(
        store.clone(),
        gateway.clone(),
        fulfillment,
        notifications.clone(),
    ));
    let cancellations = Arc::new(CancellationService::new(
        store,
        gateway,
        notifications,
        config.orders.clone(),
    ));

    let app = api::router(Arc::new(ApiState { confirmations, cancellations }))
        .merge(health::router(pool))
        .layer(from_fn(request_logging_middleware))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => error!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
