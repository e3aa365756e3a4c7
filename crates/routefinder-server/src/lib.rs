pub mod routes;

use std::future::Future;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Origins allowed to call the liveness endpoint from a browser.
pub const ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost",
    "http://localhost:8080",
    "http://localhost:3000",
];

/// Build the axum Router for the liveness endpoint.
///
/// The router holds no state: the health checker only needs to know the
/// process is accepting connections, and nothing here reads the scheduler.
pub fn build_router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            ALLOWED_ORIGINS.map(HeaderValue::from_static),
        ))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    Router::new()
        .route("/", get(routes::health::index))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve the liveness endpoint on a pre-bound listener until `shutdown`
/// resolves.
pub async fn serve_on<F>(listener: tokio::net::TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("liveness endpoint listening on http://{addr}");

    axum::serve(listener, build_router())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
