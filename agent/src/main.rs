use std::net::SocketAddr;
use std::sync::Arc;

use taskpilot_auth::{HttpKeySource, KeyCache, RequestAuthenticator, SignatureHeaders};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod backend;
mod chat;
mod completion;
mod config;
mod dispatch;
mod error;
mod middleware;
mod relay;
mod routes;
mod state;
#[cfg(test)]
mod testutil;
mod tools;

use config::AgentConfig;
use dispatch::ToolDispatcher;
use state::{AppState, HttpUpstreams};

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "taskpilot_agent=debug,taskpilot_auth=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = AgentConfig::from_env();

    let http = reqwest::Client::builder()
        .user_agent(concat!("taskpilot-agent/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to build HTTP client");

    let headers = SignatureHeaders::new(&config.signature_header, &config.key_identifier_header)
        .expect("SIGNATURE_HEADER and KEY_IDENTIFIER_HEADER must be valid header names");
    let key_source = HttpKeySource::new(http.clone(), config.public_keys_url.clone());
    let key_cache = KeyCache::new(Arc::new(key_source), config.key_cache_ttl);
    let authenticator = Arc::new(RequestAuthenticator::new(Arc::new(key_cache), headers));

    let registry = tools::default_registry().expect("Tool registry is invalid");
    tracing::info!(tools = registry.len(), model = %config.completion_model, "tools registered");
    let dispatcher = ToolDispatcher::new(Arc::new(registry), config.completion_model.clone());

    let app_state = AppState {
        authenticator,
        dispatcher: Arc::new(dispatcher),
        upstreams: Arc::new(HttpUpstreams::new(http, &config)),
    };

    let app = routes::router(&app_state)
        .layer(middleware::rate_limit::agent_layer())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .option_layer(config.require_https.then(|| {
                    axum::middleware::from_fn(middleware::https::require_https)
                })),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("taskpilot agent listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
