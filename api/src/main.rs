use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use taskpilot_auth::{HttpKeySource, KeyCache, RequestAuthenticator, SignatureHeaders};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod extract;
mod github;
mod identity;
mod middleware;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod testutil;
mod weather;

use config::ApiConfig;
use store::{MemoryTaskStore, PgTaskStore, TaskStore};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Taskpilot Task API",
        version = "0.1.0",
        description = "Per-user tasks and weather lookups for the taskpilot agent and skillset callers."
    ),
    paths(
        routes::health::health_check,
        routes::tasks::list_tasks,
        routes::tasks::get_task,
        routes::tasks::create_task,
        routes::tasks::update_task,
        routes::tasks::delete_task,
        routes::skillset::list,
        routes::skillset::add,
        routes::skillset::update,
        routes::skillset::delete,
        routes::weather::weather_by_query,
        routes::weather::weather_by_body,
    ),
    components(schemas(
        HealthResponse,
        taskpilot_core::error::ApiError,
        taskpilot_core::tasks::Task,
        taskpilot_core::tasks::NewTask,
        taskpilot_core::tasks::TaskPatch,
        taskpilot_core::tasks::TaskUpdate,
        taskpilot_core::weather::WeatherReport,
        routes::skillset::TaskIdBody,
        routes::weather::WeatherQuery,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "github_token",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-GitHub-Token"))),
        );
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "taskpilot_api=debug,taskpilot_auth=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = ApiConfig::from_env();

    let store: Arc<dyn TaskStore> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(20)
                .connect(database_url)
                .await
                .expect("Failed to connect to database");

            sqlx::migrate!("../migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            tracing::info!("using Postgres task store");
            Arc::new(PgTaskStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; tasks are kept in memory");
            Arc::new(MemoryTaskStore::new())
        }
    };

    let http = reqwest::Client::builder()
        .user_agent(concat!("taskpilot-api/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to build HTTP client");

    let skillset_auth = config.skillset_require_signature.then(|| {
        let headers =
            SignatureHeaders::new(&config.signature_header, &config.key_identifier_header)
                .expect("SIGNATURE_HEADER and KEY_IDENTIFIER_HEADER must be valid header names");
        let key_source = HttpKeySource::new(http.clone(), config.public_keys_url.clone());
        let key_cache = KeyCache::new(Arc::new(key_source), config.key_cache_ttl);
        Arc::new(RequestAuthenticator::new(Arc::new(key_cache), headers))
    });

    if config.openweathermap_api_key.is_none() {
        tracing::warn!("OPENWEATHERMAP_API_KEY not set; weather lookups will fail");
    }

    let app_state = state::AppState {
        store,
        users: Arc::new(github::GitHubClient::new(
            http.clone(),
            config.github_api_url.clone(),
        )),
        weather: Arc::new(weather::OpenWeatherMap::new(
            http,
            config.openweathermap_url.clone(),
            config.openweathermap_api_key.clone(),
        )),
        skillset_auth,
    };

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::tasks::read_router().layer(middleware::rate_limit::reads_layer()))
        .merge(routes::tasks::write_router().layer(middleware::rate_limit::writes_layer()))
        .merge(routes::skillset::router(&app_state).layer(middleware::rate_limit::writes_layer()))
        .merge(routes::weather::router().layer(middleware::rate_limit::reads_layer()))
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
    tracing::info!("taskpilot task API listening on {}", addr);

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
