use axum::{extract::FromRef, http::HeaderName, Router};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;
pub mod resolver;
pub mod schema;

// Module for routing segregation (Public, Admin).
pub mod routes;
use routes::{admin, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the entry point and the tests.
pub use auth::CredentialService;
pub use config::AppConfig;
pub use repository::{ContentStore, InMemoryContentStore, PostgresContentStore, StoreState};
pub use resolver::Resolver;
pub use schema::{NewsSchema, build_schema};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the REST
/// surface. The GraphQL endpoint documents itself through introspection and
/// the GraphiQL explorer, so only the REST handlers are listed here.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::health, handlers::admin_articles, handlers::admin_delete_article),
    components(
        schemas(
            models::Article, models::StoreStats, models::HealthResponse,
            models::ArticleListResponse, models::DeleteArticleResponse,
        )
    ),
    tags(
        (name = "newsdesk", description = "News platform content API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe container holding all application services and
/// configuration, shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Content Store: abstracts persistence behind the trait object.
    pub store: StoreState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
    /// Resolution Layer: validation, policy, derivations, store orchestration.
    pub resolver: Resolver,
    /// The GraphQL schema, with the resolver attached as schema data.
    pub schema: NewsSchema,
}

impl AppState {
    /// Wires the resolution layer and schema over a store and configuration.
    /// The credential service is derived from the configured secret.
    pub fn new(store: StoreState, config: AppConfig) -> Self {
        let credentials = CredentialService::new(&config.jwt_secret);
        let resolver = Resolver::new(store.clone(), credentials);
        let schema = build_schema(resolver.clone());
        Self {
            store,
            config,
            resolver,
            schema,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// These allow extractors to selectively pull components from the shared
// AppState; the OptionalActor extractor needs the store and the config.

impl FromRef<AppState> for StoreState {
    fn from_ref(app_state: &AppState) -> StoreState {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global
/// middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI for the REST surface.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: health probe and the GraphQL endpoint.
        .merge(public::public_routes())
        // Admin Routes: nested under '/admin'. The 'admin' role check is
        // performed by the resolution layer's policy consult.
        .nest("/admin", admin::admin_routes())
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the request/response lifecycle in a
                // tracing span carrying the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: returns the x-request-id header to
                // the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: includes the
/// `x-request-id` header (if present) alongside the HTTP method and URI so
/// every log line for a single request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
