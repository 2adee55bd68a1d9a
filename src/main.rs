use newsdesk::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresContentStore, StoreState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point for the application, responsible for
/// initializing all core components: Configuration, Logging, Database,
/// and the HTTP Server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // Loads .env file settings before configuration can be read.
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Prioritizes the RUST_LOG environment variable, falling back to sensible
    // defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "newsdesk=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    // The structured logging format is selected by APP_ENV.
    match config.env {
        Env::Local => {
            // LOCAL: pretty print output for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON output for ingestion by centralized log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (Postgres)
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    // Instantiate the store, wrapped in an Arc for thread-safe sharing.
    let store = Arc::new(PostgresContentStore::new(pool)) as StoreState;

    // 5. Unified State Assembly
    // Wires the credential service, resolution layer and schema over the store.
    let port = config.port;
    let app_state = AppState::new(store, config);

    // 6. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(("0.0.0.0", port)).await.unwrap();

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:{}", port);
    tracing::info!("GraphiQL explorer available at: http://localhost:{}/graphql", port);
    tracing::info!("REST API docs (Swagger UI) available at: http://localhost:{}/swagger-ui", port);

    // The long-running Axum server process.
    axum::serve(listener, app).await.unwrap();
}
