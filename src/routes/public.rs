use crate::{AppState, handlers};
use axum::{
    Router,
    routing::get,
};

/// Public Router Module
///
/// Defines endpoints accessible to any client, anonymous or signed in.
///
/// The GraphQL endpoint is deliberately *not* wrapped in an authentication
/// layer: read operations are open to everyone, and the mutations decide for
/// themselves what anonymity means (via the policy table). The bearer header,
/// when present, is resolved once per request by the `OptionalActor`
/// extractor inside the handler.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe: store connectivity plus counts.
        .route("/health", get(handlers::health))
        // GET  /graphql -> GraphiQL explorer
        // POST /graphql -> the single typed query/mutation endpoint
        .route(
            "/graphql",
            get(handlers::graphiql).post(handlers::graphql_handler),
        )
}
