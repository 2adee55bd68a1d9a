use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get},
};

/// Admin Router Module
///
/// The minimal REST moderation surface, exposed alongside the main query
/// endpoint for console tooling. Both endpoints resolve the bearer credential
/// and are gated by the same admin policy rule as the mutation equivalents.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/articles
        // Lists ALL articles, including unpublished ones (which sort first
        // for review). Admin only.
        .route("/articles", get(handlers::admin_articles))
        // DELETE /admin/articles/{id}
        // Removes an article record. No cascade: comments referencing the
        // article remain. Admin only.
        .route("/articles/{id}", delete(handlers::admin_delete_article))
}
