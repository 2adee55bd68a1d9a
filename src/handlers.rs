use crate::{
    AppState,
    auth::OptionalActor,
    error::ApiError,
    models::{ArticleListResponse, DeleteArticleResponse, HealthResponse},
};
use async_graphql::http::GraphiQLSource;
use axum::{
    Json,
    extract::{Path, State},
    response::Html,
};
use uuid::Uuid;

// --- Query Surface ---

/// graphql_handler
///
/// The single typed query/mutation endpoint. The body is a standard GraphQL
/// request (`{query, variables, operationName}`); the response is
/// `{data, errors?}`.
///
/// The bearer credential is resolved to an actor exactly once, here, by the
/// `OptionalActor` extractor, and injected into the request data. Resolvers
/// receive it as an explicit parameter; an absent or unusable credential
/// simply means the operations run anonymously.
pub async fn graphql_handler(
    OptionalActor(actor): OptionalActor,
    State(state): State<AppState>,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let mut request = request;
    if let Some(actor) = actor {
        request = request.data(actor);
    }
    Json(state.schema.execute(request).await)
}

/// graphiql
///
/// Serves the interactive GraphiQL explorer against the endpoint above.
pub async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

// --- REST Surface ---

/// health
///
/// [Public Route] Liveness probe for monitoring and load balancer checks.
/// Reports store connectivity and the basic collection counts.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Liveness", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.resolver.health().await)
}

/// admin_articles
///
/// [Admin Route] Lists ALL articles in the system, including unpublished
/// ones. The role check happens in the resolution layer against the same
/// policy rule as the mutation surface.
#[utoipa::path(
    get,
    path = "/admin/articles",
    responses(
        (status = 200, description = "All articles", body = ArticleListResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn admin_articles(
    OptionalActor(actor): OptionalActor,
    State(state): State<AppState>,
) -> Result<Json<ArticleListResponse>, ApiError> {
    let articles = state.resolver.admin_articles(actor.as_ref()).await?;
    Ok(Json(ArticleListResponse {
        success: true,
        articles,
    }))
}

/// admin_delete_article
///
/// [Admin Route] Removes an article record outright. Comments referencing it
/// are left in place.
#[utoipa::path(
    delete,
    path = "/admin/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Deleted", body = DeleteArticleResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "No such article")
    )
)]
pub async fn admin_delete_article(
    OptionalActor(actor): OptionalActor,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteArticleResponse>, ApiError> {
    state
        .resolver
        .admin_delete_article(actor.as_ref(), id)
        .await?;
    Ok(Json(DeleteArticleResponse {
        success: true,
        error: None,
    }))
}
