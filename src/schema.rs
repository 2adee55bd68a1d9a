use async_graphql::{
    ComplexObject, Context, EmptySubscription, ErrorExtensions, Object, Result as GqlResult,
    Schema,
};
use uuid::Uuid;

use crate::{
    auth::Actor,
    models::{
        Article, ArticleDraft, AuthPayload, Comment, MutationStatus, ProfilePayload, PublicUser,
        UpdateUserInput,
    },
    resolver::Resolver,
};

/// The application schema: fixed query and mutation roots, no subscriptions.
pub type NewsSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// build_schema
///
/// Assembles the GraphQL schema with the resolution layer attached as schema
/// data. The per-request actor is injected into each request by the HTTP
/// handler; everything else the resolvers need lives here.
pub fn build_schema(resolver: Resolver) -> NewsSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(resolver)
        .finish()
}

/// The GraphQL layer is a thin shim: every field immediately delegates to the
/// [`Resolver`], handing over the actor explicitly. No business logic lives in
/// this module.
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Published articles, newest first, with optional category/featured
    /// filters and offset/limit paging.
    async fn articles(
        &self,
        ctx: &Context<'_>,
        limit: Option<i64>,
        skip: Option<i64>,
        category: Option<String>,
        is_featured: Option<bool>,
    ) -> GqlResult<Vec<Article>> {
        let resolver = ctx.data::<Resolver>()?;
        Ok(resolver.articles(limit, skip, category, is_featured).await)
    }

    /// A single article by id. Fetching it counts a view.
    async fn article(&self, ctx: &Context<'_>, id: Uuid) -> GqlResult<Option<Article>> {
        let resolver = ctx.data::<Resolver>()?;
        Ok(resolver.article(id).await)
    }

    /// The newest five featured articles.
    async fn featured_articles(&self, ctx: &Context<'_>) -> GqlResult<Vec<Article>> {
        let resolver = ctx.data::<Resolver>()?;
        Ok(resolver.featured_articles().await)
    }

    /// Comments on an article, newest first.
    async fn comments(&self, ctx: &Context<'_>, article_id: Uuid) -> GqlResult<Vec<Comment>> {
        let resolver = ctx.data::<Resolver>()?;
        Ok(resolver.comments(article_id).await)
    }

    /// Case-insensitive substring search over title, content and tags.
    async fn search_articles(&self, ctx: &Context<'_>, query: String) -> GqlResult<Vec<Article>> {
        let resolver = ctx.data::<Resolver>()?;
        Ok(resolver.search_articles(&query).await)
    }

    /// The authenticated user's own profile.
    async fn me(&self, ctx: &Context<'_>) -> GqlResult<Option<PublicUser>> {
        let resolver = ctx.data::<Resolver>()?;
        resolver
            .me(ctx.data_opt::<Actor>())
            .await
            .map_err(|e| e.extend())
    }
}

#[ComplexObject]
impl Comment {
    /// The comment's author, resolved lazily from the store. Null when the
    /// account has since been deleted.
    async fn user(&self, ctx: &Context<'_>) -> GqlResult<Option<PublicUser>> {
        let resolver = ctx.data::<Resolver>()?;
        Ok(resolver.comment_author(self.user_id).await)
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Creates an account and signs the caller in.
    async fn register(
        &self,
        ctx: &Context<'_>,
        first_name: String,
        last_name: String,
        email: String,
        password: String,
    ) -> GqlResult<AuthPayload> {
        let resolver = ctx.data::<Resolver>()?;
        resolver
            .register(&first_name, &last_name, &email, &password)
            .await
            .map_err(|e| e.extend())
    }

    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> GqlResult<AuthPayload> {
        let resolver = ctx.data::<Resolver>()?;
        resolver.login(&email, &password).await.map_err(|e| e.extend())
    }

    /// Publishes a new article. Admin only.
    #[allow(clippy::too_many_arguments)]
    async fn create_article(
        &self,
        ctx: &Context<'_>,
        title: String,
        excerpt: String,
        content: String,
        category: String,
        author: Option<String>,
        featured_image: Option<String>,
        tags: Option<Vec<String>>,
        #[graphql(default = false)] is_featured: bool,
        read_time: Option<i32>,
    ) -> GqlResult<Article> {
        let resolver = ctx.data::<Resolver>()?;
        let draft = ArticleDraft {
            title,
            excerpt,
            content,
            category,
            author,
            featured_image,
            tags,
            is_featured,
            read_time,
        };
        resolver
            .create_article(ctx.data_opt::<Actor>(), draft)
            .await
            .map_err(|e| e.extend())
    }

    /// Posts a comment on an article. Requires a signed-in actor.
    async fn add_comment(
        &self,
        ctx: &Context<'_>,
        article_id: Uuid,
        content: String,
    ) -> GqlResult<Comment> {
        let resolver = ctx.data::<Resolver>()?;
        resolver
            .add_comment(ctx.data_opt::<Actor>(), article_id, &content)
            .await
            .map_err(|e| e.extend())
    }

    /// Edits the actor's own comment.
    async fn update_comment(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        content: String,
    ) -> GqlResult<Comment> {
        let resolver = ctx.data::<Resolver>()?;
        resolver
            .update_comment(ctx.data_opt::<Actor>(), id, &content)
            .await
            .map_err(|e| e.extend())
    }

    /// Deletes a comment (owner, or any comment for an admin).
    async fn delete_comment(&self, ctx: &Context<'_>, id: Uuid) -> GqlResult<Comment> {
        let resolver = ctx.data::<Resolver>()?;
        resolver
            .delete_comment(ctx.data_opt::<Actor>(), id)
            .await
            .map_err(|e| e.extend())
    }

    /// Partial update of the actor's own profile fields.
    async fn update_profile(
        &self,
        ctx: &Context<'_>,
        input: UpdateUserInput,
    ) -> GqlResult<ProfilePayload> {
        let resolver = ctx.data::<Resolver>()?;
        resolver
            .update_profile(ctx.data_opt::<Actor>(), input)
            .await
            .map_err(|e| e.extend())
    }

    async fn change_password(
        &self,
        ctx: &Context<'_>,
        current_password: String,
        new_password: String,
    ) -> GqlResult<MutationStatus> {
        let resolver = ctx.data::<Resolver>()?;
        resolver
            .change_password(ctx.data_opt::<Actor>(), &current_password, &new_password)
            .await
            .map_err(|e| e.extend())
    }

    /// Sets or (with a null argument) resets the actor's avatar.
    async fn update_avatar(
        &self,
        ctx: &Context<'_>,
        avatar_url: Option<String>,
    ) -> GqlResult<ProfilePayload> {
        let resolver = ctx.data::<Resolver>()?;
        resolver
            .update_avatar(ctx.data_opt::<Actor>(), avatar_url)
            .await
            .map_err(|e| e.extend())
    }

    /// Hard-deletes the actor's account after password verification.
    async fn delete_account(&self, ctx: &Context<'_>, password: String) -> GqlResult<MutationStatus> {
        let resolver = ctx.data::<Resolver>()?;
        resolver
            .delete_account(ctx.data_opt::<Actor>(), &password)
            .await
            .map_err(|e| e.extend())
    }
}
