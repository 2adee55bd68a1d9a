use crate::models::{
    Article, ArticleFilter, Comment, StoreStats, User, UserChanges, UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, query_builder::QueryBuilder, types::Json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// StoreError
///
/// The store's failure vocabulary. Constraint violations are reported as
/// typed variants so the resolution layer can translate them into
/// field-keyed validation messages without leaking storage detail.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate email")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            // The unique index on users.email is the only uniqueness
            // constraint in the schema.
            if db_err.is_unique_violation() {
                return StoreError::DuplicateEmail;
            }
        }
        tracing::error!("store write error: {:?}", e);
        StoreError::Database(e.to_string())
    }
}

/// ContentStore Trait
///
/// Defines the abstract contract for all persistence operations. Handlers and
/// the resolution layer interact with the data layer through this trait
/// without knowing the concrete implementation (Postgres, in-memory).
///
/// The store is a plain typed record store: it enforces key and uniqueness
/// constraints and nothing else. Defaults, derived fields and timestamps are
/// computed by the caller and arrive here as ordinary values. The single
/// exception is the view counter, which must be incremented atomically at the
/// storage layer to stay monotonic under concurrent fetches.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn ContentStore>`) safely shareable across async task boundaries.
#[async_trait]
pub trait ContentStore: Send + Sync {
    // --- Article Retrieval ---
    // Public listing with filtering and paging. Must enforce is_published=true.
    async fn list_articles(&self, filter: ArticleFilter) -> Vec<Article>;
    // Single fetch; atomically increments `views` on hit. Last-write-wins.
    async fn get_article(&self, id: Uuid) -> Option<Article>;
    // Featured & published, newest first.
    async fn featured_articles(&self, limit: i64) -> Vec<Article>;
    // Case-insensitive substring match over title, content and tags,
    // published only. The caller decides the cap and rejects empty queries.
    async fn search_articles(&self, query: &str, limit: i64) -> Vec<Article>;
    // Admin view: every article regardless of publication status.
    async fn list_all_articles(&self) -> Vec<Article>;

    // --- Article Actions ---
    async fn create_article(&self, article: Article) -> Result<Article, StoreError>;
    // True if a record existed and was removed.
    async fn delete_article(&self, id: Uuid) -> bool;

    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    // Exact match; callers pass lowercased input.
    async fn find_user_by_email(&self, email: &str) -> Option<User>;
    async fn create_user(&self, user: User) -> Result<User, StoreError>;
    // Partial update: every Some field is written, None fields preserved.
    async fn update_user(&self, id: Uuid, changes: UserChanges)
    -> Result<Option<User>, StoreError>;
    async fn delete_user(&self, id: Uuid) -> bool;

    // --- Comments ---
    // Newest first.
    async fn list_comments(&self, article_id: Uuid) -> Vec<Comment>;
    async fn get_comment(&self, id: Uuid) -> Option<Comment>;
    async fn create_comment(&self, comment: Comment) -> Result<Comment, StoreError>;
    async fn update_comment(
        &self,
        id: Uuid,
        content: String,
        updated_at: DateTime<Utc>,
    ) -> Option<Comment>;
    async fn delete_comment(&self, id: Uuid) -> bool;

    // --- Profile Extension Records ---
    async fn create_profile(&self, profile: UserProfile) -> Result<(), StoreError>;
    async fn get_profile(&self, user_id: Uuid) -> Option<UserProfile>;
    async fn delete_profile(&self, user_id: Uuid) -> bool;

    // --- Health ---
    // None signals the store is unreachable.
    async fn stats(&self) -> Option<StoreStats>;
}

/// StoreState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type StoreState = Arc<dyn ContentStore>;

// Column lists kept in one place so every query selects the same shape.
const ARTICLE_COLUMNS: &str = "id, title, excerpt, content, category, author, featured_image, \
     tags, views, read_time, is_featured, is_published, published_at, created_at, updated_at";
const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, avatar, role, \
     email_verified, created_at, updated_at, last_login";
const COMMENT_COLUMNS: &str = "id, article_id, user_id, content, created_at, updated_at";

/// PostgresContentStore
///
/// The concrete implementation of the `ContentStore` trait, backed by
/// PostgreSQL. All queries use bind parameters; the table layout is
/// documented in `db/schema.sql`.
pub struct PostgresContentStore {
    pool: PgPool,
}

impl PostgresContentStore {
    /// Creates a new store instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentStore for PostgresContentStore {
    /// list_articles
    ///
    /// Flexible filtering via QueryBuilder for safe parameterization.
    /// Strictly enforces `WHERE is_published = true` in the base query.
    async fn list_articles(&self, filter: ArticleFilter) -> Vec<Article> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE is_published = true"
        ));

        if let Some(category) = filter.category {
            builder.push(" AND category = ");
            builder.push_bind(category);
        }

        if let Some(featured) = filter.is_featured {
            builder.push(" AND is_featured = ");
            builder.push_bind(featured);
        }

        builder.push(" ORDER BY published_at DESC OFFSET ");
        builder.push_bind(filter.skip);
        builder.push(" LIMIT ");
        builder.push_bind(filter.limit);

        match builder.build_query_as::<Article>().fetch_all(&self.pool).await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::error!("list_articles error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_article
    ///
    /// The view counter is bumped in the same statement that reads the row, so
    /// concurrent fetches each count without in-process locking.
    async fn get_article(&self, id: Uuid) -> Option<Article> {
        sqlx::query_as::<_, Article>(&format!(
            "UPDATE articles SET views = views + 1 WHERE id = $1 RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_article error: {:?}", e);
            None
        })
    }

    async fn featured_articles(&self, limit: i64) -> Vec<Article> {
        match sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             WHERE is_featured = true AND is_published = true \
             ORDER BY published_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        {
            Ok(articles) => articles,
            Err(e) => {
                tracing::error!("featured_articles error: {:?}", e);
                vec![]
            }
        }
    }

    /// search_articles
    ///
    /// Case-insensitive substring match via ILIKE across title, content and
    /// the flattened tag list.
    async fn search_articles(&self, query: &str, limit: i64) -> Vec<Article> {
        let pattern = format!("%{}%", query);
        match sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             WHERE is_published = true \
               AND (title ILIKE $1 OR content ILIKE $1 OR array_to_string(tags, ' ') ILIKE $1) \
             ORDER BY published_at DESC LIMIT $2"
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        {
            Ok(articles) => articles,
            Err(e) => {
                tracing::error!("search_articles error: {:?}", e);
                vec![]
            }
        }
    }

    /// list_all_articles
    ///
    /// Administrative listing. Does *not* restrict on `is_published`;
    /// unpublished articles sort first for review.
    async fn list_all_articles(&self) -> Vec<Article> {
        match sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             ORDER BY is_published ASC, published_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        {
            Ok(articles) => articles,
            Err(e) => {
                tracing::error!("list_all_articles error: {:?}", e);
                vec![]
            }
        }
    }

    async fn create_article(&self, article: Article) -> Result<Article, StoreError> {
        let inserted = sqlx::query_as::<_, Article>(&format!(
            "INSERT INTO articles ({ARTICLE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(article.id)
        .bind(article.title)
        .bind(article.excerpt)
        .bind(article.content)
        .bind(article.category)
        .bind(article.author)
        .bind(article.featured_image)
        .bind(article.tags)
        .bind(article.views)
        .bind(article.read_time)
        .bind(article.is_featured)
        .bind(article.is_published)
        .bind(article.published_at)
        .bind(article.created_at)
        .bind(article.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn delete_article(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_article error: {:?}", e);
                false
            }
        }
    }

    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    async fn find_user_by_email(&self, email: &str) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("find_user_by_email error: {:?}", e);
            None
        })
    }

    async fn create_user(&self, user: User) -> Result<User, StoreError> {
        let inserted = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.avatar)
        .bind(user.role)
        .bind(user.email_verified)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.last_login)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    /// update_user
    ///
    /// Uses the PostgreSQL `COALESCE` function to handle `Option<T>` fields,
    /// only updating a column when the corresponding change is `Some`.
    async fn update_user(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<User>, StoreError> {
        let updated = sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET first_name = COALESCE($2, first_name), \
                 last_name = COALESCE($3, last_name), \
                 email = COALESCE($4, email), \
                 avatar = COALESCE($5, avatar), \
                 password_hash = COALESCE($6, password_hash), \
                 last_login = COALESCE($7, last_login), \
                 updated_at = COALESCE($8, updated_at) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.email)
        .bind(changes.avatar)
        .bind(changes.password_hash)
        .bind(changes.last_login)
        .bind(changes.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_user(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_user error: {:?}", e);
                false
            }
        }
    }

    // --- COMMENTS ---

    async fn list_comments(&self, article_id: Uuid) -> Vec<Comment> {
        match sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE article_id = $1 ORDER BY created_at DESC"
        ))
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(comments) => comments,
            Err(e) => {
                tracing::error!("list_comments error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_comment(&self, id: Uuid) -> Option<Comment> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_comment error: {:?}", e);
            None
        })
    }

    async fn create_comment(&self, comment: Comment) -> Result<Comment, StoreError> {
        let inserted = sqlx::query_as::<_, Comment>(&format!(
            "INSERT INTO comments ({COMMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(comment.id)
        .bind(comment.article_id)
        .bind(comment.user_id)
        .bind(comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn update_comment(
        &self,
        id: Uuid,
        content: String,
        updated_at: DateTime<Utc>,
    ) -> Option<Comment> {
        sqlx::query_as::<_, Comment>(&format!(
            "UPDATE comments SET content = $2, updated_at = $3 \
             WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(content)
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_comment error: {:?}", e);
            None
        })
    }

    async fn delete_comment(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_comment error: {:?}", e);
                false
            }
        }
    }

    // --- PROFILES ---

    /// create_profile
    ///
    /// The extension record is a single JSONB document keyed by user id.
    /// Upserts so re-registration after a partial cleanup cannot wedge.
    async fn create_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_profiles (user_id, profile) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET profile = EXCLUDED.profile",
        )
        .bind(profile.user_id)
        .bind(Json(&profile))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> Option<UserProfile> {
        sqlx::query_scalar::<_, Json<UserProfile>>(
            "SELECT profile FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(|json| json.0))
        .unwrap_or_else(|e| {
            tracing::error!("get_profile error: {:?}", e);
            None
        })
    }

    async fn delete_profile(&self, user_id: Uuid) -> bool {
        match sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_profile error: {:?}", e);
                false
            }
        }
    }

    /// stats
    ///
    /// Compiles the collection counts for the health probe in one call.
    /// Any failure means the store is unreachable.
    async fn stats(&self) -> Option<StoreStats> {
        let articles = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await
            .ok()?;
        let users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .ok()?;
        let comments = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await
            .ok()?;
        Some(StoreStats {
            articles,
            users,
            comments,
        })
    }
}

/// InMemoryContentStore
///
/// An in-process implementation of `ContentStore` used by the test suite (and
/// handy for running the server without a database). Collections live behind
/// `tokio::sync::RwLock`, so per-record updates (the view counter in
/// particular) are atomic with respect to concurrent requests.
#[derive(Default)]
pub struct InMemoryContentStore {
    articles: RwLock<HashMap<Uuid, Article>>,
    users: RwLock<HashMap<Uuid, User>>,
    comments: RwLock<HashMap<Uuid, Comment>>,
    profiles: RwLock<HashMap<Uuid, UserProfile>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn list_articles(&self, filter: ArticleFilter) -> Vec<Article> {
        let mut articles: Vec<Article> = self
            .articles
            .read()
            .await
            .values()
            .filter(|a| a.is_published)
            .filter(|a| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|c| a.category == c)
            })
            .filter(|a| filter.is_featured.is_none_or(|f| a.is_featured == f))
            .cloned()
            .collect();
        newest_first(&mut articles);
        articles
            .into_iter()
            .skip(filter.skip.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect()
    }

    async fn get_article(&self, id: Uuid) -> Option<Article> {
        let mut articles = self.articles.write().await;
        let article = articles.get_mut(&id)?;
        article.views += 1;
        Some(article.clone())
    }

    async fn featured_articles(&self, limit: i64) -> Vec<Article> {
        let mut articles: Vec<Article> = self
            .articles
            .read()
            .await
            .values()
            .filter(|a| a.is_featured && a.is_published)
            .cloned()
            .collect();
        newest_first(&mut articles);
        articles.truncate(limit.max(0) as usize);
        articles
    }

    async fn search_articles(&self, query: &str, limit: i64) -> Vec<Article> {
        let needle = query.to_lowercase();
        let mut articles: Vec<Article> = self
            .articles
            .read()
            .await
            .values()
            .filter(|a| a.is_published)
            .filter(|a| {
                a.title.to_lowercase().contains(&needle)
                    || a.content.to_lowercase().contains(&needle)
                    || a.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        newest_first(&mut articles);
        articles.truncate(limit.max(0) as usize);
        articles
    }

    async fn list_all_articles(&self) -> Vec<Article> {
        let mut articles: Vec<Article> = self.articles.read().await.values().cloned().collect();
        // Unpublished first, then newest first, matching the Postgres ordering.
        articles.sort_by(|a, b| {
            a.is_published
                .cmp(&b.is_published)
                .then(b.published_at.cmp(&a.published_at))
        });
        articles
    }

    async fn create_article(&self, article: Article) -> Result<Article, StoreError> {
        self.articles
            .write()
            .await
            .insert(article.id, article.clone());
        Ok(article)
    }

    async fn delete_article(&self, id: Uuid) -> bool {
        self.articles.write().await.remove(&id).is_some()
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }

    async fn find_user_by_email(&self, email: &str) -> Option<User> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    async fn create_user(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        if let Some(new_email) = &changes.email {
            if users.values().any(|u| u.id != id && &u.email == new_email) {
                return Err(StoreError::DuplicateEmail);
            }
        }
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(avatar) = changes.avatar {
            user.avatar = Some(avatar);
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(last_login) = changes.last_login {
            user.last_login = Some(last_login);
        }
        if let Some(updated_at) = changes.updated_at {
            user.updated_at = updated_at;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> bool {
        self.users.write().await.remove(&id).is_some()
    }

    async fn list_comments(&self, article_id: Uuid) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self
            .comments
            .read()
            .await
            .values()
            .filter(|c| c.article_id == article_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments
    }

    async fn get_comment(&self, id: Uuid) -> Option<Comment> {
        self.comments.read().await.get(&id).cloned()
    }

    async fn create_comment(&self, comment: Comment) -> Result<Comment, StoreError> {
        self.comments
            .write()
            .await
            .insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_comment(
        &self,
        id: Uuid,
        content: String,
        updated_at: DateTime<Utc>,
    ) -> Option<Comment> {
        let mut comments = self.comments.write().await;
        let comment = comments.get_mut(&id)?;
        comment.content = content;
        comment.updated_at = updated_at;
        Some(comment.clone())
    }

    async fn delete_comment(&self, id: Uuid) -> bool {
        self.comments.write().await.remove(&id).is_some()
    }

    async fn create_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        self.profiles
            .write()
            .await
            .insert(profile.user_id, profile);
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> Option<UserProfile> {
        self.profiles.read().await.get(&user_id).cloned()
    }

    async fn delete_profile(&self, user_id: Uuid) -> bool {
        self.profiles.write().await.remove(&user_id).is_some()
    }

    async fn stats(&self) -> Option<StoreStats> {
        Some(StoreStats {
            articles: self.articles.read().await.len() as i64,
            users: self.users.read().await.len() as i64,
            comments: self.comments.read().await.len() as i64,
        })
    }
}
