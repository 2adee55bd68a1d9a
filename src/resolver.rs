use chrono::Utc;
use uuid::Uuid;

use crate::{
    auth::{Actor, CredentialService, Role},
    error::{ApiError, ApiResult},
    models::{
        Article, ArticleDraft, ArticleFilter, AuthPayload, Comment, HealthResponse, MutationStatus,
        ProfilePayload, PublicUser, UpdateUserInput, User, UserChanges, UserProfile,
        is_valid_category,
    },
    policy::{self, Action},
    repository::StoreState,
};

// Paging and cap constants for the read surface.
pub const DEFAULT_PAGE_SIZE: i64 = 12;
pub const MAX_PAGE_SIZE: i64 = 50;
pub const FEATURED_LIMIT: i64 = 5;
pub const SEARCH_LIMIT: i64 = 20;

const WORDS_PER_MINUTE: usize = 200;
const MIN_PASSWORD_LEN: usize = 6;
const DEFAULT_AUTHOR: &str = "Admin User";
const DEFAULT_FEATURED_IMAGE: &str =
    "https://images.unsplash.com/photo-1588681664899-f142ff2dc9b1";

// --- Derivation Functions ---
// Derived and defaulted fields are computed here, at write time. The store
// persists exactly what it is given.

/// Estimated minutes to read: word count at 200 wpm, rounded up, never zero.
pub fn estimate_read_time(content: &str) -> i32 {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as i32
}

/// Generated identicon URL, used whenever no explicit avatar is set.
pub fn default_avatar_url(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=007bff&color=fff",
        urlencoding::encode(name)
    )
}

/// Minimal email shape check: `local@domain.tld`, no whitespace anywhere.
fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

/// Resolver
///
/// The resolution layer: one method per exposed operation. Each method takes
/// the actor identity as an explicit parameter (derived once per request from
/// the bearer credential), validates its inputs, consults the authorization
/// policy, invokes the store, and shapes the response. Failure paths return
/// an [`ApiError`] keyed by a stable reason kind; nothing here silently
/// no-ops.
#[derive(Clone)]
pub struct Resolver {
    store: StoreState,
    credentials: CredentialService,
}

impl Resolver {
    pub fn new(store: StoreState, credentials: CredentialService) -> Self {
        Self { store, credentials }
    }

    /// Shapes a stored [`User`] for the outside world: hash dropped, avatar
    /// falling back to the generated identicon.
    pub fn public_user(&self, user: &User) -> PublicUser {
        PublicUser {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            avatar: user
                .avatar
                .clone()
                .unwrap_or_else(|| default_avatar_url(&user.full_name())),
            role: user.role.clone(),
            created_at: user.created_at,
        }
    }

    /// Lazy author resolution for serialized comments. A dangling reference
    /// (author deleted since) resolves to `None`, not an error.
    pub async fn comment_author(&self, user_id: Uuid) -> Option<PublicUser> {
        self.store
            .get_user(user_id)
            .await
            .map(|user| self.public_user(&user))
    }

    /// Presence + policy in one step for the self-service operations, which
    /// all share the same denial.
    fn require_self<'a>(&self, actor: Option<&'a Actor>) -> ApiResult<&'a Actor> {
        actor
            .filter(|a| policy::allow(Some(a), Action::UpdateSelf))
            .ok_or_else(|| ApiError::Authentication("Not authenticated".to_string()))
    }

    // --- Queries ---

    /// Published articles, newest first, with optional category/featured
    /// filters and offset/limit paging.
    pub async fn articles(
        &self,
        limit: Option<i64>,
        skip: Option<i64>,
        category: Option<String>,
        is_featured: Option<bool>,
    ) -> Vec<Article> {
        let filter = ArticleFilter {
            category,
            is_featured,
            skip: skip.unwrap_or(0).max(0),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        };
        self.store.list_articles(filter).await
    }

    /// Single article fetch. A hit bumps the view counter as a side effect;
    /// a miss is a null result, not an error.
    pub async fn article(&self, id: Uuid) -> Option<Article> {
        self.store.get_article(id).await
    }

    /// The five newest featured & published articles.
    pub async fn featured_articles(&self) -> Vec<Article> {
        self.store.featured_articles(FEATURED_LIMIT).await
    }

    /// Comments for an article, newest first.
    pub async fn comments(&self, article_id: Uuid) -> Vec<Comment> {
        self.store.list_comments(article_id).await
    }

    /// Case-insensitive substring search over title, content and tags.
    /// An empty query matches nothing rather than everything.
    pub async fn search_articles(&self, query: &str) -> Vec<Article> {
        let query = query.trim();
        if query.is_empty() {
            return vec![];
        }
        self.store.search_articles(query, SEARCH_LIMIT).await
    }

    /// The authenticated user's own record.
    pub async fn me(&self, actor: Option<&Actor>) -> ApiResult<Option<PublicUser>> {
        let actor = actor
            .filter(|a| policy::allow(Some(a), Action::ReadOwnProfile))
            .ok_or_else(|| ApiError::Authentication("Not authenticated".to_string()))?;
        Ok(self
            .store
            .get_user(actor.id)
            .await
            .map(|user| self.public_user(&user)))
    }

    // --- Mutations ---

    /// Creates an account, hashes the password, generates the default avatar
    /// and signs the caller in. Every account starts as a reader.
    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> ApiResult<AuthPayload> {
        let first_name = first_name.trim();
        let last_name = last_name.trim();
        let email = email.trim().to_lowercase();

        if first_name.is_empty() {
            return Err(ApiError::validation("firstName", "First name is required"));
        }
        if last_name.is_empty() {
            return Err(ApiError::validation("lastName", "Last name is required"));
        }
        if !is_valid_email(&email) {
            return Err(ApiError::validation("email", "Please provide a valid email"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(
                "password",
                "Password must be at least 6 characters",
            ));
        }

        // Pre-check for a friendlier failure; the store's uniqueness
        // constraint still backs this under races.
        if self.store.find_user_by_email(&email).await.is_some() {
            return Err(ApiError::validation(
                "email",
                "User already exists with this email",
            ));
        }

        let password_hash = self.credentials.hash_password(password)?;
        let avatar = default_avatar_url(&format!("{} {}", first_name, last_name));
        let now = Utc::now();

        let user = self
            .store
            .create_user(User {
                id: Uuid::new_v4(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email,
                password_hash,
                avatar: Some(avatar),
                role: Role::Reader.as_str().to_string(),
                email_verified: false,
                created_at: now,
                updated_at: now,
                last_login: None,
            })
            .await?;

        // The reserved extension record rides along with the account.
        self.store
            .create_profile(UserProfile::with_defaults(user.id, now))
            .await?;

        let token = self.credentials.issue_token(&user)?;
        Ok(AuthPayload {
            token,
            user: self.public_user(&user),
        })
    }

    /// Verifies credentials, records the login time and issues a token.
    /// Unknown email and wrong password fail with the identical message.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthPayload> {
        let email = email.trim().to_lowercase();
        let invalid = || ApiError::Authentication("Invalid credentials".to_string());

        let Some(user) = self.store.find_user_by_email(&email).await else {
            return Err(invalid());
        };
        if !self.credentials.verify_password(password, &user.password_hash) {
            return Err(invalid());
        }

        let user = self
            .store
            .update_user(
                user.id,
                UserChanges {
                    last_login: Some(Utc::now()),
                    ..UserChanges::default()
                },
            )
            .await?
            .unwrap_or(user);

        let token = self.credentials.issue_token(&user)?;
        Ok(AuthPayload {
            token,
            user: self.public_user(&user),
        })
    }

    /// Creates a published article. Admin only; read time is derived from the
    /// word count unless explicitly supplied.
    pub async fn create_article(
        &self,
        actor: Option<&Actor>,
        draft: ArticleDraft,
    ) -> ApiResult<Article> {
        if !policy::allow(actor, Action::CreateArticle) {
            return Err(ApiError::Authorization("Admin access required".to_string()));
        }

        let title = draft.title.trim().to_string();
        if title.chars().count() < 5 {
            return Err(ApiError::validation(
                "title",
                "Title must be at least 5 characters",
            ));
        }
        let excerpt = draft.excerpt.trim().to_string();
        if excerpt.chars().count() < 20 {
            return Err(ApiError::validation(
                "excerpt",
                "Excerpt must be at least 20 characters",
            ));
        }
        if excerpt.chars().count() > 200 {
            return Err(ApiError::validation(
                "excerpt",
                "Excerpt must be at most 200 characters",
            ));
        }
        if draft.content.trim().is_empty() {
            return Err(ApiError::validation("content", "Content is required"));
        }
        if !is_valid_category(&draft.category) {
            return Err(ApiError::validation(
                "category",
                format!("'{}' is not a valid category", draft.category),
            ));
        }
        if let Some(read_time) = draft.read_time {
            if read_time < 1 {
                return Err(ApiError::validation(
                    "readTime",
                    "Read time must be at least 1 minute",
                ));
            }
        }

        let read_time = draft
            .read_time
            .unwrap_or_else(|| estimate_read_time(&draft.content));
        let tags: Vec<String> = draft
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        let now = Utc::now();

        let article = Article {
            id: Uuid::new_v4(),
            title,
            excerpt,
            content: draft.content,
            category: draft.category,
            author: draft
                .author
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            featured_image: draft
                .featured_image
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FEATURED_IMAGE.to_string()),
            tags,
            views: 0,
            read_time,
            is_featured: draft.is_featured,
            is_published: true,
            published_at: now,
            created_at: now,
            updated_at: now,
        };

        Ok(self.store.create_article(article).await?)
    }

    /// Posts a comment as the authenticated actor.
    pub async fn add_comment(
        &self,
        actor: Option<&Actor>,
        article_id: Uuid,
        content: &str,
    ) -> ApiResult<Comment> {
        let actor = actor
            .filter(|a| policy::allow(Some(a), Action::AddComment))
            .ok_or_else(|| ApiError::Authentication("Please login to comment".to_string()))?;

        if content.trim().is_empty() {
            return Err(ApiError::validation("content", "Comment content is required"));
        }

        let now = Utc::now();
        Ok(self
            .store
            .create_comment(Comment {
                id: Uuid::new_v4(),
                article_id,
                user_id: actor.id,
                content: content.to_string(),
                created_at: now,
                updated_at: now,
            })
            .await?)
    }

    /// Rewrites a comment's content and refreshes its updated timestamp.
    /// Only the owner may edit.
    pub async fn update_comment(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        content: &str,
    ) -> ApiResult<Comment> {
        if actor.is_none() {
            return Err(ApiError::Authentication(
                "Please login to update comment".to_string(),
            ));
        }
        let Some(comment) = self.store.get_comment(id).await else {
            return Err(ApiError::NotFound("Comment"));
        };
        if !policy::allow(actor, Action::EditComment(&comment)) {
            return Err(ApiError::Authorization(
                "You can only edit your own comments".to_string(),
            ));
        }
        if content.trim().is_empty() {
            return Err(ApiError::validation("content", "Comment content is required"));
        }

        self.store
            .update_comment(id, content.to_string(), Utc::now())
            .await
            .ok_or(ApiError::NotFound("Comment"))
    }

    /// Removes a comment. The owner may always delete their own; an admin may
    /// delete anyone's. Hands back the removed record.
    pub async fn delete_comment(&self, actor: Option<&Actor>, id: Uuid) -> ApiResult<Comment> {
        if actor.is_none() {
            return Err(ApiError::Authentication(
                "Please login to delete comment".to_string(),
            ));
        }
        let Some(comment) = self.store.get_comment(id).await else {
            return Err(ApiError::NotFound("Comment"));
        };
        if !policy::allow(actor, Action::DeleteComment(&comment)) {
            return Err(ApiError::Authorization(
                "You can only delete your own comments".to_string(),
            ));
        }

        self.store.delete_comment(id).await;
        Ok(comment)
    }

    /// Partial update of the actor's own record: only fields present in the
    /// input change, absent fields are preserved.
    pub async fn update_profile(
        &self,
        actor: Option<&Actor>,
        input: UpdateUserInput,
    ) -> ApiResult<ProfilePayload> {
        let actor = self.require_self(actor)?;

        let mut changes = UserChanges {
            updated_at: Some(Utc::now()),
            ..UserChanges::default()
        };

        if let Some(first_name) = input.first_name {
            let first_name = first_name.trim().to_string();
            if first_name.is_empty() {
                return Err(ApiError::validation("firstName", "First name is required"));
            }
            changes.first_name = Some(first_name);
        }
        if let Some(last_name) = input.last_name {
            let last_name = last_name.trim().to_string();
            if last_name.is_empty() {
                return Err(ApiError::validation("lastName", "Last name is required"));
            }
            changes.last_name = Some(last_name);
        }
        if let Some(email) = input.email {
            let email = email.trim().to_lowercase();
            if !is_valid_email(&email) {
                return Err(ApiError::validation("email", "Please provide a valid email"));
            }
            if let Some(existing) = self.store.find_user_by_email(&email).await {
                if existing.id != actor.id {
                    return Err(ApiError::validation("email", "Email is already in use"));
                }
            }
            changes.email = Some(email);
        }

        let Some(user) = self.store.update_user(actor.id, changes).await? else {
            return Err(ApiError::NotFound("User"));
        };

        Ok(ProfilePayload {
            success: true,
            message: "Profile updated successfully".to_string(),
            user: Some(self.public_user(&user)),
        })
    }

    /// Rehashes after verifying the current password.
    pub async fn change_password(
        &self,
        actor: Option<&Actor>,
        current_password: &str,
        new_password: &str,
    ) -> ApiResult<MutationStatus> {
        let actor = self.require_self(actor)?;

        let Some(user) = self.store.get_user(actor.id).await else {
            return Err(ApiError::NotFound("User"));
        };
        if !self
            .credentials
            .verify_password(current_password, &user.password_hash)
        {
            return Err(ApiError::Authentication(
                "Current password is incorrect".to_string(),
            ));
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(
                "newPassword",
                "Password must be at least 6 characters",
            ));
        }

        let password_hash = self.credentials.hash_password(new_password)?;
        self.store
            .update_user(
                actor.id,
                UserChanges {
                    password_hash: Some(password_hash),
                    updated_at: Some(Utc::now()),
                    ..UserChanges::default()
                },
            )
            .await?;

        Ok(MutationStatus {
            success: true,
            message: "Password changed successfully".to_string(),
        })
    }

    /// Sets an explicit avatar URL, or resets to the generated identicon when
    /// the argument is null.
    pub async fn update_avatar(
        &self,
        actor: Option<&Actor>,
        avatar_url: Option<String>,
    ) -> ApiResult<ProfilePayload> {
        let actor = self.require_self(actor)?;

        let Some(user) = self.store.get_user(actor.id).await else {
            return Err(ApiError::NotFound("User"));
        };
        let avatar = match avatar_url.map(|url| url.trim().to_string()).filter(|url| !url.is_empty())
        {
            Some(url) => url,
            None => default_avatar_url(&user.full_name()),
        };

        let Some(user) = self
            .store
            .update_user(
                actor.id,
                UserChanges {
                    avatar: Some(avatar),
                    updated_at: Some(Utc::now()),
                    ..UserChanges::default()
                },
            )
            .await?
        else {
            return Err(ApiError::NotFound("User"));
        };

        Ok(ProfilePayload {
            success: true,
            message: "Avatar updated successfully".to_string(),
            user: Some(self.public_user(&user)),
        })
    }

    /// Hard-deletes the account after verifying the password. The extension
    /// record goes with it; comments stay behind with a dangling author
    /// reference.
    pub async fn delete_account(
        &self,
        actor: Option<&Actor>,
        password: &str,
    ) -> ApiResult<MutationStatus> {
        let actor = self.require_self(actor)?;

        let Some(user) = self.store.get_user(actor.id).await else {
            return Err(ApiError::NotFound("User"));
        };
        if !self.credentials.verify_password(password, &user.password_hash) {
            return Err(ApiError::Authentication("Password is incorrect".to_string()));
        }

        self.store.delete_profile(user.id).await;
        if !self.store.delete_user(user.id).await {
            return Err(ApiError::NotFound("User"));
        }

        Ok(MutationStatus {
            success: true,
            message: "Account deleted successfully".to_string(),
        })
    }

    // --- REST Surface Operations ---

    /// Every article, including unpublished ones. Admin only.
    pub async fn admin_articles(&self, actor: Option<&Actor>) -> ApiResult<Vec<Article>> {
        if !policy::allow(actor, Action::ModerateArticles) {
            return Err(deny_admin(actor));
        }
        Ok(self.store.list_all_articles().await)
    }

    /// Removes an article record outright. Admin only; comments are not
    /// reattached or removed.
    pub async fn admin_delete_article(&self, actor: Option<&Actor>, id: Uuid) -> ApiResult<()> {
        if !policy::allow(actor, Action::DeleteArticle) {
            return Err(deny_admin(actor));
        }
        if self.store.delete_article(id).await {
            Ok(())
        } else {
            Err(ApiError::NotFound("Article"))
        }
    }

    /// Store connectivity plus collection counts for the liveness probe.
    pub async fn health(&self) -> HealthResponse {
        match self.store.stats().await {
            Some(counts) => HealthResponse {
                status: "ok".to_string(),
                database: true,
                counts: Some(counts),
            },
            None => HealthResponse {
                status: "degraded".to_string(),
                database: false,
                counts: None,
            },
        }
    }
}

/// Admin-gated endpoints distinguish "who are you" from "you may not".
fn deny_admin(actor: Option<&Actor>) -> ApiError {
    match actor {
        None => ApiError::Authentication("Not authenticated".to_string()),
        Some(_) => ApiError::Authorization("Admin access required".to_string()),
    }
}
