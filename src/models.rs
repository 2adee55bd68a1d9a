use async_graphql::{InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Content Vocabulary ---

/// The fixed category enumeration for articles. Any write carrying a category
/// outside this list fails validation before it reaches the store.
pub const CATEGORIES: [&str; 8] = [
    "politics",
    "culture",
    "health",
    "education",
    "economy",
    "justice",
    "sports",
    "entertainment",
];

pub fn is_valid_category(value: &str) -> bool {
    CATEGORIES.contains(&value)
}

// --- Core Application Schemas (Mapped to Database) ---

/// Article
///
/// Represents a published piece of content from the `articles` table.
/// This is the primary data structure for the core business logic.
///
/// `views` is a monotonic counter: it only increases, and only through the
/// single-article fetch operation. `read_time` is derived from the word count
/// at creation unless explicitly supplied.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, SimpleObject, Default)]
#[ts(export)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    // One of CATEGORIES. Stored as plain text, validated at the resolution layer.
    pub category: String,
    // Display name, free text. Not a foreign key to users.
    pub author: String,
    pub featured_image: String,
    // Ordered list of lowercase tag strings.
    pub tags: Vec<String>,
    pub views: i64,
    // Estimated minutes to read, >= 1.
    pub read_time: i32,
    pub is_featured: bool,
    // Unpublished articles are invisible to every public read path.
    pub is_published: bool,

    #[ts(type = "string")]
    pub published_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// User
///
/// The canonical identity record stored in the `users` table. This struct is
/// internal to the server: the password hash never leaves it, and responses are
/// shaped through [`PublicUser`] instead.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    // Unique, stored lowercased.
    pub email: String,
    // One-way argon2 hash. Excluded from every serialized form.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    // Explicit avatar URL. When None, a generated identicon URL is derived at read time.
    pub avatar: Option<String>,
    // RBAC field: 'reader', 'contributor' or 'admin'. Not mutable through the public surface.
    pub role: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Convenience used by the policy tests and seed helpers.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// PublicUser
///
/// The outward-facing projection of a [`User`], exposed as the GraphQL `User`
/// type. `avatar` is always populated: explicit URL when set, generated
/// identicon otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, SimpleObject, Default)]
#[graphql(name = "User")]
#[ts(export)]
pub struct PublicUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub avatar: String,
    pub role: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Comment
///
/// A comment record from the `comments` table. `article_id` is a plain
/// reference (no cascade is enforced), and the author is resolved lazily
/// through the `user` field rather than embedded.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, SimpleObject, Default)]
#[graphql(complex)]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub article_id: Uuid,
    // Ownership key. Hidden from the wire; clients see the resolved `user` field.
    #[graphql(skip)]
    pub user_id: Uuid,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- User Profile Extension (1:1 with User, reserved schema) ---

/// SocialLinks
///
/// Optional outbound links on a user's extended profile.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct SocialLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
}

/// A single reading-history entry: which article, when.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReadingEntry {
    pub article_id: Uuid,
    #[ts(type = "string")]
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EmailNotificationPrefs {
    pub new_articles: bool,
    pub comments: bool,
    pub replies: bool,
    pub newsletter: bool,
}

impl Default for EmailNotificationPrefs {
    fn default() -> Self {
        Self {
            new_articles: true,
            comments: true,
            replies: true,
            newsletter: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PushNotificationPrefs {
    pub new_articles: bool,
    pub comments: bool,
}

impl Default for PushNotificationPrefs {
    fn default() -> Self {
        Self {
            new_articles: false,
            comments: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct NotificationPreferences {
    pub email: EmailNotificationPrefs,
    pub push: PushNotificationPrefs,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PrivacySettings {
    // 'public', 'private' or 'friends'.
    pub profile_visibility: String,
    pub show_email: bool,
    pub show_location: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            profile_visibility: "public".to_string(),
            show_email: false,
            show_location: true,
        }
    }
}

/// UserProfile
///
/// Extension record, 1:1 with [`User`]. A plain data bag: it is created with
/// defaults when the account is registered, removed when the account is
/// deleted, and none of its preference fields are readable or writable
/// through the query surface. Persisted as a single JSONB document.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub interests: Vec<String>,
    pub social_links: SocialLinks,
    pub reading_history: Vec<ReadingEntry>,
    pub saved_articles: Vec<Uuid>,
    pub liked_articles: Vec<Uuid>,
    pub notification_preferences: NotificationPreferences,
    pub privacy_settings: PrivacySettings,
    #[ts(type = "string")]
    pub last_active: DateTime<Utc>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// A fresh profile with every preference at its default value.
    pub fn with_defaults(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            last_active: now,
            created_at: now,
            updated_at: now,
            ..Self::default()
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// ArticleDraft
///
/// The resolution layer's input for creating an article, after the GraphQL
/// arguments have been collected. Optional fields fall back to defaults at
/// write time; `read_time` overrides the word-count derivation when supplied.
#[derive(Debug, Clone, Default)]
pub struct ArticleDraft {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    pub author: Option<String>,
    pub featured_image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_featured: bool,
    pub read_time: Option<i32>,
}

/// UpdateUserInput
///
/// Partial update payload for the profile mutation.
///
/// Uses `Option<T>` for all fields and `#[serde(skip_serializing_if = "Option::is_none")]`
/// so that only fields explicitly present in the input are changed; absent
/// fields are preserved, never nulled.
#[derive(Debug, Clone, Serialize, Deserialize, TS, InputObject, Default)]
#[ts(export)]
pub struct UpdateUserInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// UserChanges
///
/// Internal partial-update record handed to the store. Every `Some` field is
/// written, every `None` field is preserved (COALESCE semantics in Postgres).
/// Timestamps are supplied by the resolution layer, never computed by the store.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub password_hash: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// ArticleFilter
///
/// Listing parameters for the public article feed: optional category and
/// featured filters plus offset/limit paging. Only published articles are
/// visible through this path regardless of the filter.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub category: Option<String>,
    pub is_featured: Option<bool>,
    pub skip: i64,
    pub limit: i64,
}

// --- Response Payloads (Output Schemas) ---

/// AuthPayload
///
/// Result of `register` and `login`: a signed bearer token plus the public
/// projection of the account it identifies.
#[derive(Debug, Clone, Serialize, TS, SimpleObject)]
#[ts(export)]
pub struct AuthPayload {
    pub token: String,
    pub user: PublicUser,
}

/// ProfilePayload
///
/// Result shape for profile mutations that hand back the updated record
/// (`updateProfile`, `updateAvatar`).
#[derive(Debug, Clone, Serialize, TS, SimpleObject)]
#[ts(export)]
pub struct ProfilePayload {
    pub success: bool,
    pub message: String,
    pub user: Option<PublicUser>,
}

/// MutationStatus
///
/// Result shape for mutations that only need to acknowledge
/// (`changePassword`, `deleteAccount`).
#[derive(Debug, Clone, Serialize, TS, SimpleObject)]
#[ts(export)]
pub struct MutationStatus {
    pub success: bool,
    pub message: String,
}

// --- Store & REST Schemas ---

/// StoreStats
///
/// Basic collection counts compiled by the store for the health probe.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct StoreStats {
    pub articles: i64,
    pub users: i64,
    pub comments: i64,
}

/// ArticleListResponse
///
/// Envelope for the admin REST listing (GET /admin/articles).
#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct ArticleListResponse {
    pub success: bool,
    pub articles: Vec<Article>,
}

/// DeleteArticleResponse
///
/// Envelope for the admin REST delete (DELETE /admin/articles/{id}).
#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct DeleteArticleResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// HealthResponse
///
/// Liveness probe payload: store connectivity plus basic counts.
#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct HealthResponse {
    // "ok" when the store answers, "degraded" otherwise.
    pub status: String,
    pub database: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<StoreStats>,
}
