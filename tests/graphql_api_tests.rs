use chrono::{Duration, Utc};
use newsdesk::{
    AppConfig, AppState, ContentStore, InMemoryContentStore, create_router,
    models::{Article, User},
    repository::StoreState,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryContentStore>,
}

async fn spawn_app() -> TestApp {
    let store = Arc::new(InMemoryContentStore::new());
    let state = AppState::new(store.clone() as StoreState, AppConfig::default());
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, store }
}

/// Posts a GraphQL query and returns the decoded `{data, errors?}` body.
async fn gql(
    client: &reqwest::Client,
    address: &str,
    query: &str,
    token: Option<&str>,
) -> serde_json::Value {
    let mut request = client
        .post(format!("{}/graphql", address))
        .json(&serde_json::json!({ "query": query }));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    request
        .send()
        .await
        .expect("graphql request failed")
        .json()
        .await
        .expect("graphql response was not json")
}

fn first_error_message(body: &serde_json::Value) -> &str {
    body["errors"][0]["message"].as_str().unwrap_or_default()
}

async fn register(
    client: &reqwest::Client,
    address: &str,
    first: &str,
    last: &str,
    email: &str,
    password: &str,
) -> serde_json::Value {
    let query = format!(
        r#"mutation {{
            register(firstName: "{first}", lastName: "{last}", email: "{email}", password: "{password}") {{
                token
                user {{ id firstName lastName email avatar role }}
            }}
        }}"#
    );
    gql(client, address, &query, None).await
}

/// Seeds an admin account directly in the store; tests authenticate as it via
/// the local-env x-user-id bypass.
async fn seed_admin(app: &TestApp) -> Uuid {
    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4(),
        first_name: "Site".to_string(),
        last_name: "Admin".to_string(),
        email: "admin@example.com".to_string(),
        password_hash: String::new(),
        avatar: None,
        role: "admin".to_string(),
        email_verified: true,
        created_at: now,
        updated_at: now,
        last_login: None,
    };
    let id = admin.id;
    app.store.create_user(admin).await.unwrap();
    id
}

fn sample_article(title: &str, category: &str, published: bool, featured: bool) -> Article {
    let now = Utc::now();
    Article {
        id: Uuid::new_v4(),
        title: title.to_string(),
        excerpt: "A reasonably descriptive excerpt for testing.".to_string(),
        content: "Body text for the sample article.".to_string(),
        category: category.to_string(),
        author: "Test Desk".to_string(),
        featured_image: "https://example.com/cover.jpg".to_string(),
        tags: vec![],
        views: 0,
        read_time: 1,
        is_featured: featured,
        is_published: published,
        published_at: now,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn register_then_me_roundtrip() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let body = register(
        &client,
        &app.address,
        "Amara",
        "Okafor",
        "Amara@Example.com",
        "secret7",
    )
    .await;
    assert!(body["errors"].is_null(), "unexpected errors: {body}");
    let token = body["data"]["register"]["token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["register"]["user"]["email"], "amara@example.com");

    let me = gql(&client, &app.address, "{ me { firstName email role } }", Some(&token)).await;
    assert_eq!(me["data"]["me"]["firstName"], "Amara");
    assert_eq!(me["data"]["me"]["email"], "amara@example.com");
    assert_eq!(me["data"]["me"]["role"], "reader");
}

#[tokio::test]
async fn me_requires_authentication() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let body = gql(&client, &app.address, "{ me { email } }", None).await;
    assert_eq!(first_error_message(&body), "Not authenticated");

    // A garbage token is treated as anonymous, not as a transport error.
    let body = gql(
        &client,
        &app.address,
        "{ me { email } }",
        Some("not-a-real-token"),
    )
    .await;
    assert_eq!(first_error_message(&body), "Not authenticated");
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let first = register(
        &client,
        &app.address,
        "Dana",
        "Whitfield",
        "Dana@Example.com",
        "secret7",
    )
    .await;
    assert!(first["errors"].is_null());

    let second = register(
        &client,
        &app.address,
        "Imposter",
        "Whitfield",
        "dana@example.com",
        "different8",
    )
    .await;
    assert_eq!(
        first_error_message(&second),
        "User already exists with this email"
    );

    // The failed attempt must not have created a record.
    let stats = app.store.stats().await.unwrap();
    assert_eq!(stats.users, 1);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register(
        &client,
        &app.address,
        "Femi",
        "Adeyemi",
        "femi@example.com",
        "secret7",
    )
    .await;

    let wrong_password = gql(
        &client,
        &app.address,
        r#"mutation { login(email: "femi@example.com", password: "wrong99") { token } }"#,
        None,
    )
    .await;
    let unknown_email = gql(
        &client,
        &app.address,
        r#"mutation { login(email: "nobody@example.com", password: "secret7") { token } }"#,
        None,
    )
    .await;

    // Same message for both failure modes, and neither issues a token.
    assert_eq!(first_error_message(&wrong_password), "Invalid credentials");
    assert_eq!(
        first_error_message(&wrong_password),
        first_error_message(&unknown_email)
    );
    assert!(wrong_password["data"]["login"].is_null());
    assert!(unknown_email["data"]["login"].is_null());
}

#[tokio::test]
async fn login_records_last_login() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let body = register(
        &client,
        &app.address,
        "Lena",
        "Brooks",
        "lena@example.com",
        "secret7",
    )
    .await;
    let user_id: Uuid = body["data"]["register"]["user"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(app.store.get_user(user_id).await.unwrap().last_login.is_none());

    let login = gql(
        &client,
        &app.address,
        r#"mutation { login(email: "lena@example.com", password: "secret7") { token } }"#,
        None,
    )
    .await;
    assert!(login["errors"].is_null());
    assert!(app.store.get_user(user_id).await.unwrap().last_login.is_some());
}

#[tokio::test]
async fn create_article_requires_admin_and_derives_read_time() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_id = seed_admin(&app).await;

    let reader = register(
        &client,
        &app.address,
        "Rosa",
        "Mendes",
        "rosa@example.com",
        "secret7",
    )
    .await;
    let reader_token = reader["data"]["register"]["token"].as_str().unwrap();

    let four_hundred_words = vec!["word"; 400].join(" ");
    let mutation = format!(
        r#"mutation {{
            createArticle(
                title: "Budget vote lands tonight",
                excerpt: "The council's budget vote arrives after weeks of dispute.",
                content: "{four_hundred_words}",
                category: "politics",
                tags: ["Budget", " City Hall "]
            ) {{ id readTime views isFeatured author tags }}
        }}"#
    );

    // Anonymous and reader actors are both refused with the same message.
    let anon = gql(&client, &app.address, &mutation, None).await;
    assert_eq!(first_error_message(&anon), "Admin access required");
    let as_reader = gql(&client, &app.address, &mutation, Some(reader_token)).await;
    assert_eq!(first_error_message(&as_reader), "Admin access required");
    assert_eq!(app.store.stats().await.unwrap().articles, 0);

    // The admin path goes through the local x-user-id bypass.
    let created: serde_json::Value = client
        .post(format!("{}/graphql", app.address))
        .header("x-user-id", admin_id.to_string())
        .json(&serde_json::json!({ "query": mutation }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(created["errors"].is_null(), "unexpected errors: {created}");
    let article = &created["data"]["createArticle"];
    // 400 words at 200 wpm.
    assert_eq!(article["readTime"], 2);
    assert_eq!(article["views"], 0);
    assert_eq!(article["isFeatured"], false);
    // Author defaults when not supplied; tags are normalized to lowercase.
    assert_eq!(article["author"], "Admin User");
    assert_eq!(
        article["tags"],
        serde_json::json!(["budget", "city hall"])
    );
}

#[tokio::test]
async fn create_article_validates_fields() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_id = seed_admin(&app).await;

    let cases = [
        (
            r#"createArticle(title: "Hey", excerpt: "Long enough excerpt for validation.", content: "Body", category: "politics") { id }"#,
            "Title must be at least 5 characters",
        ),
        (
            r#"createArticle(title: "A proper title", excerpt: "Too short", content: "Body", category: "politics") { id }"#,
            "Excerpt must be at least 20 characters",
        ),
        (
            r#"createArticle(title: "A proper title", excerpt: "Long enough excerpt for validation.", content: "Body", category: "gossip") { id }"#,
            "'gossip' is not a valid category",
        ),
    ];

    for (mutation, expected) in cases {
        let body: serde_json::Value = client
            .post(format!("{}/graphql", app.address))
            .header("x-user-id", admin_id.to_string())
            .json(&serde_json::json!({ "query": format!("mutation {{ {mutation} }}") }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(first_error_message(&body), expected);
    }
    assert_eq!(app.store.stats().await.unwrap().articles, 0);
}

#[tokio::test]
async fn fetching_an_article_increments_its_view_counter() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let article = sample_article("Transit plan revealed", "politics", true, false);
    let id = article.id;
    app.store.create_article(article).await.unwrap();

    let query = format!(r#"{{ article(id: "{id}") {{ views }} }}"#);
    let first = gql(&client, &app.address, &query, None).await;
    let second = gql(&client, &app.address, &query, None).await;

    assert_eq!(first["data"]["article"]["views"], 1);
    assert_eq!(second["data"]["article"]["views"], 2);
}

#[tokio::test]
async fn missing_article_is_null_without_an_error() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let query = format!(r#"{{ article(id: "{}") {{ id }} }}"#, Uuid::new_v4());
    let body = gql(&client, &app.address, &query, None).await;
    assert!(body["data"]["article"].is_null());
    assert!(body["errors"].is_null());
}

#[tokio::test]
async fn article_listing_hides_unpublished_and_respects_filters() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let mut old = sample_article("Older politics piece", "politics", true, false);
    old.published_at = Utc::now() - Duration::hours(2);
    app.store.create_article(old).await.unwrap();
    app.store
        .create_article(sample_article("Fresh politics piece", "politics", true, false))
        .await
        .unwrap();
    app.store
        .create_article(sample_article("Culture column", "culture", true, false))
        .await
        .unwrap();
    app.store
        .create_article(sample_article("Hidden draft", "politics", false, false))
        .await
        .unwrap();

    let all = gql(&client, &app.address, r#"{ articles { title } }"#, None).await;
    let titles: Vec<&str> = all["data"]["articles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        vec!["Fresh politics piece", "Culture column", "Older politics piece"]
    );

    let politics = gql(
        &client,
        &app.address,
        r#"{ articles(category: "politics") { title } }"#,
        None,
    )
    .await;
    assert_eq!(politics["data"]["articles"].as_array().unwrap().len(), 2);

    let paged = gql(
        &client,
        &app.address,
        r#"{ articles(limit: 1, skip: 1) { title } }"#,
        None,
    )
    .await;
    let paged = paged["data"]["articles"].as_array().unwrap().clone();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0]["title"], "Culture column");
}

#[tokio::test]
async fn featured_articles_returns_newest_five() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    for i in 0..7 {
        let mut article = sample_article(&format!("Featured {i}"), "culture", true, true);
        article.published_at = Utc::now() - Duration::minutes(i);
        app.store.create_article(article).await.unwrap();
    }
    // Featured but unpublished must not appear.
    app.store
        .create_article(sample_article("Featured draft", "culture", false, true))
        .await
        .unwrap();

    let body = gql(&client, &app.address, r#"{ featuredArticles { title } }"#, None).await;
    let titles: Vec<&str> = body["data"]["featuredArticles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        vec!["Featured 0", "Featured 1", "Featured 2", "Featured 3", "Featured 4"]
    );
}

#[tokio::test]
async fn search_matches_title_content_and_tags_on_published_only() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let mut by_title = sample_article("Justice reform stalls", "justice", true, false);
    by_title.published_at = Utc::now() - Duration::minutes(1);
    app.store.create_article(by_title).await.unwrap();

    let mut by_content = sample_article("Court backlog grows", "justice", true, false);
    by_content.content = "The justice system faces a record backlog.".to_string();
    by_content.published_at = Utc::now() - Duration::minutes(2);
    app.store.create_article(by_content).await.unwrap();

    let mut by_tag = sample_article("Weekend long read", "culture", true, false);
    by_tag.tags = vec!["justice".to_string(), "essay".to_string()];
    by_tag.published_at = Utc::now() - Duration::minutes(3);
    app.store.create_article(by_tag).await.unwrap();

    let mut hidden = sample_article("Justice draft", "justice", false, false);
    hidden.content = "justice everywhere".to_string();
    app.store.create_article(hidden).await.unwrap();

    app.store
        .create_article(sample_article("Unrelated sports recap", "sports", true, false))
        .await
        .unwrap();

    let hits = gql(
        &client,
        &app.address,
        r#"{ searchArticles(query: "JUSTICE") { title } }"#,
        None,
    )
    .await;
    let titles: Vec<&str> = hits["data"]["searchArticles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        vec![
            "Justice reform stalls",
            "Court backlog grows",
            "Weekend long read"
        ]
    );

    // An empty query matches nothing, not everything.
    let empty = gql(
        &client,
        &app.address,
        r#"{ searchArticles(query: "") { title } }"#,
        None,
    )
    .await;
    assert_eq!(empty["data"]["searchArticles"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn comment_lifecycle_enforces_ownership() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_id = seed_admin(&app).await;

    let article = sample_article("Open thread", "culture", true, false);
    let article_id = article.id;
    app.store.create_article(article).await.unwrap();

    let user_a = register(&client, &app.address, "Ana", "Silva", "ana@example.com", "secret7").await;
    let token_a = user_a["data"]["register"]["token"].as_str().unwrap();
    let user_b = register(&client, &app.address, "Ben", "Cole", "ben@example.com", "secret7").await;
    let token_b = user_b["data"]["register"]["token"].as_str().unwrap();

    // Anonymous commenting is refused.
    let anon = gql(
        &client,
        &app.address,
        &format!(r#"mutation {{ addComment(articleId: "{article_id}", content: "hi") {{ id }} }}"#),
        None,
    )
    .await;
    assert_eq!(first_error_message(&anon), "Please login to comment");

    // A posts a comment.
    let added = gql(
        &client,
        &app.address,
        &format!(
            r#"mutation {{ addComment(articleId: "{article_id}", content: "First!") {{ id createdAt updatedAt user {{ email }} }} }}"#
        ),
        Some(token_a),
    )
    .await;
    assert!(added["errors"].is_null(), "unexpected errors: {added}");
    let comment = &added["data"]["addComment"];
    assert_eq!(comment["user"]["email"], "ana@example.com");
    let comment_id = comment["id"].as_str().unwrap().to_string();

    // A edits their own comment; updatedAt moves forward.
    let edited = gql(
        &client,
        &app.address,
        &format!(
            r#"mutation {{ updateComment(id: "{comment_id}", content: "First! (edited)") {{ content createdAt updatedAt }} }}"#
        ),
        Some(token_a),
    )
    .await;
    assert!(edited["errors"].is_null());
    let edited = &edited["data"]["updateComment"];
    assert_eq!(edited["content"], "First! (edited)");
    assert!(
        edited["updatedAt"].as_str().unwrap() > edited["createdAt"].as_str().unwrap(),
        "updatedAt should be refreshed by the edit"
    );

    // B may neither edit nor delete A's comment.
    let foreign_edit = gql(
        &client,
        &app.address,
        &format!(r#"mutation {{ updateComment(id: "{comment_id}", content: "hijack") {{ id }} }}"#),
        Some(token_b),
    )
    .await;
    assert_eq!(
        first_error_message(&foreign_edit),
        "You can only edit your own comments"
    );
    let foreign_delete = gql(
        &client,
        &app.address,
        &format!(r#"mutation {{ deleteComment(id: "{comment_id}") {{ id }} }}"#),
        Some(token_b),
    )
    .await;
    assert_eq!(
        first_error_message(&foreign_delete),
        "You can only delete your own comments"
    );

    // An admin deletes it regardless of ownership.
    let admin_delete: serde_json::Value = client
        .post(format!("{}/graphql", app.address))
        .header("x-user-id", admin_id.to_string())
        .json(&serde_json::json!({
            "query": format!(r#"mutation {{ deleteComment(id: "{comment_id}") {{ id content }} }}"#)
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(admin_delete["errors"].is_null());
    assert_eq!(admin_delete["data"]["deleteComment"]["content"], "First! (edited)");

    let remaining = gql(
        &client,
        &app.address,
        &format!(r#"{{ comments(articleId: "{article_id}") {{ id }} }}"#),
        None,
    )
    .await;
    assert_eq!(remaining["data"]["comments"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn editing_a_missing_comment_is_not_found() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let user = register(&client, &app.address, "Kim", "Lee", "kim@example.com", "secret7").await;
    let token = user["data"]["register"]["token"].as_str().unwrap();

    let body = gql(
        &client,
        &app.address,
        &format!(
            r#"mutation {{ updateComment(id: "{}", content: "ghost") {{ id }} }}"#,
            Uuid::new_v4()
        ),
        Some(token),
    )
    .await;
    assert_eq!(first_error_message(&body), "Comment not found");
}

#[tokio::test]
async fn comments_are_listed_newest_first() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let article = sample_article("Discussion", "culture", true, false);
    let article_id = article.id;
    app.store.create_article(article).await.unwrap();

    let user = register(&client, &app.address, "Joy", "Park", "joy@example.com", "secret7").await;
    let token = user["data"]["register"]["token"].as_str().unwrap();

    for text in ["first", "second", "third"] {
        let body = gql(
            &client,
            &app.address,
            &format!(
                r#"mutation {{ addComment(articleId: "{article_id}", content: "{text}") {{ id }} }}"#
            ),
            Some(token),
        )
        .await;
        assert!(body["errors"].is_null());
    }

    let listed = gql(
        &client,
        &app.address,
        &format!(r#"{{ comments(articleId: "{article_id}") {{ content }} }}"#),
        None,
    )
    .await;
    let contents: Vec<&str> = listed["data"]["comments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["third", "second", "first"]);
}
