#![allow(dead_code)]

use reqwest::Client;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Once,
};
use tokio::sync::OnceCell;

static INIT: Once = Once::new();
static SCHEMA_READY: OnceCell<()> = OnceCell::const_new();
static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let config = promptmart::config::jwt::JwtConfig::from_env().unwrap();
        let _ = promptmart::utils::jwt::init_jwt_config(config);
    });
}

fn database_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"))
}

/// Unique suffix shared by every helper in a test binary.
pub fn next_id() -> usize {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }
}

pub async fn spawn_app() -> TestApp {
    init_env();

    // Migrate and wipe once per test binary; tests in the same binary run
    // concurrently and rely on unique names instead of an empty database.
    SCHEMA_READY
        .get_or_init(|| async {
            let db = sea_orm::Database::connect(&database_url())
                .await
                .expect("Failed to connect to test database");
            promptmart::migration::Migrator::up(&db, None)
                .await
                .expect("Failed to run migrations");
            cleanup_tables(&db).await;
        })
        .await;

    let db = sea_orm::Database::connect(&database_url())
        .await
        .expect("Failed to connect to test database");

    let app = axum::Router::new()
        .route("/", axum::routing::get(|| async { "ok" }))
        .merge(promptmart::routes::create_routes())
        .layer(axum::extract::Extension(db.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        db,
        client: Client::new(),
    }
}

async fn cleanup_tables(db: &DatabaseConnection) {
    let tables = [
        "audit_logs",
        "likes",
        "comments",
        "prompts",
        "categories",
        "users",
    ];

    for table in tables {
        let sql = format!("TRUNCATE TABLE {} RESTART IDENTITY CASCADE", table);
        let _ = db
            .execute(Statement::from_string(
                sea_orm::DatabaseBackend::Postgres,
                sql,
            ))
            .await;
    }
}

pub async fn json_body(resp: reqwest::Response) -> Value {
    let status = resp.status();
    resp.json()
        .await
        .unwrap_or_else(|e| panic!("Failed to parse response: status={}, error={}", status, e))
}

/// Register a user and return (user_id, access_token).
pub async fn create_test_user(app: &TestApp, username_prefix: &str) -> (i32, String) {
    let unique_username = format!("{}_{}", username_prefix, next_id());

    let resp = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({
            "username": unique_username,
            "email": format!("{}@test.com", unique_username),
            "password": "test_password_123"
        }))
        .send()
        .await
        .expect("Failed to register user");

    let status = resp.status();
    let body = json_body(resp).await;
    if !body["success"].as_bool().unwrap_or(false) {
        panic!(
            "Failed to register user '{}': status={}, body={}",
            unique_username, status, body
        );
    }

    let user_id = body["data"]["user"]["id"]
        .as_i64()
        .unwrap_or_else(|| panic!("Response missing user id: {}", body)) as i32;
    let token = body["data"]["access_token"]
        .as_str()
        .unwrap_or_else(|| panic!("Response missing access token: {}", body))
        .to_string();
    (user_id, token)
}

/// Register a user and promote it to admin. Returns (user_id, access_token).
pub async fn create_test_admin(app: &TestApp) -> (i32, String) {
    let (id, token) = create_test_user(app, "admin").await;
    make_admin(&app.db, id).await;
    (id, token)
}

/// Make a user admin by directly updating the database.
pub async fn make_admin(db: &DatabaseConnection, user_id: i32) {
    db.execute(Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Postgres,
        "UPDATE users SET role = 'admin' WHERE id = $1",
        vec![user_id.into()],
    ))
    .await
    .expect("Failed to make user admin");
}

/// Overwrite a user's permission matrix directly in the database.
pub async fn set_permissions(db: &DatabaseConnection, user_id: i32, permissions: Value) {
    db.execute(Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Postgres,
        "UPDATE users SET permissions = $1 WHERE id = $2",
        vec![permissions.into(), user_id.into()],
    ))
    .await
    .expect("Failed to set permissions");
}

/// Create a category through the admin API and return (id, slug).
pub async fn create_test_category(app: &TestApp, admin_token: &str) -> (i32, String) {
    let n = next_id();
    let resp = app
        .client
        .post(app.url("/admin/categories"))
        .bearer_auth(admin_token)
        .json(&json!({
            "name": format!("Category {}", n),
            "slug": format!("category-{}", n),
            "description": "Test category"
        }))
        .send()
        .await
        .expect("Failed to create category");

    let status = resp.status();
    let body = json_body(resp).await;
    if !body["success"].as_bool().unwrap_or(false) {
        panic!("Failed to create category: status={}, body={}", status, body);
    }
    let id = body["data"]["id"].as_i64().expect("Response missing id") as i32;
    let slug = body["data"]["slug"].as_str().expect("Response missing slug");
    (id, slug.to_string())
}

/// Submit a prompt as `token` and return its id. The prompt starts pending.
pub async fn create_test_prompt(app: &TestApp, token: &str, category_id: i32) -> i32 {
    let n = next_id();
    let resp = app
        .client
        .post(app.url("/prompts"))
        .bearer_auth(token)
        .json(&json!({
            "title": format!("Prompt {}", n),
            "content": format!("You are a helpful assistant number {}.", n),
            "description": "Test prompt",
            "category_id": category_id,
            "model": "gpt-4o"
        }))
        .send()
        .await
        .expect("Failed to create prompt");

    let status = resp.status();
    let body = json_body(resp).await;
    if !body["success"].as_bool().unwrap_or(false) {
        panic!("Failed to create prompt: status={}, body={}", status, body);
    }
    body["data"]["id"].as_i64().expect("Response missing id") as i32
}

/// Review a prompt through the admin API and return the response body.
pub async fn review_prompt(
    app: &TestApp,
    admin_token: &str,
    prompt_id: i32,
    status: &str,
    reason: Option<&str>,
) -> Value {
    let resp = app
        .client
        .put(app.url(&format!("/admin/prompts/{}/review", prompt_id)))
        .bearer_auth(admin_token)
        .json(&json!({ "status": status, "reason": reason }))
        .send()
        .await
        .expect("Failed to review prompt");
    json_body(resp).await
}

/// Create a category and an approved prompt owned by `owner_token`.
/// Returns (category_slug, prompt_id).
pub async fn create_approved_prompt(
    app: &TestApp,
    admin_token: &str,
    owner_token: &str,
) -> (String, i32) {
    let (category_id, slug) = create_test_category(app, admin_token).await;
    let prompt_id = create_test_prompt(app, owner_token, category_id).await;
    let body = review_prompt(app, admin_token, prompt_id, "approved", None).await;
    assert!(
        body["success"].as_bool().unwrap_or(false),
        "approve failed: {}",
        body
    );
    (slug, prompt_id)
}
