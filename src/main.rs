use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use promptmart::{
    config, handlers, migration, routes, services, services::cache::CacheService, utils,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use std::env;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Auth
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh_token,
        handlers::auth::get_current_user,
        // Prompts
        handlers::prompt::list_prompts,
        handlers::prompt::get_prompt,
        handlers::prompt::create_prompt,
        handlers::prompt::update_prompt,
        handlers::prompt::delete_prompt,
        // Likes
        handlers::like::toggle_like,
        handlers::like::get_like_state,
        // Comments
        handlers::comment::list_comments,
        handlers::comment::create_comment,
        handlers::comment::delete_comment,
        handlers::comment::report_comment,
        // Categories
        handlers::category::list_categories,
        handlers::category::get_category,
        // Users
        handlers::user::get_user_profile,
        handlers::user::list_user_prompts,
        // Current user
        handlers::me::list_my_likes,
        handlers::me::list_my_prompts,
        handlers::me::delete_my_prompt,
        // Admin
        handlers::admin::get_stats,
        handlers::admin::list_prompts,
        handlers::admin::pending_count,
        handlers::admin::review_prompt,
        handlers::admin::batch_review,
        handlers::admin::delete_prompt,
        handlers::admin::batch_delete_prompts,
        handlers::admin::list_comments,
        handlers::admin::set_comment_status,
        handlers::admin::delete_comment,
        handlers::admin::list_users,
        handlers::admin::create_user,
        handlers::admin::delete_user,
        handlers::admin::update_user_role,
        handlers::admin::update_user_permissions,
        handlers::admin::list_logs,
        handlers::category::create_category,
        handlers::category::update_category,
        handlers::category::delete_category,
    ),
    components(
        schemas(
            promptmart::response::PaginationQuery,
            promptmart::error::AppError,
            promptmart::models::PromptStatus,
            promptmart::models::CommentStatus,
            promptmart::models::UserRole,
            promptmart::models::PermissionMatrix,
            // Auth
            handlers::auth::RegisterRequest,
            handlers::auth::LoginRequest,
            handlers::auth::RefreshTokenRequest,
            handlers::auth::TokenResponse,
            handlers::auth::AuthResponse,
            handlers::auth::UserResponse,
            // Prompts
            handlers::prompt::PromptRequest,
            handlers::prompt::PromptResponse,
            handlers::prompt::PromptListQuery,
            services::like::LikeState,
            // Comments
            handlers::comment::CreateCommentRequest,
            handlers::comment::CommentResponse,
            // Categories
            handlers::category::CategoryRequest,
            handlers::category::CategoryResponse,
            services::category::CategoryWithCount,
            // Users
            handlers::user::UserProfileResponse,
            handlers::me::MyPromptsQuery,
            // Admin
            services::admin::AdminStats,
            services::admin::TopPrompt,
            handlers::admin::AdminPromptQuery,
            handlers::admin::BatchIdsRequest,
            handlers::admin::BatchDeleteResponse,
            handlers::admin::PendingCountResponse,
            handlers::admin::ReviewRequest,
            handlers::admin::BatchReviewRequest,
            handlers::admin::AdminCommentQuery,
            handlers::admin::CommentStatusRequest,
            handlers::admin::AdminUserQuery,
            handlers::admin::CreateUserRequest,
            handlers::admin::UpdateRoleRequest,
            handlers::admin::UpdatePermissionsRequest,
            handlers::admin::AuditLogQuery,
            handlers::admin::AuditLogResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and tokens"),
        (name = "prompts", description = "Prompt browsing and submission"),
        (name = "likes", description = "Like toggling"),
        (name = "comments", description = "Comments and reports"),
        (name = "categories", description = "Prompt categories"),
        (name = "users", description = "Public user profiles"),
        (name = "me", description = "The signed-in user's own content"),
        (name = "admin", description = "Back-office operations"),
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "promptmart=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let jwt_config = validate_config()?;
    utils::jwt::init_jwt_config(jwt_config)?;

    tracing::info!("Starting promptmart v{}...", env!("CARGO_PKG_VERSION"));

    let db = config::database::get_database().await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    services::bootstrap_admin::ensure_bootstrap_admin(&db).await?;

    // Redis is optional; without it the category list is read from the database every time.
    let cache = if env::var("REDIS_URL").is_ok() {
        match config::redis::get_redis().await {
            Ok(conn) => {
                tracing::info!("Redis connected successfully");
                Some(CacheService::new(conn))
            }
            Err(e) => {
                tracing::warn!("Redis unavailable, running without cache: {}", e);
                None
            }
        }
    } else {
        tracing::info!("REDIS_URL not set, running without cache");
        None
    };

    let mut app = create_app().layer(Extension(db));
    if let Some(cache) = cache {
        app = app.layer(Extension(cache));
    }

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Fail fast on missing or invalid configuration.
fn validate_config() -> anyhow::Result<config::jwt::JwtConfig> {
    let jwt_config = config::jwt::JwtConfig::from_env()?;

    if env::var("DATABASE_URL").is_err() {
        return Err(anyhow::anyhow!(
            "DATABASE_URL environment variable must be set"
        ));
    }

    Ok(jwt_config)
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

fn create_app() -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service and database status", body = serde_json::Value)
    )
)]
async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let db_ok = db
        .query_one(Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    let status = if db_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "promptmart",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
