use crate::config::rate_limit::{RateLimitConfig, RateLimitRule, RouteGroup};
use crate::handlers;
use crate::middleware::auth::auth_middleware;
use axum::{middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes() -> Router {
    Router::new().nest("/api/v1", api_routes())
}

fn api_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    let auth = auth_routes(&rate_limit_config);
    let public_read = public_read_routes(&rate_limit_config);
    let protected =
        protected_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));
    let admin = admin_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));

    auth.merge(public_read).merge(protected).merge(admin)
}

/// Register, login, token refresh.
fn auth_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/auth/register", routing::post(handlers::auth::register))
        .route("/auth/login", routing::post(handlers::auth::login))
        .route(
            "/auth/refresh",
            routing::post(handlers::auth::refresh_token),
        );

    with_optional_rate_limit(router, config, RouteGroup::Auth)
}

/// Anonymous reads.
fn public_read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Prompts
        .route("/prompts", routing::get(handlers::prompt::list_prompts))
        .route("/prompts/{id}", routing::get(handlers::prompt::get_prompt))
        .route(
            "/prompts/{id}/comments",
            routing::get(handlers::comment::list_comments),
        )
        // Categories
        .route(
            "/categories",
            routing::get(handlers::category::list_categories),
        )
        .route(
            "/categories/{slug}",
            routing::get(handlers::category::get_category),
        )
        // Users
        .route("/users/{id}", routing::get(handlers::user::get_user_profile))
        .route(
            "/users/{id}/prompts",
            routing::get(handlers::user::list_user_prompts),
        );

    with_optional_rate_limit(router, config, RouteGroup::PublicRead)
}

/// Signed-in user actions.
fn protected_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/auth/me", routing::get(handlers::auth::get_current_user))
        // Prompts
        .route("/prompts", routing::post(handlers::prompt::create_prompt))
        .route(
            "/prompts/{id}",
            routing::put(handlers::prompt::update_prompt).delete(handlers::prompt::delete_prompt),
        )
        // Likes
        .route(
            "/prompts/{id}/like",
            routing::get(handlers::like::get_like_state).post(handlers::like::toggle_like),
        )
        // Comments
        .route(
            "/comments",
            routing::post(handlers::comment::create_comment),
        )
        .route(
            "/comments/{id}",
            routing::delete(handlers::comment::delete_comment),
        )
        .route(
            "/comments/{id}/report",
            routing::post(handlers::comment::report_comment),
        )
        // Current user
        .route("/me/likes", routing::get(handlers::me::list_my_likes))
        .route("/me/prompts", routing::get(handlers::me::list_my_prompts))
        .route(
            "/me/prompts/{id}",
            routing::delete(handlers::me::delete_my_prompt),
        );

    with_optional_rate_limit(router, config, RouteGroup::Protected)
}

/// Back-office. Each handler checks its own permission.
fn admin_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/admin/stats", routing::get(handlers::admin::get_stats))
        // Prompts
        .route(
            "/admin/prompts",
            routing::get(handlers::admin::list_prompts)
                .delete(handlers::admin::batch_delete_prompts),
        )
        .route(
            "/admin/prompts/pending-count",
            routing::get(handlers::admin::pending_count),
        )
        .route(
            "/admin/prompts/review",
            routing::put(handlers::admin::batch_review),
        )
        .route(
            "/admin/prompts/{id}",
            routing::delete(handlers::admin::delete_prompt),
        )
        .route(
            "/admin/prompts/{id}/review",
            routing::put(handlers::admin::review_prompt),
        )
        // Comments
        .route(
            "/admin/comments",
            routing::get(handlers::admin::list_comments),
        )
        .route(
            "/admin/comments/{id}",
            routing::delete(handlers::admin::delete_comment),
        )
        .route(
            "/admin/comments/{id}/status",
            routing::put(handlers::admin::set_comment_status),
        )
        // Users
        .route(
            "/admin/users",
            routing::get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
        .route(
            "/admin/users/{id}",
            routing::delete(handlers::admin::delete_user),
        )
        .route(
            "/admin/users/{id}/role",
            routing::put(handlers::admin::update_user_role),
        )
        .route(
            "/admin/users/{id}/permissions",
            routing::put(handlers::admin::update_user_permissions),
        )
        // Categories
        .route(
            "/admin/categories",
            routing::post(handlers::category::create_category),
        )
        .route(
            "/admin/categories/{id}",
            routing::put(handlers::category::update_category)
                .delete(handlers::category::delete_category),
        )
        // Audit log
        .route("/admin/logs", routing::get(handlers::admin::list_logs));

    with_optional_rate_limit(router, config, RouteGroup::Admin)
}

fn with_optional_rate_limit(
    router: Router,
    config: &RateLimitConfig,
    group: RouteGroup,
) -> Router {
    if !config.enabled {
        return router;
    }

    let rule: RateLimitRule = config.rule(group);
    let Some(governor_conf) = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
    else {
        tracing::warn!(?group, "Invalid rate limit rule {:?}, limiter disabled", rule);
        return router;
    };

    router.layer(GovernorLayer::new(governor_conf))
}
