use axum::{
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::{handlers, request_context, state::AppState};

pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    let admin = Router::new()
        .route(
            "/articles",
            get(handlers::admin_list_articles).post(handlers::admin_create_article),
        )
        .route(
            "/articles/:id",
            get(handlers::admin_get_article)
                .put(handlers::admin_update_article)
                .delete(handlers::admin_delete_article),
        )
        .route("/articles/:id/publish", post(handlers::admin_publish_article))
        .route("/articles/:id/unpublish", post(handlers::admin_unpublish_article))
        .route("/comments/:id", delete(handlers::admin_delete_comment))
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::admin_update_settings),
        )
        .route("/users", post(handlers::admin_create_user))
        .route("/users/:id/membership", put(handlers::admin_set_membership))
        .route("/users/:id/tokens", post(handlers::admin_issue_token))
        .route_layer(middleware::from_fn(request_context::require_admin_middleware));

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/settings", get(handlers::get_settings))
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles/:slug", get(handlers::get_article))
        .route(
            "/api/comments/article/:article_id",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route("/api/comments/:id", delete(handlers::delete_own_comment))
        .nest("/api/admin", admin)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_context::resolve_viewer_middleware,
        ))
        .layer(middleware::from_fn(request_context::request_context_middleware))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            },
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
