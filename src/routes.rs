// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{comments, threads},
    state::AppState,
    utils::jwt::identity_middleware,
};

/// Assembles the main application router.
///
/// * Merges the thread and comment sub-routers.
/// * Resolves the request's `Actor` before any handler runs.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let thread_routes = Router::new()
        .route(
            "/{kind}/{id}/comments",
            get(threads::list_comments).post(threads::create_comment),
        )
        .route("/{kind}/{id}/comments/count", get(threads::count_comments));

    let comment_routes = Router::new()
        .route(
            "/{id}",
            get(comments::get_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route("/{id}/purge", delete(comments::purge_comment))
        .route("/{id}/replies", post(comments::create_reply))
        .route(
            "/{id}/reactions",
            get(comments::list_reactions).post(comments::toggle_reaction),
        );

    Router::new()
        .nest("/api/hosts", thread_routes)
        .nest("/api/comments", comment_routes)
        .layer(middleware::from_fn_with_state(state.clone(), identity_middleware))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
