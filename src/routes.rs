// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{exam_session, results},
    state::AppState,
    utils::jwt::{auth_middleware, caller_middleware},
};

/// Assembles the main application router.
///
/// * Exam sessions resolve the caller optionally; anonymous attempts are allowed.
/// * Personal results require a valid token.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let session_routes = Router::new()
        .route("/", post(exam_session::create_session))
        .route(
            "/{id}",
            get(exam_session::get_session).delete(exam_session::exit_session),
        )
        .route("/{id}/type", post(exam_session::select_type))
        .route("/{id}/exam", post(exam_session::select_exam))
        .route("/{id}/option", put(exam_session::select_option))
        .route("/{id}/written", put(exam_session::write_answer))
        .route("/{id}/confirm", post(exam_session::confirm))
        .route("/{id}/back", post(exam_session::back))
        .route("/{id}/reset", post(exam_session::reset))
        .route("/{id}/save", post(exam_session::save_result))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            caller_middleware,
        ));

    let result_routes = Router::new()
        .route("/me", get(results::my_results))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/sessions", session_routes)
        .nest("/api/results", result_routes)
        .route("/api/leaderboard", get(results::get_leaderboard))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
