//! Route-Definitionen fuer die REST-API (/api/v1/...)

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::state::ApiState;

/// Prefix aller API-Routen
pub const API_PREFIX: &str = "/api/v1";

/// Erstellt den `/api/v1`-Router mit gesetztem State
pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .nest(API_PREFIX, v1_router())
        .with_state(state)
}

fn v1_router() -> Router<ApiState> {
    Router::new()
        // Auth
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        // Eigenes Konto
        .route(
            "/user",
            get(handlers::user::get_user)
                .put(handlers::user::update_user)
                .delete(handlers::user::delete_user),
        )
        .route("/user/sessions", get(handlers::user::list_sessions))
        // Admin
        .route("/admin/users", get(handlers::admin::list_users))
        .route(
            "/admin/users/:id",
            put(handlers::admin::update_user).delete(handlers::admin::delete_user),
        )
}
