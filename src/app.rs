use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/auth", get(handlers::auth_page))
        .route("/auth/login", post(handlers::login))
        .route("/auth/register", post(handlers::register))
        .route("/logout", post(handlers::logout))
        .route("/dashboard", get(handlers::dashboard))
        .route("/habits", post(handlers::save_habit))
        .route("/habits/sync", post(handlers::sync_habits))
        .route("/habits/:id/toggle", post(handlers::toggle_habit))
        .route("/habits/:id/delete", post(handlers::delete_habit))
        .route("/habits/:id/edit", get(handlers::edit_habit_page))
        .route("/settings", post(handlers::save_settings))
        .route(
            "/notifications/read-all",
            post(handlers::mark_all_notifications_read),
        )
        .route("/notifications/sync", post(handlers::sync_notifications))
        .route(
            "/notifications/:id/read",
            post(handlers::mark_notification_read),
        )
        .route(
            "/notifications/:id/delete",
            post(handlers::delete_notification),
        )
        .route("/api/habits", get(handlers::api_habits))
        .route("/api/stats", get(handlers::api_stats))
        .route("/api/notifications", get(handlers::api_notifications))
        .with_state(state)
}
