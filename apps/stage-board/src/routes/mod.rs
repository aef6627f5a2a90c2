pub mod health;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::board::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Sessions
        .route("/api/v1/boards", post(handlers::handle_create_board))
        .route(
            "/api/v1/boards/:id",
            get(handlers::handle_get_board).delete(handlers::handle_close_board),
        )
        .route("/api/v1/boards/:id/refresh", post(handlers::handle_refresh))
        // Drag gesture
        .route(
            "/api/v1/boards/:id/drag/start",
            post(handlers::handle_drag_start),
        )
        .route(
            "/api/v1/boards/:id/drag/move",
            post(handlers::handle_drag_move),
        )
        .route("/api/v1/boards/:id/drag/drop", post(handlers::handle_drop))
        .route(
            "/api/v1/boards/:id/drag/cancel",
            post(handlers::handle_drag_cancel),
        )
        // Confirmation
        .route(
            "/api/v1/boards/:id/confirmation",
            post(handlers::handle_submit_confirmation)
                .delete(handlers::handle_cancel_confirmation),
        )
        // Candidate cards
        .route(
            "/api/v1/boards/:id/candidates/:candidate_id",
            get(handlers::handle_show_candidate),
        )
        .route(
            "/api/v1/boards/:id/candidates/:candidate_id/schedule",
            put(handlers::handle_schedule_interview),
        )
        .route(
            "/api/v1/boards/:id/selection",
            delete(handlers::handle_close_candidate),
        )
        .with_state(state)
}
