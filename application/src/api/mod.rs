//! HTTP API definitions.

pub mod attendance;

use axum::{
    routing::get,
    Extension, Router,
};

use crate::Service;

/// Builds the [`Router`] of the HTTP API backed by the provided [`Service`].
pub fn router(service: Service) -> Router {
    Router::new()
        .route(
            "/attendance",
            get(attendance::current)
                .post(attendance::perform)
                .patch(attendance::submit_report),
        )
        .route("/attendance/history", get(attendance::history))
        .layer(Extension(service))
}
