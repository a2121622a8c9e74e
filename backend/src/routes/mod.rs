//! Route definitions for the Irrigation Uniformity Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Calculator routes (public)
        .nest("/uniformity", uniformity_routes())
        // Protected routes - evaluations
        .nest("/evaluations", evaluation_routes())
        // Protected routes - areas
        .nest("/areas", area_routes())
        // Protected routes - property overview
        .nest("/properties", property_routes())
}

/// Stateless calculator routes (public)
fn uniformity_routes() -> Router<AppState> {
    Router::new()
        .route("/flow-rate", post(handlers::calculate_flow_rate))
        .route("/coefficients", post(handlers::calculate_coefficients))
        .route("/classify/:kind/:value", get(handlers::classify_coefficient))
}

/// Evaluation routes (protected)
fn evaluation_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_evaluation))
        .route(
            "/:id",
            get(handlers::get_evaluation).delete(handlers::delete_evaluation),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Area routes (protected)
fn area_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_area))
        .route("/mine", get(handlers::list_my_areas))
        .route(
            "/:id",
            get(handlers::get_area)
                .patch(handlers::update_area)
                .delete(handlers::delete_area),
        )
        .route("/:id/evaluations", get(handlers::list_area_evaluations))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Property routes (protected)
fn property_routes() -> Router<AppState> {
    Router::new()
        .route("/:id/areas", get(handlers::list_property_areas))
        .route_layer(middleware::from_fn(auth_middleware))
}
