use crate::handlers::{
    auth::{login, register},
    health::health_check,
    transactions::{
        bulk_delete_transactions, create_transaction, delete_transaction, duplicate_transaction,
        get_transaction, get_transactions, update_transaction,
    },
    users::get_current_user,
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Auth routes
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        // Current-user route
        .route("/api/v1/users/me", get(get_current_user))
        // Transaction CRUD routes
        .route("/api/v1/transactions", post(create_transaction))
        .route("/api/v1/transactions", get(get_transactions))
        .route("/api/v1/transactions/bulk", delete(bulk_delete_transactions))
        .route("/api/v1/transactions/:transaction_id", get(get_transaction))
        .route("/api/v1/transactions/:transaction_id", put(update_transaction))
        .route("/api/v1/transactions/:transaction_id", delete(delete_transaction))
        .route(
            "/api/v1/transactions/duplicate/:transaction_id",
            post(duplicate_transaction),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
