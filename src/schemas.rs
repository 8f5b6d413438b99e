use moka::future::Cache;
use model::entities::user;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::auth::AuthConfig;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Bearer-token user lookups, keyed by user id
    pub user_cache: Cache<i32, user::Model>,
    /// Token signing/verification settings
    pub auth: AuthConfig,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::users::get_current_user,
        crate::handlers::transactions::create_transaction,
        crate::handlers::transactions::get_transactions,
        crate::handlers::transactions::get_transaction,
        crate::handlers::transactions::update_transaction,
        crate::handlers::transactions::delete_transaction,
        crate::handlers::transactions::duplicate_transaction,
        crate::handlers::transactions::bulk_delete_transactions,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::handlers::auth::UserResponse,
            crate::handlers::transactions::CreateTransactionRequest,
            crate::handlers::transactions::UpdateTransactionRequest,
            crate::handlers::transactions::TransactionResponse,
            crate::handlers::transactions::BulkDeleteRequest,
            crate::handlers::transactions::BulkDeleteResponse,
            ApiResponse<crate::handlers::auth::UserResponse>,
            ApiResponse<crate::handlers::auth::LoginResponse>,
            ApiResponse<crate::handlers::transactions::TransactionResponse>,
            ApiResponse<crate::handlers::transactions::BulkDeleteResponse>,
            common::Paginated<crate::handlers::transactions::TransactionResponse>,
            common::TransactionKindFilter,
            common::RecurringStatusFilter,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and login"),
        (name = "users", description = "Current-user endpoints"),
        (name = "transactions", description = "Transaction CRUD and recurrence templates"),
    ),
    info(
        title = "CashMind API",
        description = "Personal finance tracking backend with recurring-transaction scheduling",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
