use axum::response::Json;
use tracing::instrument;

use crate::auth::AuthUser;
use crate::handlers::auth::UserResponse;
use crate::schemas::ApiResponse;

/// Get the currently authenticated user
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "User fetched successfully", body = ApiResponse<UserResponse>),
        (status = 401, description = "Missing or invalid token", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(user))]
pub async fn get_current_user(AuthUser(user): AuthUser) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse {
        data: UserResponse::from(user),
        message: "User fetched successfully".to_string(),
        success: true,
    })
}
