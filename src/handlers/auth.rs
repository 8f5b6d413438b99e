use axum::{extract::State, http::StatusCode, response::Json};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use model::entities::user;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, Set, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{hash_password, sign_access_token, verify_password};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for registering a new user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Request body for logging in
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// User response model. The password hash never leaves the server.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            created_at: model.created_at,
        }
    }
}

/// Login response: the user plus a bearer token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
enum RegisterError {
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Database(DbErr),
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(request))]
pub async fn register(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), (StatusCode, Json<ErrorResponse>)> {
    let email = request.email.trim().to_lowercase();
    let name = request.name.trim().to_string();
    debug!("Registering user with email: {}", email);

    let password_hash = hash_password(&request.password).map_err(|e| {
        error!("Failed to hash password: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to register user".to_string(),
                code: "INTERNAL_SERVER_ERROR".to_string(),
                success: false,
            }),
        )
    })?;

    let now = Utc::now();

    // Duplicate check and insert run in one transaction; the unique index on
    // email backstops races between concurrent registrations.
    let result = state
        .db
        .transaction::<_, user::Model, RegisterError>(move |txn| {
            Box::pin(async move {
                let existing = user::Entity::find()
                    .filter(user::Column::Email.eq(email.clone()))
                    .one(txn)
                    .await
                    .map_err(RegisterError::Database)?;
                if existing.is_some() {
                    return Err(RegisterError::EmailTaken);
                }

                user::ActiveModel {
                    name: Set(name),
                    email: Set(email),
                    password_hash: Set(password_hash),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(RegisterError::Database)
            })
        })
        .await;

    match result {
        Ok(user_model) => {
            info!("User registered successfully with ID: {}", user_model.id);
            let response = ApiResponse {
                data: UserResponse::from(user_model),
                message: "User registered successfully".to_string(),
                success: true,
            };
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(TransactionError::Transaction(RegisterError::EmailTaken)) => {
            warn!("Registration rejected: email already registered");
            Err((
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: "A user with this email already exists".to_string(),
                    code: "AUTH_EMAIL_ALREADY_EXISTS".to_string(),
                    success: false,
                }),
            ))
        }
        Err(e) => {
            error!("Failed to register user: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to register user".to_string(),
                    code: "DATABASE_ERROR".to_string(),
                    success: false,
                }),
            ))
        }
    }
}

/// Log in and receive an access token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "User logged in successfully", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(request))]
pub async fn login(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<LoginRequest>>,
) -> Result<Json<ApiResponse<LoginResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let email = request.email.trim().to_lowercase();
    debug!("Login attempt for email: {}", email);

    let invalid_credentials = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Invalid email or password".to_string(),
                code: "ACCESS_UNAUTHORIZED".to_string(),
                success: false,
            }),
        )
    };

    let user_model = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(&state.db)
        .await
        .map_err(|e| {
            error!("Database error during login: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to log in".to_string(),
                    code: "DATABASE_ERROR".to_string(),
                    success: false,
                }),
            )
        })?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&request.password, &user_model.password_hash) {
        warn!("Failed login attempt for user {}", user_model.id);
        return Err(invalid_credentials());
    }

    let issued = sign_access_token(&state.auth, user_model.id).map_err(|e| {
        error!("Failed to sign access token: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to log in".to_string(),
                code: "INTERNAL_SERVER_ERROR".to_string(),
                success: false,
            }),
        )
    })?;

    info!("User {} logged in", user_model.id);
    let response = ApiResponse {
        data: LoginResponse {
            user: UserResponse::from(user_model),
            access_token: issued.token,
            expires_at: issued.expires_at,
        },
        message: "User logged in successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}
