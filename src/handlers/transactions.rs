use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use common::{Paginated, Pagination, RecurringStatusFilter, TransactionFilter, TransactionKindFilter};
use jobs::occurrence::seed_next_recurring_date;
use model::entities::transaction;
use model::entities::transaction::{PaymentMethod, RecurringInterval, TransactionKind};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::auth::AuthUser;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for creating a new transaction
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateTransactionRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    /// INCOME or EXPENSE
    #[serde(rename = "type")]
    pub kind: String,
    /// Positive amount, minimum 0.01
    #[validate(custom(function = "validate_amount"))]
    pub amount: Decimal,
    /// Defaults to "Other" when omitted
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: Option<String>,
    pub description: Option<String>,
    /// CASH | BANK_TRANSFER | MOBILE_PAYMENT | CARD | AUTO_DEBIT | OTHER (default CASH)
    pub payment_method: Option<String>,
    pub receipt_url: Option<String>,
    /// When the money moved; for recurring transactions, the schedule anchor
    pub date: DateTime<Utc>,
    /// Marks this row as a recurrence template
    #[serde(default)]
    pub is_recurring: bool,
    /// DAILY | WEEKLY | MONTHLY | YEARLY; required when is_recurring is set
    pub recurring_interval: Option<String>,
}

/// Request body for updating a transaction.
///
/// Every field is optional: an absent field is left unchanged, a present
/// field is set verbatim (an empty-string description and any amount of at
/// least 0.01 are settable values, not "absent").
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateTransactionRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: Option<String>,
    /// INCOME or EXPENSE
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Positive amount, minimum 0.01
    #[validate(custom(function = "validate_amount"))]
    pub amount: Option<Decimal>,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: Option<String>,
    pub description: Option<String>,
    pub payment_method: Option<String>,
    pub receipt_url: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub is_recurring: Option<bool>,
    pub recurring_interval: Option<String>,
}

/// Transaction response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: Decimal,
    pub category: String,
    pub description: Option<String>,
    pub payment_method: String,
    pub receipt_url: Option<String>,
    pub date: DateTime<Utc>,
    pub is_recurring: bool,
    pub recurring_interval: Option<String>,
    pub next_recurring_date: Option<DateTime<Utc>>,
    pub last_processed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<transaction::Model> for TransactionResponse {
    fn from(model: transaction::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            kind: model.kind.to_value(),
            amount: model.amount,
            category: model.category,
            description: model.description,
            payment_method: model.payment_method.to_value(),
            receipt_url: model.receipt_url,
            date: model.date,
            is_recurring: model.is_recurring,
            recurring_interval: model.recurring_interval.map(|i| i.to_value()),
            next_recurring_date: model.next_recurring_date,
            last_processed: model.last_processed,
            created_at: model.created_at,
        }
    }
}

/// Query parameters for listing transactions
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct TransactionListQuery {
    /// Substring match against title and category
    pub keyword: Option<String>,
    /// Filter by transaction type (INCOME or EXPENSE)
    #[serde(rename = "type")]
    pub kind: Option<TransactionKindFilter>,
    /// RECURRING or NON_RECURRING
    pub recurring_status: Option<RecurringStatusFilter>,
    /// Page size (default: 20, max: 100)
    pub page_size: Option<u64>,
    /// 1-based page number (default: 1)
    pub page_number: Option<u64>,
}

/// Request body for deleting several transactions at once
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct BulkDeleteRequest {
    #[validate(length(min = 1, message = "At least one transaction id is required"))]
    pub transaction_ids: Vec<i32>,
}

/// Result of a bulk delete
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkDeleteResponse {
    /// Rows actually removed; ids that were missing or owned by another
    /// user are silently skipped
    pub deleted_count: u64,
}

fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::new(1, 2) {
        return Err(ValidationError::new("amount_below_minimum"));
    }
    Ok(())
}

fn parse_transaction_kind(raw: &str) -> Result<TransactionKind, String> {
    match raw {
        "INCOME" => Ok(TransactionKind::Income),
        "EXPENSE" => Ok(TransactionKind::Expense),
        _ => Err(format!("Transaction type must be INCOME or EXPENSE, got: {raw}")),
    }
}

fn parse_payment_method(raw: &str) -> Result<PaymentMethod, String> {
    match raw {
        "CASH" => Ok(PaymentMethod::Cash),
        "BANK_TRANSFER" => Ok(PaymentMethod::BankTransfer),
        "MOBILE_PAYMENT" => Ok(PaymentMethod::MobilePayment),
        "CARD" => Ok(PaymentMethod::Card),
        "AUTO_DEBIT" => Ok(PaymentMethod::AutoDebit),
        "OTHER" => Ok(PaymentMethod::Other),
        _ => Err(format!("Invalid payment method: {raw}")),
    }
}

fn parse_recurring_interval(raw: &str) -> Result<RecurringInterval, String> {
    match raw {
        "DAILY" => Ok(RecurringInterval::Daily),
        "WEEKLY" => Ok(RecurringInterval::Weekly),
        "MONTHLY" => Ok(RecurringInterval::Monthly),
        "YEARLY" => Ok(RecurringInterval::Yearly),
        _ => Err(format!("Invalid recurring interval: {raw}")),
    }
}

fn bad_request(message: String) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message,
            code: "VALIDATION_ERROR".to_string(),
            success: false,
        }),
    )
}

fn not_found(transaction_id: i32) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Transaction with id {transaction_id} does not exist"),
            code: "RESOURCE_NOT_FOUND".to_string(),
            success: false,
        }),
    )
}

fn db_error(e: DbErr) -> (StatusCode, Json<ErrorResponse>) {
    error!("Database error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Database operation failed".to_string(),
            code: "DATABASE_ERROR".to_string(),
            success: false,
        }),
    )
}

/// Fetches a transaction and enforces ownership: rows belonging to another
/// user are indistinguishable from missing rows.
async fn find_owned(
    state: &AppState,
    user_id: i32,
    transaction_id: i32,
) -> Result<transaction::Model, (StatusCode, Json<ErrorResponse>)> {
    transaction::Entity::find_by_id(transaction_id)
        .filter(transaction::Column::UserId.eq(user_id))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found(transaction_id))
}

/// Create a new transaction
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    tag = "transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction created successfully", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(user))]
pub async fn create_transaction(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateTransactionRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), (StatusCode, Json<ErrorResponse>)>
{
    debug!("Creating transaction '{}' for user {}", request.title, user.id);

    let kind = parse_transaction_kind(&request.kind).map_err(bad_request)?;
    let payment_method = match request.payment_method.as_deref() {
        Some(raw) => parse_payment_method(raw).map_err(bad_request)?,
        None => PaymentMethod::Cash,
    };

    let now = Utc::now();

    // A recurring row must carry an interval; an interval on a non-recurring
    // row is dropped rather than stored half-configured.
    let recurring_interval = if request.is_recurring {
        let raw = request.recurring_interval.as_deref().ok_or_else(|| {
            bad_request("Recurring transactions require a recurring interval".to_string())
        })?;
        Some(parse_recurring_interval(raw).map_err(bad_request)?)
    } else {
        None
    };
    let next_recurring_date =
        recurring_interval.map(|interval| seed_next_recurring_date(request.date, interval, now));

    let new_transaction = transaction::ActiveModel {
        user_id: Set(user.id),
        title: Set(request.title.clone()),
        kind: Set(kind),
        amount: Set(request.amount),
        category: Set(request.category.clone().unwrap_or_else(|| "Other".to_string())),
        description: Set(request.description.clone()),
        payment_method: Set(payment_method),
        receipt_url: Set(request.receipt_url.clone()),
        date: Set(request.date),
        is_recurring: Set(request.is_recurring),
        recurring_interval: Set(recurring_interval),
        next_recurring_date: Set(next_recurring_date),
        last_processed: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match new_transaction.insert(&state.db).await {
        Ok(transaction_model) => {
            info!(
                "Transaction created successfully with ID: {} for user {}",
                transaction_model.id, user.id
            );
            let response = ApiResponse {
                data: TransactionResponse::from(transaction_model),
                message: "Transaction created successfully".to_string(),
                success: true,
            };
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(e) => Err(db_error(e)),
    }
}

/// Get all transactions owned by the current user
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    tag = "transactions",
    params(TransactionListQuery),
    responses(
        (status = 200, description = "Transactions fetched successfully", body = ApiResponse<common::Paginated<TransactionResponse>>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(user))]
pub async fn get_transactions(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<ApiResponse<Paginated<TransactionResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let filter = TransactionFilter {
        keyword: query.keyword,
        kind: query.kind,
        recurring_status: query.recurring_status,
    };
    let pagination = Pagination::new(query.page_size, query.page_number);
    debug!(
        "Listing transactions for user {} with filter {:?}",
        user.id, filter
    );

    let mut select = transaction::Entity::find()
        .filter(transaction::Column::UserId.eq(user.id));

    if let Some(keyword) = filter.keyword.as_deref() {
        select = select.filter(
            Condition::any()
                .add(transaction::Column::Title.contains(keyword))
                .add(transaction::Column::Category.contains(keyword)),
        );
    }
    if let Some(kind) = filter.kind {
        let kind = match kind {
            TransactionKindFilter::Income => TransactionKind::Income,
            TransactionKindFilter::Expense => TransactionKind::Expense,
        };
        select = select.filter(transaction::Column::Kind.eq(kind));
    }
    match filter.recurring_status {
        Some(RecurringStatusFilter::Recurring) => {
            select = select.filter(transaction::Column::IsRecurring.eq(true));
        }
        Some(RecurringStatusFilter::NonRecurring) => {
            select = select.filter(transaction::Column::IsRecurring.eq(false));
        }
        None => {}
    }

    let paginator = select
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .paginate(&state.db, pagination.page_size);

    let totals = paginator.num_items_and_pages().await.map_err(db_error)?;
    let items = paginator
        .fetch_page(pagination.page_index())
        .await
        .map_err(db_error)?;

    let page = Paginated::new(
        items.into_iter().map(TransactionResponse::from).collect(),
        pagination,
        totals.number_of_items,
        totals.number_of_pages,
    );

    Ok(Json(ApiResponse {
        data: page,
        message: "Transactions fetched successfully".to_string(),
        success: true,
    }))
}

/// Get a single transaction by id
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(("transaction_id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction fetched successfully", body = ApiResponse<TransactionResponse>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(user))]
pub async fn get_transaction(
    AuthUser(user): AuthUser,
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TransactionResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let transaction_model = find_owned(&state, user.id, transaction_id).await?;

    Ok(Json(ApiResponse {
        data: TransactionResponse::from(transaction_model),
        message: "Transaction fetched successfully".to_string(),
        success: true,
    }))
}

/// Update a transaction
#[utoipa::path(
    put,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(("transaction_id" = i32, Path, description = "Transaction ID")),
    request_body = UpdateTransactionRequest,
    responses(
        (status = 200, description = "Transaction updated successfully", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(user))]
pub async fn update_transaction(
    AuthUser(user): AuthUser,
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateTransactionRequest>>,
) -> Result<Json<ApiResponse<TransactionResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let existing = find_owned(&state, user.id, transaction_id).await?;
    let now = Utc::now();

    // Resolve the recurrence state the row will end up in before touching
    // the active model, so the invariant (recurring iff interval present)
    // holds whatever combination of fields the patch carries.
    let target_recurring = request.is_recurring.unwrap_or(existing.is_recurring);
    let requested_interval = match request.recurring_interval.as_deref() {
        Some(raw) => Some(parse_recurring_interval(raw).map_err(bad_request)?),
        None => None,
    };

    let mut active: transaction::ActiveModel = existing.clone().into();

    if let Some(title) = request.title.clone() {
        active.title = Set(title);
    }
    if let Some(raw) = request.kind.as_deref() {
        active.kind = Set(parse_transaction_kind(raw).map_err(bad_request)?);
    }
    if let Some(amount) = request.amount {
        active.amount = Set(amount);
    }
    if let Some(category) = request.category.clone() {
        active.category = Set(category);
    }
    if let Some(description) = request.description.clone() {
        // An empty string is a settable value here, not "absent".
        active.description = Set(Some(description));
    }
    if let Some(raw) = request.payment_method.as_deref() {
        active.payment_method = Set(parse_payment_method(raw).map_err(bad_request)?);
    }
    if let Some(receipt_url) = request.receipt_url.clone() {
        active.receipt_url = Set(Some(receipt_url));
    }
    if let Some(date) = request.date {
        active.date = Set(date);
    }

    if target_recurring {
        let interval = requested_interval
            .or(existing.recurring_interval)
            .ok_or_else(|| {
                bad_request("Recurring transactions require a recurring interval".to_string())
            })?;
        active.is_recurring = Set(true);
        active.recurring_interval = Set(Some(interval));

        // Reseed the schedule when the recurrence configuration changed;
        // otherwise the template keeps its place in the schedule.
        let recurrence_changed = !existing.is_recurring
            || existing.recurring_interval != Some(interval)
            || request.date.is_some();
        if recurrence_changed {
            let anchor = request.date.unwrap_or(existing.date);
            active.next_recurring_date = Set(Some(seed_next_recurring_date(anchor, interval, now)));
        }
    } else {
        active.is_recurring = Set(false);
        active.recurring_interval = Set(None);
        active.next_recurring_date = Set(None);
        active.last_processed = Set(None);
    }

    active.updated_at = Set(now);

    match active.update(&state.db).await {
        Ok(updated) => {
            info!("Transaction {} updated by user {}", updated.id, user.id);
            Ok(Json(ApiResponse {
                data: TransactionResponse::from(updated),
                message: "Transaction updated successfully".to_string(),
                success: true,
            }))
        }
        Err(e) => Err(db_error(e)),
    }
}

/// Delete a transaction
#[utoipa::path(
    delete,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(("transaction_id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 204, description = "Transaction deleted successfully"),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(user))]
pub async fn delete_transaction(
    AuthUser(user): AuthUser,
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let transaction_model = find_owned(&state, user.id, transaction_id).await?;

    transaction::Entity::delete_by_id(transaction_model.id)
        .exec(&state.db)
        .await
        .map_err(db_error)?;

    info!("Transaction {} deleted by user {}", transaction_id, user.id);
    Ok(StatusCode::NO_CONTENT)
}

/// Duplicate a transaction
///
/// The copy is always an ordinary non-recurring row, even when the source is
/// a recurrence template; two templates spawning from one schedule is never
/// what a duplicate means.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/duplicate/{transaction_id}",
    tag = "transactions",
    params(("transaction_id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 201, description = "Transaction duplicated successfully", body = ApiResponse<TransactionResponse>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(user))]
pub async fn duplicate_transaction(
    AuthUser(user): AuthUser,
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), (StatusCode, Json<ErrorResponse>)>
{
    let source = find_owned(&state, user.id, transaction_id).await?;
    let now = Utc::now();

    let copy = transaction::ActiveModel {
        user_id: Set(source.user_id),
        title: Set(format!("Duplicate - {}", source.title)),
        kind: Set(source.kind),
        amount: Set(source.amount),
        category: Set(source.category.clone()),
        description: Set(source.description.clone()),
        payment_method: Set(source.payment_method),
        receipt_url: Set(source.receipt_url.clone()),
        date: Set(source.date),
        is_recurring: Set(false),
        recurring_interval: Set(None),
        next_recurring_date: Set(None),
        last_processed: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match copy.insert(&state.db).await {
        Ok(duplicated) => {
            info!(
                "Transaction {} duplicated as {} by user {}",
                transaction_id, duplicated.id, user.id
            );
            let response = ApiResponse {
                data: TransactionResponse::from(duplicated),
                message: "Transaction duplicated successfully".to_string(),
                success: true,
            };
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(e) => Err(db_error(e)),
    }
}

/// Delete several transactions at once
#[utoipa::path(
    delete,
    path = "/api/v1/transactions/bulk",
    tag = "transactions",
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Transactions deleted", body = ApiResponse<BulkDeleteResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(user))]
pub async fn bulk_delete_transactions(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<BulkDeleteRequest>>,
) -> Result<Json<ApiResponse<BulkDeleteResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let result = transaction::Entity::delete_many()
        .filter(transaction::Column::Id.is_in(request.transaction_ids.clone()))
        .filter(transaction::Column::UserId.eq(user.id))
        .exec(&state.db)
        .await
        .map_err(db_error)?;

    if result.rows_affected < request.transaction_ids.len() as u64 {
        warn!(
            "Bulk delete for user {} removed {} of {} requested rows",
            user.id,
            result.rows_affected,
            request.transaction_ids.len()
        );
    }

    Ok(Json(ApiResponse {
        data: BulkDeleteResponse {
            deleted_count: result.rows_affected,
        },
        message: "Transactions deleted successfully".to_string(),
        success: true,
    }))
}
