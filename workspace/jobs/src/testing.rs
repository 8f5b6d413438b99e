//! Shared fixtures for the job tests: an in-memory database with the real
//! schema applied, plus insert helpers for users, templates and entries.

use chrono::{DateTime, TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use model::entities::transaction::{PaymentMethod, RecurringInterval, TransactionKind};
use model::entities::{transaction, user};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    utc_hms(year, month, day, 0, 0, 0)
}

pub fn utc_hms(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
        .unwrap()
}

pub async fn insert_user(db: &DatabaseConnection, email: &str) -> user::Model {
    let now = utc(2024, 1, 1);
    user::ActiveModel {
        name: Set("Test User".to_string()),
        email: Set(email.to_string()),
        password_hash: Set("$argon2id$stub".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert user")
}

/// Inserts a recurrence template. `interval` may be `None` to simulate a row
/// whose recurrence fields predate write-time validation.
pub async fn insert_template(
    db: &DatabaseConnection,
    user_id: i32,
    title: &str,
    interval: Option<RecurringInterval>,
    next_recurring_date: Option<DateTime<Utc>>,
) -> transaction::Model {
    let now = utc(2024, 1, 1);
    transaction::ActiveModel {
        user_id: Set(user_id),
        title: Set(title.to_string()),
        kind: Set(TransactionKind::Expense),
        amount: Set(Decimal::new(4999, 2)), // 49.99
        category: Set("Bills".to_string()),
        description: Set(Some("test template".to_string())),
        payment_method: Set(PaymentMethod::AutoDebit),
        receipt_url: Set(None),
        date: Set(now),
        is_recurring: Set(true),
        recurring_interval: Set(interval),
        next_recurring_date: Set(next_recurring_date),
        last_processed: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert template")
}

/// Inserts an ordinary non-recurring ledger entry.
pub async fn insert_entry(
    db: &DatabaseConnection,
    user_id: i32,
    title: &str,
    date: DateTime<Utc>,
) -> transaction::Model {
    let now = utc(2024, 1, 1);
    transaction::ActiveModel {
        user_id: Set(user_id),
        title: Set(title.to_string()),
        kind: Set(TransactionKind::Expense),
        amount: Set(Decimal::new(1500, 2)), // 15.00
        category: Set("Other".to_string()),
        description: Set(None),
        payment_method: Set(PaymentMethod::Cash),
        receipt_url: Set(None),
        date: Set(date),
        is_recurring: Set(false),
        recurring_interval: Set(None),
        next_recurring_date: Set(None),
        last_processed: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert entry")
}
