use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::user;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum TransactionKind {
    #[sea_orm(string_value = "INCOME")]
    Income,
    #[sea_orm(string_value = "EXPENSE")]
    Expense,
}

/// How the money moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "CASH")]
    Cash,
    #[sea_orm(string_value = "BANK_TRANSFER")]
    BankTransfer,
    #[sea_orm(string_value = "MOBILE_PAYMENT")]
    MobilePayment,
    #[sea_orm(string_value = "CARD")]
    Card,
    #[sea_orm(string_value = "AUTO_DEBIT")]
    AutoDebit,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

/// How often a recurrence template spawns a new ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum RecurringInterval {
    #[sea_orm(string_value = "DAILY")]
    Daily,
    #[sea_orm(string_value = "WEEKLY")]
    Weekly,
    #[sea_orm(string_value = "MONTHLY")]
    Monthly,
    #[sea_orm(string_value = "YEARLY")]
    Yearly,
}

/// A single transaction row. Two kinds of row share this table:
///
/// - ordinary ledger entries (`is_recurring = false`), and
/// - recurrence templates (`is_recurring = true`), which are never ledger
///   entries themselves; each elapsed occurrence is materialized as a
///   separate non-recurring row while the template persists as the source.
///
/// Invariant: `is_recurring == true` iff `recurring_interval` is set, and
/// only recurring rows may carry `next_recurring_date` / `last_processed`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning user. Every read and write filters on this id.
    pub user_id: i32,
    pub title: String,
    #[sea_orm(column_name = "type")]
    pub kind: TransactionKind,
    /// Always positive (minimum 0.01); the direction is carried by `kind`.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub category: String,
    pub description: Option<String>,
    pub payment_method: PaymentMethod,
    pub receipt_url: Option<String>,
    /// When the money moved; for templates, the anchor of the schedule.
    pub date: DateTimeUtc,
    #[sea_orm(default_value = "false")]
    pub is_recurring: bool,
    pub recurring_interval: Option<RecurringInterval>,
    /// The next date this template should spawn an instance. Null iff not recurring.
    pub next_recurring_date: Option<DateTimeUtc>,
    /// When this template last spawned an instance.
    pub last_processed: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::UserId",
        to = "user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
