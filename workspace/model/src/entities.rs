//! This file serves as the root for all SeaORM entity modules.
//! The data models for the finance tracking application live here: the users
//! table and the transactions table, where recurrence templates and ordinary
//! ledger entries share one schema.

pub mod transaction;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::transaction::Entity as Transaction;
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use migration::{Migrator, MigratorTrait};
    use rust_decimal::Decimal;
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, QueryFilter, Set,
    };

    use super::transaction::{PaymentMethod, RecurringInterval, TransactionKind};
    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        // Connect to the SQLite database
        let db = Database::connect("sqlite::memory:").await?;

        // Enable foreign keys
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        // Apply migrations
        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();

        // Create users
        let user1 = user::ActiveModel {
            name: Set("Alice".to_string()),
            email: Set("alice@example.com".to_string()),
            password_hash: Set("$argon2id$stub".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let user2 = user::ActiveModel {
            name: Set("Bob".to_string()),
            email: Set("bob@example.com".to_string()),
            password_hash: Set("$argon2id$stub".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // An ordinary ledger entry for user1
        let groceries = transaction::ActiveModel {
            user_id: Set(user1.id),
            title: Set("Grocery shopping".to_string()),
            kind: Set(TransactionKind::Expense),
            amount: Set(Decimal::new(5000, 2)), // 50.00
            category: Set("Groceries".to_string()),
            description: Set(Some("Weekly grocery run".to_string())),
            payment_method: Set(PaymentMethod::Card),
            receipt_url: Set(None),
            date: Set(now),
            is_recurring: Set(false),
            recurring_interval: Set(None),
            next_recurring_date: Set(None),
            last_processed: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // A recurrence template for user1
        let rent = transaction::ActiveModel {
            user_id: Set(user1.id),
            title: Set("Rent".to_string()),
            kind: Set(TransactionKind::Expense),
            amount: Set(Decimal::new(120000, 2)), // 1200.00
            category: Set("Housing".to_string()),
            description: Set(None),
            payment_method: Set(PaymentMethod::BankTransfer),
            receipt_url: Set(None),
            date: Set(now),
            is_recurring: Set(true),
            recurring_interval: Set(Some(RecurringInterval::Monthly)),
            next_recurring_date: Set(Some(
                Utc.with_ymd_and_hms(2024, 2, 15, 12, 0, 0).unwrap(),
            )),
            last_processed: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // A ledger entry for user2
        transaction::ActiveModel {
            user_id: Set(user2.id),
            title: Set("Salary".to_string()),
            kind: Set(TransactionKind::Income),
            amount: Set(Decimal::new(300000, 2)), // 3000.00
            category: Set("Salary".to_string()),
            description: Set(None),
            payment_method: Set(PaymentMethod::BankTransfer),
            receipt_url: Set(None),
            date: Set(now),
            is_recurring: Set(false),
            recurring_interval: Set(None),
            next_recurring_date: Set(None),
            last_processed: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // Verify users
        let users = User::find().all(&db).await?;
        assert_eq!(users.len(), 2);
        assert!(users.iter().any(|u| u.email == "alice@example.com"));

        // Ownership: user1 sees only their own rows
        let user1_rows = Transaction::find()
            .filter(transaction::Column::UserId.eq(user1.id))
            .all(&db)
            .await?;
        assert_eq!(user1_rows.len(), 2);
        assert!(user1_rows.iter().all(|t| t.user_id == user1.id));

        // The enum columns round-trip through their string representations
        let reloaded = Transaction::find_by_id(groceries.id)
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(reloaded.kind, TransactionKind::Expense);
        assert_eq!(reloaded.payment_method, PaymentMethod::Card);
        assert_eq!(reloaded.amount, Decimal::new(5000, 2));

        // The recurrence columns round-trip as well
        let reloaded_rent = Transaction::find_by_id(rent.id).one(&db).await?.unwrap();
        assert!(reloaded_rent.is_recurring);
        assert_eq!(
            reloaded_rent.recurring_interval,
            Some(RecurringInterval::Monthly)
        );
        assert_eq!(
            reloaded_rent.next_recurring_date,
            Some(Utc.with_ymd_and_hms(2024, 2, 15, 12, 0, 0).unwrap())
        );

        // Recurrence templates are filterable from ledger entries
        let templates = Transaction::find()
            .filter(transaction::Column::IsRecurring.eq(true))
            .all(&db)
            .await?;
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].id, rent.id);

        // Deleting the owner cascades to their transactions
        user::Entity::delete_by_id(user1.id).exec(&db).await?;
        let remaining = Transaction::find().all(&db).await?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].user_id, user2.id);

        Ok(())
    }
}
