use crate::entity_iden::EntityIden;
use model::entities::prelude::*;
use model::entities::{transaction, user};
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(User::table())
                    .if_not_exists()
                    .col(pk_auto(User::column(user::Column::Id)))
                    .col(string(User::column(user::Column::Name)))
                    .col(string_uniq(User::column(user::Column::Email)))
                    .col(string(User::column(user::Column::PasswordHash)))
                    .col(timestamp_with_time_zone(User::column(
                        user::Column::CreatedAt,
                    )))
                    .col(timestamp_with_time_zone(User::column(
                        user::Column::UpdatedAt,
                    )))
                    .to_owned(),
            )
            .await?;

        // Create transactions table. Recurrence templates and ordinary
        // ledger entries share this schema.
        manager
            .create_table(
                Table::create()
                    .table(Transaction::table())
                    .if_not_exists()
                    .col(pk_auto(Transaction::column(transaction::Column::Id)))
                    .col(integer(Transaction::column(transaction::Column::UserId)))
                    .col(string(Transaction::column(transaction::Column::Title)))
                    .col(string(Transaction::column(transaction::Column::Kind)).string_len(16))
                    .col(
                        decimal(Transaction::column(transaction::Column::Amount))
                            .decimal_len(16, 4),
                    )
                    .col(string(Transaction::column(transaction::Column::Category)))
                    .col(string_null(Transaction::column(
                        transaction::Column::Description,
                    )))
                    .col(
                        string(Transaction::column(transaction::Column::PaymentMethod))
                            .string_len(16),
                    )
                    .col(string_null(Transaction::column(
                        transaction::Column::ReceiptUrl,
                    )))
                    .col(timestamp_with_time_zone(Transaction::column(
                        transaction::Column::Date,
                    )))
                    .col(
                        boolean(Transaction::column(transaction::Column::IsRecurring))
                            .default(false),
                    )
                    .col(
                        string_null(Transaction::column(
                            transaction::Column::RecurringInterval,
                        ))
                        .string_len(16),
                    )
                    .col(timestamp_with_time_zone_null(Transaction::column(
                        transaction::Column::NextRecurringDate,
                    )))
                    .col(timestamp_with_time_zone_null(Transaction::column(
                        transaction::Column::LastProcessed,
                    )))
                    .col(timestamp_with_time_zone(Transaction::column(
                        transaction::Column::CreatedAt,
                    )))
                    .col(timestamp_with_time_zone(Transaction::column(
                        transaction::Column::UpdatedAt,
                    )))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_user")
                            .from(
                                Transaction::table(),
                                Transaction::column(transaction::Column::UserId),
                            )
                            .to(User::table(), User::column(user::Column::Id))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The due-set scan filters on these two columns.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_transactions_recurring_due")
                    .table(Transaction::table())
                    .col(Transaction::column(transaction::Column::IsRecurring))
                    .col(Transaction::column(transaction::Column::NextRecurringDate))
                    .to_owned(),
            )
            .await?;

        // Listing reads one user's rows ordered by date.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_transactions_user_date")
                    .table(Transaction::table())
                    .col(Transaction::column(transaction::Column::UserId))
                    .col(Transaction::column(transaction::Column::Date))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transaction::table()).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(User::table()).to_owned())
            .await?;

        Ok(())
    }
}
