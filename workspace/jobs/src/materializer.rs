//! The atomic insert-and-advance step for one due template.

use std::time::Duration;

use chrono::{DateTime, Utc};
use model::entities::transaction;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionError, TransactionTrait,
};
use tracing::debug;

use crate::error::JobError;
use crate::occurrence::next_occurrence;

/// Upper bound on one template's insert-and-advance step. A step that cannot
/// commit within this window aborts and leaves the template unchanged.
pub const COMMIT_TIMEOUT: Duration = Duration::from_secs(20);

/// Prefix marking ledger rows spawned from a recurrence template.
pub const GENERATED_TITLE_PREFIX: &str = "Recurring - ";

/// What one successful materialization produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedOccurrence {
    pub template_id: i32,
    pub instance_id: i32,
    /// The occurrence that was realized: the template's pre-run
    /// `next_recurring_date`, not the time the job ran.
    pub occurrence_date: DateTime<Utc>,
    pub next_recurring_date: DateTime<Utc>,
}

/// Materializes one elapsed occurrence of `template`.
///
/// Within a single database transaction this inserts a non-recurring copy of
/// the template dated at the occurrence being realized, and advances the
/// template's schedule by exactly one interval. The advance is guarded by the
/// template's previous `next_recurring_date`; if a concurrent edit or run got
/// there first, the whole step rolls back and the template is left as the
/// winner wrote it.
///
/// An overdue template advances one interval per call, so it stays due and is
/// picked up again on the next scan until it has caught up.
pub async fn materialize(
    db: &DatabaseConnection,
    template: &transaction::Model,
    now: DateTime<Utc>,
) -> Result<MaterializedOccurrence, JobError> {
    let template_id = template.id;
    let interval = template
        .recurring_interval
        .ok_or(JobError::InvalidTemplate { id: template_id })?;
    let due_date = template
        .next_recurring_date
        .ok_or(JobError::InvalidTemplate { id: template_id })?;
    let advanced = next_occurrence(due_date, interval);

    let instance = transaction::ActiveModel {
        user_id: Set(template.user_id),
        title: Set(format!("{GENERATED_TITLE_PREFIX}{}", template.title)),
        kind: Set(template.kind),
        amount: Set(template.amount),
        category: Set(template.category.clone()),
        description: Set(template.description.clone()),
        payment_method: Set(template.payment_method),
        receipt_url: Set(template.receipt_url.clone()),
        date: Set(due_date),
        is_recurring: Set(false),
        recurring_interval: Set(None),
        next_recurring_date: Set(None),
        last_processed: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let step = db.transaction::<_, MaterializedOccurrence, JobError>(move |txn| {
        Box::pin(async move {
            let inserted = instance.insert(txn).await.map_err(JobError::Database)?;

            let advance = transaction::Entity::update_many()
                .col_expr(
                    transaction::Column::NextRecurringDate,
                    Expr::value(advanced),
                )
                .col_expr(transaction::Column::LastProcessed, Expr::value(now))
                .col_expr(transaction::Column::UpdatedAt, Expr::value(now))
                .filter(transaction::Column::Id.eq(template_id))
                .filter(transaction::Column::IsRecurring.eq(true))
                .filter(transaction::Column::NextRecurringDate.eq(due_date))
                .exec(txn)
                .await
                .map_err(JobError::Database)?;

            if advance.rows_affected == 0 {
                // Lost the race; rolling back also discards the insert.
                return Err(JobError::StaleTemplate { id: template_id });
            }

            Ok(MaterializedOccurrence {
                template_id,
                instance_id: inserted.id,
                occurrence_date: due_date,
                next_recurring_date: advanced,
            })
        })
    });

    match tokio::time::timeout(COMMIT_TIMEOUT, step).await {
        Ok(Ok(outcome)) => {
            debug!(
                template_id = outcome.template_id,
                instance_id = outcome.instance_id,
                "materialized occurrence dated {}",
                outcome.occurrence_date
            );
            Ok(outcome)
        }
        Ok(Err(TransactionError::Connection(e))) => Err(JobError::Database(e)),
        Ok(Err(TransactionError::Transaction(e))) => Err(e),
        Err(_) => Err(JobError::CommitTimeout { id: template_id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{insert_template, insert_user, setup_db, utc};
    use model::entities::transaction::RecurringInterval;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    #[tokio::test]
    async fn spawns_an_instance_and_advances_the_template() {
        let db = setup_db().await;
        let user = insert_user(&db, "mat1@example.com").await;

        // Daily template due 2024-01-01, processed on 2024-01-02.
        let template = insert_template(
            &db,
            user.id,
            "Gym membership",
            Some(RecurringInterval::Daily),
            Some(utc(2024, 1, 1)),
        )
        .await;

        let now = utc(2024, 1, 2);
        let outcome = materialize(&db, &template, now).await.unwrap();

        // Exactly one new non-recurring row, dated at the realized occurrence.
        let instance = transaction::Entity::find_by_id(outcome.instance_id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(instance.id, template.id);
        assert_eq!(instance.title, "Recurring - Gym membership");
        assert_eq!(instance.date, utc(2024, 1, 1));
        assert_eq!(instance.user_id, user.id);
        assert_eq!(instance.amount, template.amount);
        assert!(!instance.is_recurring);
        assert_eq!(instance.recurring_interval, None);
        assert_eq!(instance.next_recurring_date, None);
        assert_eq!(instance.last_processed, None);

        // The template advanced one interval and recorded the run.
        let advanced = transaction::Entity::find_by_id(template.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(advanced.next_recurring_date, Some(utc(2024, 1, 2)));
        assert_eq!(advanced.last_processed, Some(now));
        assert!(advanced.is_recurring);

        assert_eq!(outcome.occurrence_date, utc(2024, 1, 1));
        assert_eq!(outcome.next_recurring_date, utc(2024, 1, 2));
    }

    #[tokio::test]
    async fn stale_template_rolls_back_the_insert() {
        let db = setup_db().await;
        let user = insert_user(&db, "mat2@example.com").await;

        let template = insert_template(
            &db,
            user.id,
            "Rent",
            Some(RecurringInterval::Monthly),
            Some(utc(2024, 1, 1)),
        )
        .await;

        // A snapshot whose next_recurring_date no longer matches the stored
        // row: the advance touches zero rows after the insert has happened,
        // which must abort the step as a unit.
        let stale = transaction::Model {
            next_recurring_date: Some(utc(2023, 12, 1)),
            ..template.clone()
        };

        let err = materialize(&db, &stale, utc(2024, 1, 2)).await.unwrap_err();
        assert!(matches!(err, JobError::StaleTemplate { id } if id == template.id));

        // Neither the inserted row nor the advance is visible.
        let spawned = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(user.id))
            .filter(transaction::Column::IsRecurring.eq(false))
            .all(&db)
            .await
            .unwrap();
        assert!(spawned.is_empty(), "insert must roll back with the advance");

        let unchanged = transaction::Entity::find_by_id(template.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.next_recurring_date, Some(utc(2024, 1, 1)));
        assert_eq!(unchanged.last_processed, None);
    }

    #[tokio::test]
    async fn rejects_templates_with_missing_recurrence_fields() {
        let db = setup_db().await;
        let user = insert_user(&db, "mat3@example.com").await;

        let template = insert_template(
            &db,
            user.id,
            "Broken",
            None,
            Some(utc(2024, 1, 1)),
        )
        .await;

        let err = materialize(&db, &template, utc(2024, 1, 2)).await.unwrap_err();
        assert!(matches!(err, JobError::InvalidTemplate { id } if id == template.id));

        // Nothing was written.
        let rows = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(user.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn catch_up_is_one_interval_per_call() {
        let db = setup_db().await;
        let user = insert_user(&db, "mat4@example.com").await;

        // Three days overdue on 2024-01-04.
        let now = utc(2024, 1, 4);
        let mut template = insert_template(
            &db,
            user.id,
            "Coffee",
            Some(RecurringInterval::Daily),
            Some(utc(2024, 1, 1)),
        )
        .await;

        for day in 1..=3 {
            let outcome = materialize(&db, &template, now).await.unwrap();
            assert_eq!(outcome.occurrence_date, utc(2024, 1, day));
            template = transaction::Entity::find_by_id(template.id)
                .one(&db)
                .await
                .unwrap()
                .unwrap();
        }

        // Exactly three instances, dated at the three elapsed occurrences,
        // and the schedule has caught up to 2024-01-04.
        let instances = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(user.id))
            .filter(transaction::Column::IsRecurring.eq(false))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(instances.len(), 3);
        assert_eq!(template.next_recurring_date, Some(utc(2024, 1, 4)));
    }
}
