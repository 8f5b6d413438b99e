//! Identifies the recurrence templates whose next scheduled date has arrived.

use chrono::{DateTime, Utc};
use model::entities::transaction;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};

/// Templates fetched per round-trip while walking the due set.
pub const DEFAULT_BATCH_SIZE: u64 = 100;

/// Selects all recurrence templates due at `now`.
///
/// Non-recurring rows are never selected, whatever their date fields hold.
pub fn due_templates(now: DateTime<Utc>) -> Select<transaction::Entity> {
    transaction::Entity::find()
        .filter(transaction::Column::IsRecurring.eq(true))
        .filter(transaction::Column::NextRecurringDate.lte(now))
}

/// A lazy walk over the due set, restarted fresh on every invocation.
///
/// `now` is captured once at construction and held constant for the whole
/// scan, so templates that become due mid-scan are left for the next run.
/// Batches are fetched keyset-style (`id > last seen`, ordered by id) rather
/// than by offset: rows that leave the due set as they are processed cannot
/// shift later pages underneath the scan, and no read cursor or collection
/// lock is held between batches.
#[derive(Debug)]
pub struct DueTemplateScan {
    now: DateTime<Utc>,
    last_id: i32,
    batch_size: u64,
    exhausted: bool,
}

impl DueTemplateScan {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_batch_size(now, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(now: DateTime<Utc>, batch_size: u64) -> Self {
        Self {
            now,
            last_id: 0,
            batch_size: batch_size.max(1),
            exhausted: false,
        }
    }

    /// The instant this scan considers "now".
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Fetches the next batch of due templates. Returns an empty vector once
    /// the due set is exhausted.
    pub async fn next_batch<C: ConnectionTrait>(
        &mut self,
        db: &C,
    ) -> Result<Vec<transaction::Model>, DbErr> {
        if self.exhausted {
            return Ok(Vec::new());
        }

        let batch = due_templates(self.now)
            .filter(transaction::Column::Id.gt(self.last_id))
            .order_by_asc(transaction::Column::Id)
            .limit(self.batch_size)
            .all(db)
            .await?;

        if (batch.len() as u64) < self.batch_size {
            self.exhausted = true;
        }
        if let Some(last) = batch.last() {
            self.last_id = last.id;
        }

        Ok(batch)
    }
}
