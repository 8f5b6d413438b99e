use sea_orm::DbErr;
use thiserror::Error;

/// Failure of a single template's materialization step.
///
/// All variants leave the template untouched: the insert-and-advance step is
/// transactional, so a failed template simply stays due and is retried on the
/// next scheduled scan.
#[derive(Debug, Error)]
pub enum JobError {
    /// The row claims to be recurring but its recurrence fields are
    /// malformed (no interval or no next date). The write paths reject such
    /// rows, so this only surfaces for data that bypassed validation.
    #[error("transaction {id} is not a valid recurrence template")]
    InvalidTemplate { id: i32 },

    /// The template changed under us between the scan and the advance
    /// (a concurrent user edit or a concurrent run won the race).
    #[error("template {id} changed concurrently; step rolled back")]
    StaleTemplate { id: i32 },

    /// The insert-and-advance step did not commit within the allowed window.
    #[error("template {id} did not commit within the allowed window")]
    CommitTimeout { id: i32 },

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}
