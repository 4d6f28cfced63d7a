//! Repositories wrapping entity queries.
//!
//! Methods taking a `conn` argument run on whatever connection they are
//! given, so services can compose them inside one transaction obtained from
//! `begin()`. The rest run on the pooled connection.

use reelvote_common::AppError;
use sea_orm::{DbErr, SqlErr};

pub mod ballot;
pub mod change_log;
pub mod event_entry;
pub mod voting_event;

pub use ballot::BallotRepository;
pub use change_log::ChangeLogRepository;
pub use event_entry::EventEntryRepository;
pub use voting_event::{ListEventsQuery, VotingEventRepository};

/// Map a database error, surfacing unique-key violations as conflicts.
pub(crate) fn map_db_err(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => AppError::Conflict(detail),
        _ => AppError::Database(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_db_error_maps_to_database() {
        let err = map_db_err(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, AppError::Database(_)));
    }
}
