//! Ballot change log repository. Insert and read only.

use std::sync::Arc;

use reelvote_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};

use super::map_db_err;
use crate::entities::{BallotChangeLog, ballot_change_log};

/// Repository for the append-only ballot audit trail.
#[derive(Clone)]
pub struct ChangeLogRepository {
    db: Arc<DatabaseConnection>,
}

impl ChangeLogRepository {
    /// Create a new change log repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append an entry on the given connection.
    pub async fn append<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: ballot_change_log::ActiveModel,
    ) -> AppResult<ballot_change_log::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Entries for an event, optionally for one participant, oldest first.
    pub async fn list(
        &self,
        event_id: &str,
        participant_id: Option<&str>,
    ) -> AppResult<Vec<ballot_change_log::Model>> {
        let mut select =
            BallotChangeLog::find().filter(ballot_change_log::Column::EventId.eq(event_id));
        if let Some(participant_id) = participant_id {
            select = select.filter(ballot_change_log::Column::ParticipantId.eq(participant_id));
        }

        select
            .order_by_asc(ballot_change_log::Column::CreatedAt)
            .order_by_asc(ballot_change_log::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }
}
