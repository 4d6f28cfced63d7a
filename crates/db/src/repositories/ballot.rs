//! Ballot repository.

use std::sync::Arc;

use reelvote_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    TryInsertResult, sea_query::OnConflict,
};

use super::map_db_err;
use crate::entities::{Ballot, ballot};

/// Ballot repository for database operations.
#[derive(Clone)]
pub struct BallotRepository {
    db: Arc<DatabaseConnection>,
}

impl BallotRepository {
    /// Create a new ballot repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Start a transaction on the pooled connection.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db.begin().await.map_err(map_db_err)
    }

    /// Find a participant's ballot for an event.
    pub async fn find_by_event_and_participant(
        &self,
        event_id: &str,
        participant_id: &str,
    ) -> AppResult<Option<ballot::Model>> {
        Ballot::find()
            .filter(ballot::Column::EventId.eq(event_id))
            .filter(ballot::Column::ParticipantId.eq(participant_id))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Load a participant's ballot and lock the row until `conn` commits.
    pub async fn lock_by_event_and_participant<C: ConnectionTrait>(
        &self,
        conn: &C,
        event_id: &str,
        participant_id: &str,
    ) -> AppResult<Option<ballot::Model>> {
        Ballot::find()
            .filter(ballot::Column::EventId.eq(event_id))
            .filter(ballot::Column::ParticipantId.eq(participant_id))
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Lock every ballot of an event until `conn` commits.
    pub async fn lock_all_by_event<C: ConnectionTrait>(
        &self,
        conn: &C,
        event_id: &str,
    ) -> AppResult<Vec<ballot::Model>> {
        Ballot::find()
            .filter(ballot::Column::EventId.eq(event_id))
            .order_by_asc(ballot::Column::Id)
            .lock_exclusive()
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// List ballots of an event, oldest first.
    pub async fn list_by_event(
        &self,
        event_id: &str,
        include_disabled: bool,
    ) -> AppResult<Vec<ballot::Model>> {
        let mut select = Ballot::find().filter(ballot::Column::EventId.eq(event_id));
        if !include_disabled {
            select = select.filter(ballot::Column::Disabled.eq(false));
        }

        select
            .order_by_asc(ballot::Column::CreatedAt)
            .order_by_asc(ballot::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// List enabled ballots of several events.
    pub async fn list_enabled_by_events(
        &self,
        event_ids: &[String],
    ) -> AppResult<Vec<ballot::Model>> {
        if event_ids.is_empty() {
            return Ok(vec![]);
        }

        Ballot::find()
            .filter(ballot::Column::EventId.is_in(event_ids.iter().cloned()))
            .filter(ballot::Column::Disabled.eq(false))
            .order_by_asc(ballot::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Count ballots of an event on the given connection.
    pub async fn count_by_event<C: ConnectionTrait>(
        &self,
        conn: &C,
        event_id: &str,
    ) -> AppResult<u64> {
        Ballot::find()
            .filter(ballot::Column::EventId.eq(event_id))
            .count(conn)
            .await
            .map_err(map_db_err)
    }

    /// Insert a ballot unless the participant already has one for the
    /// event. Returns `None` when the unique `(event_id, participant_id)`
    /// key was taken by a concurrent insert; the caller then locks and
    /// updates that row instead.
    pub async fn insert_if_absent<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: ballot::ActiveModel,
    ) -> AppResult<Option<ballot::Model>> {
        let result = Ballot::insert(model)
            .on_conflict(
                OnConflict::columns([ballot::Column::EventId, ballot::Column::ParticipantId])
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec_with_returning(conn)
            .await;

        match result {
            Ok(TryInsertResult::Inserted(model)) => Ok(Some(model)),
            Ok(TryInsertResult::Conflicted | TryInsertResult::Empty) => Ok(None),
            // RETURNING yields no row when DO NOTHING skipped the insert.
            Err(DbErr::RecordNotFound(_) | DbErr::RecordNotInserted) => Ok(None),
            Err(e) => Err(map_db_err(e)),
        }
    }

    /// Update a ballot on the given connection.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: ballot::ActiveModel,
    ) -> AppResult<ballot::Model> {
        model.update(conn).await.map_err(map_db_err)
    }
}
