//! Voting event repository.

use std::sync::Arc;

use reelvote_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

use super::map_db_err;
use crate::entities::voting_event::{EventKind, EventState};
use crate::entities::{VotingEvent, voting_event};

/// Filters for listing events.
#[derive(Debug, Clone, Default)]
pub struct ListEventsQuery {
    /// Only events of this kind.
    pub kind: Option<EventKind>,
    /// Only events in this state.
    pub state: Option<EventState>,
    /// Include archived events.
    pub include_archived: bool,
    /// Page size; `None` returns every match.
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Voting event repository for database operations.
#[derive(Clone)]
pub struct VotingEventRepository {
    db: Arc<DatabaseConnection>,
}

impl VotingEventRepository {
    /// Create a new voting event repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get reference to the database connection.
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Start a transaction on the pooled connection.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db.begin().await.map_err(map_db_err)
    }

    /// Find an event by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<voting_event::Model>> {
        VotingEvent::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Get an event by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<voting_event::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Voting event not found: {id}")))
    }

    /// Load an event and hold a row lock on it until `conn` commits.
    pub async fn lock_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<voting_event::Model> {
        VotingEvent::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("Voting event not found: {id}")))
    }

    /// Load an event with a shared lock, blocking state changes until
    /// `conn` commits while letting other readers through.
    pub async fn share_lock_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<voting_event::Model> {
        VotingEvent::find_by_id(id)
            .lock_shared()
            .one(conn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("Voting event not found: {id}")))
    }

    /// Find the survey that is currently live, if any.
    pub async fn find_live_survey(&self) -> AppResult<Option<voting_event::Model>> {
        VotingEvent::find()
            .filter(voting_event::Column::Kind.eq(EventKind::Survey))
            .filter(voting_event::Column::State.eq(EventState::Live))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Lock the live survey other than `excluding_id`, if one exists.
    pub async fn lock_other_live_survey<C: ConnectionTrait>(
        &self,
        conn: &C,
        excluding_id: &str,
    ) -> AppResult<Option<voting_event::Model>> {
        VotingEvent::find()
            .filter(voting_event::Column::Kind.eq(EventKind::Survey))
            .filter(voting_event::Column::State.eq(EventState::Live))
            .filter(voting_event::Column::Id.ne(excluding_id))
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// List live polls, newest first.
    pub async fn list_live_polls(&self) -> AppResult<Vec<voting_event::Model>> {
        VotingEvent::find()
            .filter(voting_event::Column::Kind.eq(EventKind::Poll))
            .filter(voting_event::Column::State.eq(EventState::Live))
            .filter(voting_event::Column::Archived.eq(false))
            .order_by_desc(voting_event::Column::LiveAt)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// List events, newest first.
    pub async fn list(&self, query: &ListEventsQuery) -> AppResult<Vec<voting_event::Model>> {
        let mut select = VotingEvent::find();

        if let Some(kind) = query.kind {
            select = select.filter(voting_event::Column::Kind.eq(kind));
        }
        if let Some(state) = query.state {
            select = select.filter(voting_event::Column::State.eq(state));
        }
        if !query.include_archived {
            select = select.filter(voting_event::Column::Archived.eq(false));
        }

        select
            .order_by_desc(voting_event::Column::CreatedAt)
            .offset(query.offset)
            .limit(query.limit)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Completed (frozen survey or closed poll), non-archived events,
    /// most recently created first.
    pub async fn find_completed(&self, limit: Option<u64>) -> AppResult<Vec<voting_event::Model>> {
        let completed = Condition::any()
            .add(
                Condition::all()
                    .add(voting_event::Column::Kind.eq(EventKind::Survey))
                    .add(voting_event::Column::State.eq(EventState::Frozen)),
            )
            .add(
                Condition::all()
                    .add(voting_event::Column::Kind.eq(EventKind::Poll))
                    .add(voting_event::Column::State.eq(EventState::Closed)),
            );

        VotingEvent::find()
            .filter(completed)
            .filter(voting_event::Column::Archived.eq(false))
            .order_by_desc(voting_event::Column::CreatedAt)
            .order_by_asc(voting_event::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Create a new event.
    pub async fn create(&self, model: voting_event::ActiveModel) -> AppResult<voting_event::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Update an event.
    pub async fn update(&self, model: voting_event::ActiveModel) -> AppResult<voting_event::Model> {
        model.update(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Update an event on the given connection.
    pub async fn update_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: voting_event::ActiveModel,
    ) -> AppResult<voting_event::Model> {
        model.update(conn).await.map_err(map_db_err)
    }

    /// Delete an event on the given connection. Entries and ballots cascade.
    pub async fn delete_in<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<()> {
        VotingEvent::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}
