//! Event entry repository.

use std::sync::Arc;

use chrono::Utc;
use reelvote_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

use super::map_db_err;
use crate::entities::{EventEntry, event_entry};

/// Repository for movies attached to voting events.
#[derive(Clone)]
pub struct EventEntryRepository {
    db: Arc<DatabaseConnection>,
}

impl EventEntryRepository {
    /// Create a new event entry repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the entry for a movie on an event, removed or not.
    pub async fn find_by_event_and_movie<C: ConnectionTrait>(
        &self,
        conn: &C,
        event_id: &str,
        movie_id: &str,
    ) -> AppResult<Option<event_entry::Model>> {
        EventEntry::find()
            .filter(event_entry::Column::EventId.eq(event_id))
            .filter(event_entry::Column::MovieId.eq(movie_id))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// List entries of an event in the order they were added.
    pub async fn list_by_event(
        &self,
        event_id: &str,
        include_removed: bool,
    ) -> AppResult<Vec<event_entry::Model>> {
        let mut select = EventEntry::find().filter(event_entry::Column::EventId.eq(event_id));
        if !include_removed {
            select = select.filter(event_entry::Column::RemovedAt.is_null());
        }

        select
            .order_by_asc(event_entry::Column::CreatedAt)
            .order_by_asc(event_entry::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// List non-removed entries of an event on the given connection.
    pub async fn list_active_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        event_id: &str,
    ) -> AppResult<Vec<event_entry::Model>> {
        EventEntry::find()
            .filter(event_entry::Column::EventId.eq(event_id))
            .filter(event_entry::Column::RemovedAt.is_null())
            .order_by_asc(event_entry::Column::CreatedAt)
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// List non-removed entries of several events.
    pub async fn list_active_by_events(
        &self,
        event_ids: &[String],
    ) -> AppResult<Vec<event_entry::Model>> {
        if event_ids.is_empty() {
            return Ok(vec![]);
        }

        EventEntry::find()
            .filter(event_entry::Column::EventId.is_in(event_ids.iter().cloned()))
            .filter(event_entry::Column::RemovedAt.is_null())
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Count non-removed entries of an event on the given connection.
    pub async fn count_active_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        event_id: &str,
    ) -> AppResult<u64> {
        EventEntry::find()
            .filter(event_entry::Column::EventId.eq(event_id))
            .filter(event_entry::Column::RemovedAt.is_null())
            .count(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a new entry.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: event_entry::ActiveModel,
    ) -> AppResult<event_entry::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Bring a removed entry back.
    pub async fn restore<C: ConnectionTrait>(
        &self,
        conn: &C,
        entry: event_entry::Model,
    ) -> AppResult<event_entry::Model> {
        let mut active: event_entry::ActiveModel = entry.into();
        active.removed_at = Set(None);
        active.update(conn).await.map_err(map_db_err)
    }

    /// Soft-delete an entry.
    pub async fn mark_removed<C: ConnectionTrait>(
        &self,
        conn: &C,
        entry: event_entry::Model,
    ) -> AppResult<event_entry::Model> {
        let mut active: event_entry::ActiveModel = entry.into();
        active.removed_at = Set(Some(Utc::now().into()));
        active.update(conn).await.map_err(map_db_err)
    }

    /// Delete an entry permanently.
    pub async fn delete<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<()> {
        EventEntry::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}
