//! Event entry entity: a movie attached to a voting event.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event_entry")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub event_id: String,

    /// Catalog movie ID. Unique per event.
    pub movie_id: String,

    /// Movie title snapshot, used for alphabetical tie-breaks.
    pub title: String,

    /// External (TMDb) numeric ID, the final tie-break.
    pub tmdb_id: i64,

    #[sea_orm(nullable)]
    pub poster_path: Option<String>,

    /// User who attached the movie.
    #[sea_orm(nullable)]
    pub added_by: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    /// Set when the movie was pulled from a live event. Historical
    /// ballots and change-log rows may still reference it.
    #[sea_orm(nullable)]
    pub removed_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether the entry is still part of the event.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.removed_at.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::voting_event::Entity",
        from = "Column::EventId",
        to = "super::voting_event::Column::Id",
        on_delete = "Cascade"
    )]
    VotingEvent,
}

impl Related<super::voting_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VotingEvent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
