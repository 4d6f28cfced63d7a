//! Voting event entity (surveys and polls).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of voting event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Named event for signed-in users. Only one survey may be live at a time.
    #[sea_orm(string_value = "survey")]
    Survey,
    /// Quick poll. Anonymous voters allowed, many may be live at once.
    #[sea_orm(string_value = "poll")]
    Poll,
}

impl EventKind {
    /// The state this kind of event ends in.
    #[must_use]
    pub const fn terminal_state(self) -> EventState {
        match self {
            Self::Survey => EventState::Frozen,
            Self::Poll => EventState::Closed,
        }
    }

    /// Whether at most one event of this kind may be live at any instant.
    #[must_use]
    pub const fn has_single_live_slot(self) -> bool {
        matches!(self, Self::Survey)
    }

    /// Whether anonymous (cookie-identified) voters may submit ballots.
    #[must_use]
    pub const fn allows_anonymous(self) -> bool {
        matches!(self, Self::Poll)
    }

    /// Whether an empty ballot is accepted (clearing a previous one).
    #[must_use]
    pub const fn allows_empty_ballot(self) -> bool {
        matches!(self, Self::Survey)
    }

    /// Lowercase name used in messages and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Survey => "survey",
            Self::Poll => "poll",
        }
    }
}

/// Lifecycle state of a voting event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    /// Being prepared; entries may be added and removed freely.
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Open for ballots.
    #[sea_orm(string_value = "live")]
    Live,
    /// Survey results locked.
    #[sea_orm(string_value = "frozen")]
    Frozen,
    /// Poll results locked.
    #[sea_orm(string_value = "closed")]
    Closed,
}

impl EventState {
    /// Whether no further transition or mutation is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Frozen | Self::Closed)
    }

    /// Whether entries may be added or removed.
    #[must_use]
    pub const fn accepts_entries(self) -> bool {
        matches!(self, Self::Draft | Self::Live)
    }

    /// Whether ballots may be submitted.
    #[must_use]
    pub const fn accepts_ballots(self) -> bool {
        matches!(self, Self::Live)
    }

    /// Lowercase name used in messages and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Live => "live",
            Self::Frozen => "frozen",
            Self::Closed => "closed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "voting_event")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub kind: EventKind,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(indexed)]
    pub state: EventState,

    /// Number of ranked slots on a ballot (1..=10).
    pub max_rank_n: i32,

    /// Archived events are hidden and excluded from the leaderboard.
    #[sea_orm(default_value = false)]
    pub archived: bool,

    /// User who created the event.
    #[sea_orm(nullable)]
    pub created_by: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub live_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub frozen_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub closed_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// When the event reached its terminal state, if it has.
    #[must_use]
    pub fn completed_at(&self) -> Option<DateTimeWithTimeZone> {
        self.frozen_at.or(self.closed_at)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::event_entry::Entity")]
    Entries,

    #[sea_orm(has_many = "super::ballot::Entity")]
    Ballots,
}

impl Related<super::event_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl Related<super::ballot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ballots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
