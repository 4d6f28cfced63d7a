//! Ballot entity: one participant's ranked picks for one event.

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Who cast a ballot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    /// Registered user. Counted on the leaderboard.
    #[sea_orm(string_value = "user")]
    User,
    /// Cookie-identified poll voter. Counted in standings only.
    #[sea_orm(string_value = "anonymous")]
    Anonymous,
}

/// A single `(rank, movie)` placement on a ballot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPick {
    /// 1-based rank position.
    pub rank: i32,
    /// Catalog movie ID.
    pub movie_id: String,
}

impl RankedPick {
    /// Create a pick.
    pub fn new(rank: i32, movie_id: impl Into<String>) -> Self {
        Self {
            rank,
            movie_id: movie_id.into(),
        }
    }
}

/// Ordered list of picks, stored as a JSON array.
///
/// Picks are kept sorted by rank. Gaps are allowed: removing a movie from
/// a live event leaves its rank slot empty rather than renumbering.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct RankedPicks(Vec<RankedPick>);

impl RankedPicks {
    /// Build from picks in any order.
    #[must_use]
    pub fn new(mut picks: Vec<RankedPick>) -> Self {
        picks.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.movie_id.cmp(&b.movie_id)));
        Self(picks)
    }

    /// An empty ballot.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Picks sorted by rank.
    #[must_use]
    pub fn as_slice(&self) -> &[RankedPick] {
        &self.0
    }

    /// Iterate picks in rank order.
    pub fn iter(&self) -> std::slice::Iter<'_, RankedPick> {
        self.0.iter()
    }

    /// Number of picks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the ballot ranks nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rank given to a movie, if any.
    #[must_use]
    pub fn rank_of(&self, movie_id: &str) -> Option<i32> {
        self.0.iter().find(|p| p.movie_id == movie_id).map(|p| p.rank)
    }

    /// Whether the movie is ranked.
    #[must_use]
    pub fn contains_movie(&self, movie_id: &str) -> bool {
        self.0.iter().any(|p| p.movie_id == movie_id)
    }

    /// Copy of the picks without the given movie. Other ranks keep their
    /// positions.
    #[must_use]
    pub fn without_movie(&self, movie_id: &str) -> Self {
        Self(
            self.0
                .iter()
                .filter(|p| p.movie_id != movie_id)
                .cloned()
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a RankedPicks {
    type Item = &'a RankedPick;
    type IntoIter = std::slice::Iter<'a, RankedPick>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ballot")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub event_id: String,

    /// User ID or anonymous voter ID. Unique per event.
    pub participant_id: String,

    pub participant_kind: ParticipantKind,

    #[sea_orm(nullable)]
    pub display_name: Option<String>,

    #[sea_orm(column_type = "JsonBinary")]
    pub ranks: RankedPicks,

    /// Excluded by an administrator without being deleted.
    #[sea_orm(default_value = false)]
    pub disabled: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether this ballot belongs to a registered user.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.participant_kind == ParticipantKind::User
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

    #[sea_orm(has_many = "super::ballot_change_log::Entity")]
    ChangeLog,
}

impl Related<super::voting_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VotingEvent.def()
    }
}

impl Related<super::ballot_change_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChangeLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
