//! Ballot change log entity. Append-only audit trail of ballot mutations.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::ballot::RankedPicks;

/// Why a ballot changed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    /// The participant submitted new picks.
    #[sea_orm(string_value = "participant_update")]
    ParticipantUpdate,
    /// A movie was pulled from the live event and stripped from the ballot.
    #[sea_orm(string_value = "movie_removed")]
    MovieRemoved,
    /// Administrative change, e.g. excluding the ballot.
    #[sea_orm(string_value = "system")]
    System,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ballot_change_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub event_id: String,

    pub ballot_id: String,

    pub participant_id: String,

    /// Picks before the change; `None` when the ballot was created.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub previous_ranks: Option<RankedPicks>,

    #[sea_orm(column_type = "JsonBinary")]
    pub new_ranks: RankedPicks,

    pub reason: ChangeReason,

    /// Free-form detail, e.g. the removed movie ID.
    #[sea_orm(nullable)]
    pub note: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ballot::Entity",
        from = "Column::BallotId",
        to = "super::ballot::Column::Id",
        on_delete = "Cascade"
    )]
    Ballot,
}

impl Related<super::ballot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ballot.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
