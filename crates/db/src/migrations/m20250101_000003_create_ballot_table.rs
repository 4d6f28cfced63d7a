//! Create ballot table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ballot::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ballot::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ballot::EventId).string_len(32).not_null())
                    .col(ColumnDef::new(Ballot::ParticipantId).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Ballot::ParticipantKind)
                            .string_len(16)
                            .not_null()
                            .default("user"),
                    )
                    .col(ColumnDef::new(Ballot::DisplayName).string_len(128).null())
                    .col(
                        ColumnDef::new(Ballot::Ranks)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Ballot::Disabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Ballot::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Ballot::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ballot_event_id")
                            .from(Ballot::Table, Ballot::EventId)
                            .to(VotingEvent::Table, VotingEvent::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One ballot per participant; first inserts race on this key.
        manager
            .create_index(
                Index::create()
                    .name("uq_ballot_event_participant")
                    .table(Ballot::Table)
                    .col(Ballot::EventId)
                    .col(Ballot::ParticipantId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ballot_participant_id")
                    .table(Ballot::Table)
                    .col(Ballot::ParticipantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ballot::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Ballot {
    Table,
    Id,
    EventId,
    ParticipantId,
    ParticipantKind,
    DisplayName,
    Ranks,
    Disabled,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum VotingEvent {
    Table,
    Id,
}
