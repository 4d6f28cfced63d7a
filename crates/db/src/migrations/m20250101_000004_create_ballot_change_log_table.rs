//! Create ballot change log table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BallotChangeLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BallotChangeLog::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BallotChangeLog::EventId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BallotChangeLog::BallotId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BallotChangeLog::ParticipantId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BallotChangeLog::PreviousRanks)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(BallotChangeLog::NewRanks)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BallotChangeLog::Reason)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(BallotChangeLog::Note).string_len(256).null())
                    .col(
                        ColumnDef::new(BallotChangeLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ballot_change_log_ballot_id")
                            .from(BallotChangeLog::Table, BallotChangeLog::BallotId)
                            .to(Ballot::Table, Ballot::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ballot_change_log_event_participant")
                    .table(BallotChangeLog::Table)
                    .col(BallotChangeLog::EventId)
                    .col(BallotChangeLog::ParticipantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BallotChangeLog::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum BallotChangeLog {
    Table,
    Id,
    EventId,
    BallotId,
    ParticipantId,
    PreviousRanks,
    NewRanks,
    Reason,
    Note,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Ballot {
    Table,
    Id,
}
