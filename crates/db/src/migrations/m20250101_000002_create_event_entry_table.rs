//! Create event entry table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EventEntry::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventEntry::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EventEntry::EventId).string_len(32).not_null())
                    .col(ColumnDef::new(EventEntry::MovieId).string_len(64).not_null())
                    .col(ColumnDef::new(EventEntry::Title).string_len(512).not_null())
                    .col(ColumnDef::new(EventEntry::TmdbId).big_integer().not_null())
                    .col(ColumnDef::new(EventEntry::PosterPath).string_len(512).null())
                    .col(ColumnDef::new(EventEntry::AddedBy).string_len(64).null())
                    .col(
                        ColumnDef::new(EventEntry::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventEntry::RemovedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_entry_event_id")
                            .from(EventEntry::Table, EventEntry::EventId)
                            .to(VotingEvent::Table, VotingEvent::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per movie per event; re-adding a removed movie restores it.
        manager
            .create_index(
                Index::create()
                    .name("uq_event_entry_event_movie")
                    .table(EventEntry::Table)
                    .col(EventEntry::EventId)
                    .col(EventEntry::MovieId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventEntry::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum EventEntry {
    Table,
    Id,
    EventId,
    MovieId,
    Title,
    TmdbId,
    PosterPath,
    AddedBy,
    CreatedAt,
    RemovedAt,
}

#[derive(DeriveIden)]
enum VotingEvent {
    Table,
    Id,
}
