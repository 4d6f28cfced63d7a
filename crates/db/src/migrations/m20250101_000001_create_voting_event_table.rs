//! Create voting event table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VotingEvent::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VotingEvent::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VotingEvent::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(VotingEvent::Title).string_len(100).not_null())
                    .col(ColumnDef::new(VotingEvent::Description).text().null())
                    .col(
                        ColumnDef::new(VotingEvent::State)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(VotingEvent::MaxRankN)
                            .integer()
                            .not_null()
                            .default(3)
                            .check(
                                Expr::col(VotingEvent::MaxRankN)
                                    .gte(1)
                                    .and(Expr::col(VotingEvent::MaxRankN).lte(10)),
                            ),
                    )
                    .col(
                        ColumnDef::new(VotingEvent::Archived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(VotingEvent::CreatedBy).string_len(64).null())
                    .col(
                        ColumnDef::new(VotingEvent::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VotingEvent::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(VotingEvent::LiveAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(VotingEvent::FrozenAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(VotingEvent::ClosedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_voting_event_kind_state")
                    .table(VotingEvent::Table)
                    .col(VotingEvent::Kind)
                    .col(VotingEvent::State)
                    .to_owned(),
            )
            .await?;

        // At most one live survey. The service also locks inside a
        // transaction; this index catches the race between two go-live calls.
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE UNIQUE INDEX IF NOT EXISTS uq_voting_event_single_live_survey
                ON voting_event (kind)
                WHERE kind = 'survey' AND state = 'live';
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS uq_voting_event_single_live_survey;")
            .await?;

        manager
            .drop_table(Table::drop().table(VotingEvent::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum VotingEvent {
    Table,
    Id,
    Kind,
    Title,
    Description,
    State,
    MaxRankN,
    Archived,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
    LiveAt,
    FrozenAt,
    ClosedAt,
}
