//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `reelvote_test`)
//!   `TEST_DB_PASSWORD` (default: `reelvote_test`)
//!   `TEST_DB_NAME` (database name prefix, default: `reelvote_test`)

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use reelvote_common::AppError;
use reelvote_db::entities::ballot::{ParticipantKind, RankedPick, RankedPicks};
use reelvote_db::entities::voting_event::{EventKind, EventState};
use reelvote_db::entities::{ballot, voting_event};
use reelvote_db::repositories::{BallotRepository, VotingEventRepository};
use reelvote_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

fn event(id: &str, kind: EventKind, state: EventState) -> voting_event::ActiveModel {
    voting_event::ActiveModel {
        id: Set(id.to_string()),
        kind: Set(kind),
        title: Set(format!("Event {id}")),
        description: Set(None),
        state: Set(state),
        max_rank_n: Set(3),
        archived: Set(false),
        created_by: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
        live_at: Set(None),
        frozen_at: Set(None),
        closed_at: Set(None),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_second_live_survey_rejected_by_index() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repo = VotingEventRepository::new(db.shared());

    repo.create(event("s1", EventKind::Survey, EventState::Live))
        .await
        .unwrap();
    let second = repo
        .create(event("s2", EventKind::Survey, EventState::Live))
        .await;

    assert!(matches!(second, Err(AppError::Conflict(_))));

    // Polls have no single-live restriction.
    repo.create(event("p1", EventKind::Poll, EventState::Live))
        .await
        .unwrap();
    repo.create(event("p2", EventKind::Poll, EventState::Live))
        .await
        .unwrap();

    // After a reset the first survey can go live again.
    db.reset().await.unwrap();
    repo.create(event("s2", EventKind::Survey, EventState::Live))
        .await
        .unwrap();

    drop(repo);
    db.drop_database().await.unwrap();
}

fn ballot_row(id: &str, movie: &str) -> ballot::ActiveModel {
    ballot::ActiveModel {
        id: Set(id.to_string()),
        event_id: Set("s1".to_string()),
        participant_id: Set("user1".to_string()),
        participant_kind: Set(ParticipantKind::User),
        display_name: Set(None),
        ranks: Set(RankedPicks::new(vec![RankedPick::new(1, movie)])),
        disabled: Set(false),
        created_at: Set(Utc::now().into()),
        updated_at: Set(Utc::now().into()),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_second_ballot_insert_for_participant_is_skipped() {
    let db = TestDatabase::create_unique().await.unwrap();
    let conn: Arc<DatabaseConnection> = db.shared();
    let events = VotingEventRepository::new(conn.clone());
    let ballots = BallotRepository::new(conn.clone());

    events
        .create(event("s1", EventKind::Survey, EventState::Live))
        .await
        .unwrap();

    let first = ballots
        .insert_if_absent(conn.as_ref(), ballot_row("b1", "m1"))
        .await
        .unwrap();
    assert_eq!(first.map(|b| b.id), Some("b1".to_string()));

    let second = ballots
        .insert_if_absent(conn.as_ref(), ballot_row("b2", "m2"))
        .await
        .unwrap();
    assert!(second.is_none());

    let rows = ballots.list_by_event("s1", true).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "b1");
    assert_eq!(rows[0].ranks.rank_of("m1"), Some(1));

    drop((events, ballots, conn));
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_max_rank_check_constraint() {
    let db = TestDatabase::create_unique().await.unwrap();

    let mut model = event("s1", EventKind::Survey, EventState::Draft);
    model.max_rank_n = Set(11);
    let result = model.insert(db.connection()).await;

    assert!(result.is_err());

    db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.name_prefix.is_empty());
    assert!(config.maintenance_url().ends_with("/postgres"));
}
