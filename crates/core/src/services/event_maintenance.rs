//! Entry removal, which has to rewrite ballots of a live event.

use chrono::Utc;
use reelvote_common::{AppError, AppResult, IdGenerator};
use reelvote_db::entities::ballot;
use reelvote_db::entities::ballot_change_log::ChangeReason;
use reelvote_db::entities::voting_event::EventState;
use reelvote_db::repositories::{
    BallotRepository, ChangeLogRepository, EventEntryRepository, VotingEventRepository,
};
use sea_orm::Set;
use tracing::{debug, info};

use super::ballot::change_entry;
use crate::lifecycle;

/// Removes movies from events.
#[derive(Clone)]
pub struct EventMaintenanceService {
    event_repo: VotingEventRepository,
    entry_repo: EventEntryRepository,
    ballot_repo: BallotRepository,
    change_log_repo: ChangeLogRepository,
    id_gen: IdGenerator,
}

impl EventMaintenanceService {
    /// Create a new event maintenance service.
    #[must_use]
    pub const fn new(
        event_repo: VotingEventRepository,
        entry_repo: EventEntryRepository,
        ballot_repo: BallotRepository,
        change_log_repo: ChangeLogRepository,
    ) -> Self {
        Self {
            event_repo,
            entry_repo,
            ballot_repo,
            change_log_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Remove a movie from an event and return how many ballots changed.
    ///
    /// From a draft the entry is deleted outright. From a live event the
    /// entry is kept as removed, the movie is stripped from every ballot
    /// that ranked it (other picks keep their ranks) and one
    /// `movie_removed` change is logged per stripped ballot. All of it
    /// commits together or not at all.
    pub async fn remove_entry(&self, event_id: &str, movie_id: &str) -> AppResult<u64> {
        let txn = self.event_repo.begin().await?;
        let event = self.event_repo.lock_by_id(&txn, event_id).await?;
        lifecycle::ensure_entries_mutable(event.state)?;

        let entry = self
            .entry_repo
            .find_by_event_and_movie(&txn, event_id, movie_id)
            .await?
            .filter(|entry| entry.is_active())
            .ok_or_else(|| AppError::NotFound(format!("Movie {movie_id} in event {event_id}")))?;

        if event.state == EventState::Draft {
            self.entry_repo.delete(&txn, &entry.id).await?;
            txn.commit()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            info!(event_id, movie_id, "Movie removed from draft");
            return Ok(0);
        }

        let ballots = self.ballot_repo.lock_all_by_event(&txn, event_id).await?;
        let mut affected = 0;

        for ballot in ballots.into_iter().filter(|b| b.ranks.contains_movie(movie_id)) {
            let previous = ballot.ranks.clone();
            let stripped = previous.without_movie(movie_id);

            let mut active: ballot::ActiveModel = ballot.into();
            active.ranks = Set(stripped);
            active.updated_at = Set(Utc::now().into());
            let saved = self.ballot_repo.update(&txn, active).await?;

            let log = change_entry(
                &self.id_gen,
                &saved,
                Some(previous),
                ChangeReason::MovieRemoved,
                Some(movie_id.to_string()),
            );
            self.change_log_repo.append(&txn, log).await?;

            debug!(event_id, participant_id = %saved.participant_id, movie_id, "Ballot stripped");
            affected += 1;
        }

        self.entry_repo.mark_removed(&txn, entry).await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(event_id, movie_id, affected, "Movie removed from live event");
        Ok(affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reelvote_db::entities::ballot::{ParticipantKind, RankedPick, RankedPicks};
    use reelvote_db::entities::voting_event::{self, EventKind};
    use reelvote_db::entities::{ballot_change_log, event_entry};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Statement, Value};
    use std::sync::Arc;

    fn create_test_event(state: EventState) -> voting_event::Model {
        voting_event::Model {
            id: "ev1".to_string(),
            kind: EventKind::Survey,
            title: "Noir night".to_string(),
            description: None,
            state,
            max_rank_n: 3,
            archived: false,
            created_by: None,
            created_at: Utc::now().into(),
            updated_at: None,
            live_at: None,
            frozen_at: None,
            closed_at: None,
        }
    }

    fn create_test_entry(movie_id: &str) -> event_entry::Model {
        event_entry::Model {
            id: format!("entry-{movie_id}"),
            event_id: "ev1".to_string(),
            movie_id: movie_id.to_string(),
            title: movie_id.to_uppercase(),
            tmdb_id: 1,
            poster_path: None,
            added_by: None,
            created_at: Utc::now().into(),
            removed_at: None,
        }
    }

    fn create_test_ballot(participant_id: &str, picks: &[(i32, &str)]) -> ballot::Model {
        ballot::Model {
            id: format!("ballot-{participant_id}"),
            event_id: "ev1".to_string(),
            participant_id: participant_id.to_string(),
            participant_kind: ParticipantKind::User,
            display_name: None,
            ranks: RankedPicks::new(picks.iter().map(|(r, m)| RankedPick::new(*r, *m)).collect()),
            disabled: false,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn create_test_log(ballot: &ballot::Model) -> ballot_change_log::Model {
        ballot_change_log::Model {
            id: format!("log-{}", ballot.id),
            event_id: ballot.event_id.clone(),
            ballot_id: ballot.id.clone(),
            participant_id: ballot.participant_id.clone(),
            previous_ranks: None,
            new_ranks: ballot.ranks.clone(),
            reason: ChangeReason::MovieRemoved,
            note: Some("m1".to_string()),
            created_at: Utc::now().into(),
        }
    }

    fn service(db: DatabaseConnection) -> EventMaintenanceService {
        service_on(Arc::new(db))
    }

    fn service_on(db: Arc<DatabaseConnection>) -> EventMaintenanceService {
        EventMaintenanceService::new(
            VotingEventRepository::new(db.clone()),
            EventEntryRepository::new(db.clone()),
            BallotRepository::new(db.clone()),
            ChangeLogRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_remove_from_draft_deletes_entry() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_event(EventState::Draft)]])
            .append_query_results([[create_test_entry("m1")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let affected = service(db).remove_entry("ev1", "m1").await.unwrap();

        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn test_remove_from_live_strips_ranking_ballots() {
        let stripped_a = create_test_ballot("a", &[(2, "m2")]);
        let stripped_b = create_test_ballot("b", &[(1, "m3")]);
        let mut removed = create_test_entry("m1");
        removed.removed_at = Some(Utc::now().into());

        // Ballot c never ranked m1 and is left alone.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_event(EventState::Live)]])
            .append_query_results([[create_test_entry("m1")]])
            .append_query_results([vec![
                create_test_ballot("a", &[(1, "m1"), (2, "m2")]),
                create_test_ballot("b", &[(1, "m3"), (3, "m1")]),
                create_test_ballot("c", &[(1, "m2")]),
            ]])
            .append_query_results([[stripped_a.clone()]])
            .append_query_results([[create_test_log(&stripped_a)]])
            .append_query_results([[stripped_b.clone()]])
            .append_query_results([[create_test_log(&stripped_b)]])
            .append_query_results([[removed]])
            .into_connection();

        let affected = service(db).remove_entry("ev1", "m1").await.unwrap();

        assert_eq!(affected, 2);
    }

    #[tokio::test]
    async fn test_stripped_ballot_is_written_and_logged() {
        let original = create_test_ballot("a", &[(1, "m1"), (2, "m2"), (3, "m3")]);
        let stripped = create_test_ballot("a", &[(1, "m1"), (3, "m3")]);
        let mut removed = create_test_entry("m2");
        removed.removed_at = Some(Utc::now().into());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_event(EventState::Live)]])
                .append_query_results([[create_test_entry("m2")]])
                .append_query_results([[original.clone()]])
                .append_query_results([[stripped.clone()]])
                .append_query_results([[create_test_log(&stripped)]])
                .append_query_results([[removed]])
                .into_connection(),
        );

        let svc = service_on(db.clone());
        let affected = svc.remove_entry("ev1", "m2").await.unwrap();
        drop(svc);
        assert_eq!(affected, 1);

        let statements: Vec<Statement> = Arc::try_unwrap(db)
            .ok()
            .unwrap()
            .into_transaction_log()
            .iter()
            .flat_map(|txn| txn.statements().to_vec())
            .collect();

        let update = statements
            .iter()
            .find(|stmt| stmt.sql.starts_with(r#"UPDATE "ballot""#))
            .unwrap();
        let values = &update.values.as_ref().unwrap().0;
        assert!(values.contains(&Value::from(stripped.ranks.clone())));
        // updated_at is written along with the ranks.
        assert!(update.sql.contains(r#""updated_at" ="#));

        let logs: Vec<&Statement> = statements
            .iter()
            .filter(|stmt| stmt.sql.starts_with(r#"INSERT INTO "ballot_change_log""#))
            .collect();
        assert_eq!(logs.len(), 1);
        let values = &logs[0].values.as_ref().unwrap().0;
        assert_eq!(values[4], Value::from(original.ranks));
        assert_eq!(values[5], Value::from(stripped.ranks));
        assert_eq!(
            values[6],
            Value::String(Some(Box::new("movie_removed".to_string())))
        );
        assert_eq!(values[7], Value::String(Some(Box::new("m2".to_string()))));
    }

    #[tokio::test]
    async fn test_remove_after_freeze_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_event(EventState::Frozen)]])
            .into_connection();

        let result = service(db).remove_entry("ev1", "m1").await;

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_remove_already_removed_entry() {
        let mut removed = create_test_entry("m1");
        removed.removed_at = Some(Utc::now().into());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_event(EventState::Live)]])
            .append_query_results([[removed]])
            .into_connection();

        let result = service(db).remove_entry("ev1", "m1").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_stripping_keeps_other_ranks() {
        let ballot = create_test_ballot("a", &[(1, "m1"), (2, "m2"), (3, "m3")]);

        let stripped = ballot.ranks.without_movie("m2");

        assert_eq!(stripped.rank_of("m1"), Some(1));
        assert_eq!(stripped.rank_of("m2"), None);
        assert_eq!(stripped.rank_of("m3"), Some(3));
    }
}
