//! Standings for a single event.

use reelvote_common::AppResult;
use reelvote_db::entities::voting_event::{EventKind, EventState};
use reelvote_db::repositories::{BallotRepository, EventEntryRepository, VotingEventRepository};
use serde::Serialize;
use tracing::debug;

use crate::scoring::{self, MovieRef, Standing};

/// Standings plus the context a results page needs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResults {
    pub event_id: String,
    pub kind: EventKind,
    pub state: EventState,
    pub max_rank_n: i32,
    /// Enabled ballots that were counted.
    pub ballot_count: usize,
    pub standings: Vec<Standing>,
    /// Movie IDs in first place with points.
    pub winners: Vec<String>,
}

/// Computes standings from stored ballots.
#[derive(Clone)]
pub struct StandingsService {
    event_repo: VotingEventRepository,
    entry_repo: EventEntryRepository,
    ballot_repo: BallotRepository,
}

impl StandingsService {
    /// Create a new standings service.
    #[must_use]
    pub const fn new(
        event_repo: VotingEventRepository,
        entry_repo: EventEntryRepository,
        ballot_repo: BallotRepository,
    ) -> Self {
        Self {
            event_repo,
            entry_repo,
            ballot_repo,
        }
    }

    /// Ordered standings for every active movie of an event.
    ///
    /// Works in any state; for a frozen or closed event the result never
    /// changes.
    pub async fn calculate_for_event(&self, event_id: &str) -> AppResult<Vec<Standing>> {
        Ok(self.results(event_id).await?.standings)
    }

    /// Standings with ballot count and winners.
    pub async fn results(&self, event_id: &str) -> AppResult<EventResults> {
        let event = self.event_repo.get_by_id(event_id).await?;
        let entries = self.entry_repo.list_by_event(event_id, false).await?;
        let ballots = self.ballot_repo.list_by_event(event_id, false).await?;

        let movies: Vec<MovieRef> = entries.iter().map(MovieRef::from).collect();
        let standings =
            scoring::calculate_standings(ballots.iter().map(|b| &b.ranks), &movies, event.max_rank_n);
        let winners = scoring::winners(&standings)
            .into_iter()
            .map(|s| s.movie.id.clone())
            .collect();

        debug!(
            event_id,
            movies = movies.len(),
            ballots = ballots.len(),
            "Standings calculated"
        );

        Ok(EventResults {
            event_id: event.id,
            kind: event.kind,
            state: event.state,
            max_rank_n: event.max_rank_n,
            ballot_count: ballots.len(),
            standings,
            winners,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reelvote_common::AppError;
    use reelvote_db::entities::ballot::{ParticipantKind, RankedPick, RankedPicks};
    use reelvote_db::entities::{ballot, event_entry, voting_event};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn create_test_event(max_rank_n: i32) -> voting_event::Model {
        voting_event::Model {
            id: "ev1".to_string(),
            kind: EventKind::Poll,
            title: "Friday".to_string(),
            description: None,
            state: EventState::Closed,
            max_rank_n,
            archived: false,
            created_by: None,
            created_at: Utc::now().into(),
            updated_at: None,
            live_at: None,
            frozen_at: None,
            closed_at: None,
        }
    }

    fn create_test_entry(movie_id: &str, title: &str) -> event_entry::Model {
        event_entry::Model {
            id: format!("entry-{movie_id}"),
            event_id: "ev1".to_string(),
            movie_id: movie_id.to_string(),
            title: title.to_string(),
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
            participant_kind: ParticipantKind::Anonymous,
            display_name: None,
            ranks: RankedPicks::new(picks.iter().map(|(r, m)| RankedPick::new(*r, *m)).collect()),
            disabled: false,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn service(db: DatabaseConnection) -> StandingsService {
        let db = Arc::new(db);
        StandingsService::new(
            VotingEventRepository::new(db.clone()),
            EventEntryRepository::new(db.clone()),
            BallotRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_results_for_event() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_event(2)]])
            .append_query_results([vec![
                create_test_entry("m1", "Heat"),
                create_test_entry("m2", "Ronin"),
            ]])
            .append_query_results([vec![
                create_test_ballot("a", &[(1, "m1"), (2, "m2")]),
                create_test_ballot("b", &[(1, "m2")]),
                create_test_ballot("c", &[(1, "m1")]),
            ]])
            .into_connection();

        let results = service(db).results("ev1").await.unwrap();

        assert_eq!(results.ballot_count, 3);
        assert_eq!(results.standings[0].movie.id, "m1");
        assert_eq!(results.standings[0].total_points, 4);
        assert_eq!(results.standings[1].total_points, 3);
        assert_eq!(results.winners, vec!["m1".to_string()]);
    }

    #[tokio::test]
    async fn test_no_ballots_no_winners() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_event(3)]])
            .append_query_results([vec![create_test_entry("m1", "Heat")]])
            .append_query_results([Vec::<ballot::Model>::new()])
            .into_connection();

        let results = service(db).results("ev1").await.unwrap();

        assert_eq!(results.standings.len(), 1);
        assert_eq!(results.standings[0].total_points, 0);
        assert!(results.winners.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_event() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<voting_event::Model>::new()])
            .into_connection();

        let result = service(db).calculate_for_event("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
