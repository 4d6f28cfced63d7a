//! Oracle leaderboard across completed events.
//!
//! A participant earns oracle points on an event by having ranked one of
//! its winners: the points that winner got from their ballot, using their
//! best-ranked winner when several movies tie for first. The possible
//! points per event are `max_rank_n`. Only registered participants are
//! scored; anonymous poll ballots still count toward the event's winners.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use reelvote_common::{AppResult, VotingConfig};
use reelvote_db::entities::ballot;
use reelvote_db::entities::voting_event::EventKind;
use reelvote_db::repositories::{BallotRepository, EventEntryRepository, VotingEventRepository};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;
use tracing::{info, trace};

use crate::scoring::{self, MovieRef};

/// One participant's row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub participant_id: String,
    /// From the participant's most recently updated ballot.
    pub display_name: Option<String>,
    pub participation_count: u32,
    pub oracle_points_earned: u64,
    pub oracle_points_possible: u64,
    /// Earned over possible, as a percentage with one decimal.
    pub accuracy_percent: f64,
}

/// Leaderboard rows plus the number of events that fed them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
    /// Completed events that had at least one ballot and a winner.
    pub total_completed_events: usize,
}

/// A completed event with what the fold needs from it.
#[derive(Debug, Clone)]
pub struct CompletedEvent {
    pub event_id: String,
    pub kind: EventKind,
    pub max_rank_n: i32,
    pub movies: Vec<MovieRef>,
    pub ballots: Vec<ballot::Model>,
}

#[derive(Default)]
struct Tally {
    display_name: Option<String>,
    name_updated_at: Option<DateTimeWithTimeZone>,
    participation_count: u32,
    earned: u64,
    possible: u64,
}

/// Round `earned / possible` to a one-decimal percentage.
#[must_use]
pub fn accuracy_percent(earned: u64, possible: u64) -> f64 {
    if possible == 0 {
        return 0.0;
    }
    let ratio = earned as f64 / possible as f64;
    (ratio * 1000.0).round() / 10.0
}

/// Fold completed events into a leaderboard.
///
/// Disabled ballots are ignored. Events without ballots, or whose ballots
/// gave no movie any points, contribute nothing. Rows are ordered by
/// accuracy, then participation, then participant ID.
pub fn fold_leaderboard(events: &[CompletedEvent]) -> Leaderboard {
    let mut tallies: HashMap<&str, Tally> = HashMap::new();
    let mut total_completed_events = 0;

    for event in events {
        let ballots: Vec<&ballot::Model> = event.ballots.iter().filter(|b| !b.disabled).collect();
        if ballots.is_empty() {
            continue;
        }

        let standings = scoring::calculate_standings(
            ballots.iter().map(|b| &b.ranks),
            &event.movies,
            event.max_rank_n,
        );
        let winner_ids: HashSet<&str> = scoring::winners(&standings)
            .into_iter()
            .map(|s| s.movie.id.as_str())
            .collect();
        if winner_ids.is_empty() {
            trace!(
                event_id = %event.event_id,
                kind = event.kind.as_str(),
                "No movie scored, event skipped"
            );
            continue;
        }
        total_completed_events += 1;

        let possible = u64::try_from(event.max_rank_n).unwrap_or(0);

        for ballot in ballots.iter().filter(|b| b.is_registered()) {
            let tally = tallies.entry(ballot.participant_id.as_str()).or_default();
            tally.participation_count += 1;
            tally.possible += possible;

            let best_winner_rank = ballot
                .ranks
                .iter()
                .filter(|p| winner_ids.contains(p.movie_id.as_str()))
                .map(|p| p.rank)
                .filter(|&rank| rank >= 1)
                .min();
            if let Some(rank) = best_winner_rank {
                tally.earned += u64::from(scoring::points_for_rank(rank, event.max_rank_n));
            }

            if ballot.display_name.is_some()
                && tally
                    .name_updated_at
                    .is_none_or(|seen| ballot.updated_at > seen)
            {
                tally.display_name.clone_from(&ballot.display_name);
                tally.name_updated_at = Some(ballot.updated_at);
            }
        }
    }

    let mut entries: Vec<LeaderboardEntry> = tallies
        .into_iter()
        .map(|(participant_id, tally)| LeaderboardEntry {
            participant_id: participant_id.to_string(),
            display_name: tally.display_name,
            participation_count: tally.participation_count,
            oracle_points_earned: tally.earned,
            oracle_points_possible: tally.possible,
            accuracy_percent: accuracy_percent(tally.earned, tally.possible),
        })
        .collect();
    entries.sort_by(compare_entries);

    Leaderboard {
        entries,
        total_completed_events,
    }
}

fn compare_entries(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.accuracy_percent
        .total_cmp(&a.accuracy_percent)
        .then_with(|| b.participation_count.cmp(&a.participation_count))
        .then_with(|| a.participant_id.cmp(&b.participant_id))
}

/// Builds the leaderboard from stored events.
#[derive(Clone)]
pub struct LeaderboardService {
    event_repo: VotingEventRepository,
    entry_repo: EventEntryRepository,
    ballot_repo: BallotRepository,
    config: VotingConfig,
}

impl LeaderboardService {
    /// Create a new leaderboard service.
    #[must_use]
    pub const fn new(
        event_repo: VotingEventRepository,
        entry_repo: EventEntryRepository,
        ballot_repo: BallotRepository,
        config: VotingConfig,
    ) -> Self {
        Self {
            event_repo,
            entry_repo,
            ballot_repo,
            config,
        }
    }

    /// Build the leaderboard over frozen surveys and closed polls that are
    /// not archived.
    pub async fn build(&self) -> AppResult<Leaderboard> {
        let events = self
            .event_repo
            .find_completed(self.config.leaderboard_event_limit)
            .await?;
        let event_ids: Vec<String> = events.iter().map(|e| e.id.clone()).collect();

        let entries = self.entry_repo.list_active_by_events(&event_ids).await?;
        let ballots = self.ballot_repo.list_enabled_by_events(&event_ids).await?;

        let mut movies_by_event: HashMap<String, Vec<MovieRef>> = HashMap::new();
        for entry in &entries {
            movies_by_event
                .entry(entry.event_id.clone())
                .or_default()
                .push(MovieRef::from(entry));
        }
        let mut ballots_by_event: HashMap<String, Vec<ballot::Model>> = HashMap::new();
        for ballot in ballots {
            ballots_by_event
                .entry(ballot.event_id.clone())
                .or_default()
                .push(ballot);
        }

        let completed: Vec<CompletedEvent> = events
            .into_iter()
            .map(|event| CompletedEvent {
                movies: movies_by_event.remove(&event.id).unwrap_or_default(),
                ballots: ballots_by_event.remove(&event.id).unwrap_or_default(),
                event_id: event.id,
                kind: event.kind,
                max_rank_n: event.max_rank_n,
            })
            .collect();

        let leaderboard = fold_leaderboard(&completed);
        info!(
            events = completed.len(),
            counted = leaderboard.total_completed_events,
            participants = leaderboard.entries.len(),
            "Leaderboard built"
        );
        Ok(leaderboard)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use reelvote_db::entities::ballot::{ParticipantKind, RankedPick, RankedPicks};
    use reelvote_db::entities::voting_event::{self, EventState};
    use reelvote_db::entities::event_entry;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn movie(id: &str, title: &str) -> MovieRef {
        MovieRef {
            id: id.to_string(),
            title: title.to_string(),
            tmdb_id: 1,
            poster_path: None,
        }
    }

    fn vote(participant_id: &str, picks: &[(i32, &str)]) -> ballot::Model {
        ballot::Model {
            id: format!("ballot-{participant_id}"),
            event_id: "ev".to_string(),
            participant_id: participant_id.to_string(),
            participant_kind: ParticipantKind::User,
            display_name: None,
            ranks: RankedPicks::new(picks.iter().map(|(r, m)| RankedPick::new(*r, *m)).collect()),
            disabled: false,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn anonymous(participant_id: &str, picks: &[(i32, &str)]) -> ballot::Model {
        ballot::Model {
            participant_kind: ParticipantKind::Anonymous,
            ..vote(participant_id, picks)
        }
    }

    fn event(id: &str, max_rank_n: i32, ballots: Vec<ballot::Model>) -> CompletedEvent {
        CompletedEvent {
            event_id: id.to_string(),
            kind: EventKind::Survey,
            max_rank_n,
            movies: vec![movie("m1", "Alien"), movie("m2", "Brazil"), movie("m3", "Cube")],
            ballots,
        }
    }

    fn row<'a>(board: &'a Leaderboard, participant_id: &str) -> &'a LeaderboardEntry {
        board
            .entries
            .iter()
            .find(|e| e.participant_id == participant_id)
            .unwrap()
    }

    #[test]
    fn test_accuracy_percent_rounding() {
        assert_eq!(accuracy_percent(0, 0), 0.0);
        assert_eq!(accuracy_percent(3, 3), 100.0);
        assert_eq!(accuracy_percent(2, 3), 66.7);
        assert_eq!(accuracy_percent(1, 3), 33.3);
        assert_eq!(accuracy_percent(5, 6), 83.3);
    }

    #[test]
    fn test_oracle_points_from_winner_rank() {
        // m1 = 7, m3 = 5, m2 = 4.
        let board = fold_leaderboard(&[event(
            "ev1",
            3,
            vec![
                vote("alice", &[(1, "m1"), (2, "m3")]),
                vote("bob", &[(1, "m1"), (2, "m2")]),
                vote("cara", &[(1, "m3"), (2, "m2"), (3, "m1")]),
                vote("dan", &[]),
            ],
        )]);

        assert_eq!(board.total_completed_events, 1);
        assert_eq!(row(&board, "alice").oracle_points_earned, 3);
        assert_eq!(row(&board, "bob").oracle_points_earned, 3);
        assert_eq!(row(&board, "cara").oracle_points_earned, 1);
        assert_eq!(row(&board, "dan").oracle_points_earned, 0);
        assert_eq!(row(&board, "dan").participation_count, 1);
        assert_eq!(row(&board, "dan").oracle_points_possible, 3);
    }

    #[test]
    fn test_tied_winners_use_best_rank() {
        // m1 and m2 both earn 3: co-winners.
        let board = fold_leaderboard(&[event(
            "ev1",
            2,
            vec![
                vote("alice", &[(1, "m1"), (2, "m2")]),
                vote("bob", &[(1, "m2"), (2, "m1")]),
            ],
        )]);

        assert_eq!(row(&board, "alice").oracle_points_earned, 2);
        assert_eq!(row(&board, "bob").oracle_points_earned, 2);
        assert_eq!(row(&board, "alice").accuracy_percent, 100.0);
    }

    #[test]
    fn test_anonymous_ballots_decide_winner_but_are_not_ranked() {
        let mut poll = event(
            "p1",
            1,
            vec![
                vote("alice", &[(1, "m2")]),
                anonymous("cookie-1", &[(1, "m1")]),
                anonymous("cookie-2", &[(1, "m1")]),
            ],
        );
        poll.kind = EventKind::Poll;

        let board = fold_leaderboard(&[poll]);

        assert_eq!(board.entries.len(), 1);
        assert_eq!(row(&board, "alice").oracle_points_earned, 0);
        assert_eq!(row(&board, "alice").accuracy_percent, 0.0);
    }

    #[test]
    fn test_events_without_ballots_or_points_are_skipped() {
        let empty = event("ev1", 3, vec![]);
        let blank = event("ev2", 3, vec![vote("alice", &[])]);
        let mut disabled = vote("bob", &[(1, "m1")]);
        disabled.disabled = true;
        let excluded = event("ev3", 3, vec![disabled]);

        let board = fold_leaderboard(&[empty, blank, excluded]);

        assert_eq!(board.total_completed_events, 0);
        assert!(board.entries.is_empty());
    }

    #[test]
    fn test_disabled_ballot_does_not_move_winner() {
        let mut troll = vote("troll", &[(1, "m3")]);
        troll.disabled = true;
        let mut troll2 = vote("troll2", &[(1, "m3")]);
        troll2.disabled = true;

        let board = fold_leaderboard(&[event(
            "ev1",
            1,
            vec![vote("alice", &[(1, "m1")]), troll, troll2],
        )]);

        assert_eq!(row(&board, "alice").oracle_points_earned, 1);
        assert!(board.entries.iter().all(|e| !e.participant_id.starts_with("troll")));
    }

    #[test]
    fn test_sort_order() {
        let first = vec![
            vote("carol", &[(1, "m1")]),
            vote("bob", &[(1, "m1")]),
            vote("alice", &[(1, "m2")]),
            vote("zed", &[(1, "m1")]),
        ];
        let second = vec![vote("carol", &[(1, "m1")]), vote("alice", &[(1, "m1")])];
        let events = vec![event("ev1", 1, first), event("ev2", 1, second)];

        let board = fold_leaderboard(&events);
        let order: Vec<&str> = board
            .entries
            .iter()
            .map(|e| e.participant_id.as_str())
            .collect();

        // carol 100% over 2, bob and zed 100% over 1 (by id), alice 50%.
        assert_eq!(order, vec!["carol", "bob", "zed", "alice"]);
        assert_eq!(board.total_completed_events, 2);
    }

    #[test]
    fn test_display_name_from_latest_ballot() {
        let now = Utc::now();
        let mut old = vote("alice", &[(1, "m1")]);
        old.display_name = Some("Al".to_string());
        old.updated_at = (now - Duration::days(7)).into();
        let mut new = vote("alice", &[(1, "m1")]);
        new.display_name = Some("Alice".to_string());
        new.updated_at = now.into();

        let board = fold_leaderboard(&[event("ev2", 3, vec![new]), event("ev1", 3, vec![old])]);

        assert_eq!(row(&board, "alice").display_name.as_deref(), Some("Alice"));
        assert_eq!(row(&board, "alice").participation_count, 2);
    }

    #[tokio::test]
    async fn test_build_groups_rows_by_event() {
        let survey = voting_event::Model {
            id: "ev1".to_string(),
            kind: EventKind::Survey,
            title: "Noir".to_string(),
            description: None,
            state: EventState::Frozen,
            max_rank_n: 2,
            archived: false,
            created_by: None,
            created_at: Utc::now().into(),
            updated_at: None,
            live_at: None,
            frozen_at: None,
            closed_at: None,
        };
        let entry = |movie_id: &str| event_entry::Model {
            id: format!("entry-{movie_id}"),
            event_id: "ev1".to_string(),
            movie_id: movie_id.to_string(),
            title: movie_id.to_string(),
            tmdb_id: 1,
            poster_path: None,
            added_by: None,
            created_at: Utc::now().into(),
            removed_at: None,
        };
        let mut ballot = vote("alice", &[(2, "m1")]);
        ballot.event_id = "ev1".to_string();

        let db: DatabaseConnection = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[survey]])
            .append_query_results([vec![entry("m1"), entry("m2")]])
            .append_query_results([[ballot]])
            .into_connection();
        let db = Arc::new(db);
        let service = LeaderboardService::new(
            VotingEventRepository::new(db.clone()),
            EventEntryRepository::new(db.clone()),
            BallotRepository::new(db),
            VotingConfig::default(),
        );

        let board = service.build().await.unwrap();

        assert_eq!(board.total_completed_events, 1);
        assert_eq!(row(&board, "alice").oracle_points_earned, 1);
        assert_eq!(row(&board, "alice").oracle_points_possible, 2);
        assert_eq!(row(&board, "alice").accuracy_percent, 50.0);
    }
}
