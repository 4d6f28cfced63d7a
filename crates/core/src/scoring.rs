//! Ranked-ballot scoring.
//!
//! Pure functions only: no I/O, no clock, no randomness. The same ballots
//! and movies always produce the same standings, which is what lets the
//! leaderboard re-derive winners of past events on every call.

use std::cmp::Ordering;
use std::collections::HashMap;

use reelvote_db::entities::ballot::RankedPicks;
use reelvote_db::entities::event_entry;
use serde::{Deserialize, Serialize};

/// A movie as seen by the engine. Supplied by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRef {
    pub id: String,
    pub title: String,
    pub tmdb_id: i64,
    pub poster_path: Option<String>,
}

impl From<&event_entry::Model> for MovieRef {
    fn from(entry: &event_entry::Model) -> Self {
        Self {
            id: entry.movie_id.clone(),
            title: entry.title.clone(),
            tmdb_id: entry.tmdb_id,
            poster_path: entry.poster_path.clone(),
        }
    }
}

/// Computed result for one movie in one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub movie: MovieRef,
    pub total_points: u32,
    /// `rank_counts[i]` is the number of ballots placing the movie at rank `i + 1`.
    pub rank_counts: Vec<u32>,
    /// Competition ranking: equal scores share a position, the next
    /// distinct score skips ahead (1, 1, 3, ...).
    pub position: u32,
    pub tied: bool,
}

impl Standing {
    fn same_score(&self, other: &Self) -> bool {
        self.total_points == other.total_points && self.rank_counts == other.rank_counts
    }
}

/// Points earned by a placement. Rank 1 earns `max_rank_n`, rank
/// `max_rank_n` earns 1, anything out of range earns nothing.
#[must_use]
pub const fn points_for_rank(rank: i32, max_rank_n: i32) -> u32 {
    if rank >= 1 && rank <= max_rank_n {
        (max_rank_n - rank + 1) as u32
    } else {
        0
    }
}

/// Turn ballots into an ordered standings table.
///
/// Every movie in `movies` gets a standing, including ones nobody ranked.
/// Picks with a rank outside `1..=max_rank_n` or a movie not in `movies`
/// are skipped. Ordering: total points, then rank counts from rank 1
/// downward, then title (case-insensitive), then TMDb ID.
pub fn calculate_standings<'a, I>(ballots: I, movies: &[MovieRef], max_rank_n: i32) -> Vec<Standing>
where
    I: IntoIterator<Item = &'a RankedPicks>,
{
    let slots = usize::try_from(max_rank_n).unwrap_or(0);

    let mut standings: Vec<Standing> = Vec::with_capacity(movies.len());
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(movies.len());
    for movie in movies {
        if index.contains_key(movie.id.as_str()) {
            continue;
        }
        index.insert(movie.id.as_str(), standings.len());
        standings.push(Standing {
            movie: movie.clone(),
            total_points: 0,
            rank_counts: vec![0; slots],
            position: 0,
            tied: false,
        });
    }

    for picks in ballots {
        for pick in picks {
            let points = points_for_rank(pick.rank, max_rank_n);
            if points == 0 {
                continue;
            }
            let Some(&i) = index.get(pick.movie_id.as_str()) else {
                continue;
            };
            let standing = &mut standings[i];
            standing.total_points += points;
            standing.rank_counts[(pick.rank - 1) as usize] += 1;
        }
    }

    standings.sort_by(compare_standings);
    assign_positions(&mut standings);

    tracing::trace!(movies = standings.len(), max_rank_n, "Calculated standings");
    standings
}

fn compare_standings(a: &Standing, b: &Standing) -> Ordering {
    b.total_points
        .cmp(&a.total_points)
        .then_with(|| b.rank_counts.cmp(&a.rank_counts))
        .then_with(|| {
            a.movie
                .title
                .to_lowercase()
                .cmp(&b.movie.title.to_lowercase())
        })
        .then_with(|| a.movie.title.cmp(&b.movie.title))
        .then_with(|| a.movie.tmdb_id.cmp(&b.movie.tmdb_id))
        .then_with(|| a.movie.id.cmp(&b.movie.id))
}

fn assign_positions(standings: &mut [Standing]) {
    for i in 0..standings.len() {
        let position = if i > 0 && standings[i].same_score(&standings[i - 1]) {
            standings[i - 1].position
        } else {
            (i + 1) as u32
        };
        standings[i].position = position;
    }

    for i in 0..standings.len() {
        let with_prev = i > 0 && standings[i].same_score(&standings[i - 1]);
        let with_next = i + 1 < standings.len() && standings[i].same_score(&standings[i + 1]);
        standings[i].tied = with_prev || with_next;
    }
}

/// Movies sharing first place. Empty when nobody scored any points.
#[must_use]
pub fn winners(standings: &[Standing]) -> Vec<&Standing> {
    standings
        .iter()
        .filter(|s| s.position == 1 && s.total_points > 0)
        .collect()
}
