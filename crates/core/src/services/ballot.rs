//! Ballot service: submitting, reading and excluding ballots.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use reelvote_common::{AppError, AppResult, IdGenerator};
use reelvote_db::entities::ballot::{ParticipantKind, RankedPick, RankedPicks};
use reelvote_db::entities::ballot_change_log::ChangeReason;
use reelvote_db::entities::voting_event::EventKind;
use reelvote_db::entities::{ballot, ballot_change_log, event_entry};
use reelvote_db::repositories::{
    BallotRepository, ChangeLogRepository, EventEntryRepository, VotingEventRepository,
};
use sea_orm::{ConnectionTrait, DatabaseTransaction, Set};
use serde::Deserialize;
use tracing::{debug, info};

use crate::lifecycle;

const MAX_PARTICIPANT_ID_LEN: usize = 64;
const MAX_DISPLAY_NAME_LEN: usize = 128;

/// The person (or anonymous browser) casting a ballot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub kind: ParticipantKind,
    pub display_name: Option<String>,
}

impl Participant {
    /// A registered user.
    pub fn user(id: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id: id.into(),
            kind: ParticipantKind::User,
            display_name,
        }
    }

    /// An anonymous poll voter identified by a client token.
    pub fn anonymous(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ParticipantKind::Anonymous,
            display_name: None,
        }
    }
}

/// Validate picks against an event and return them normalized.
///
/// Every rank must lie in `1..=max_rank_n` and appear once, every movie
/// must be an active entry and appear once. Surveys accept an empty
/// ballot; polls do not.
pub fn validate_picks(
    kind: EventKind,
    max_rank_n: i32,
    picks: Vec<RankedPick>,
    active_movies: &HashSet<&str>,
) -> AppResult<RankedPicks> {
    if picks.is_empty() && !kind.allows_empty_ballot() {
        return Err(AppError::Validation(
            "Rank at least one movie to vote in a poll".to_string(),
        ));
    }

    let mut seen_ranks = HashSet::new();
    let mut seen_movies = HashSet::new();

    for pick in &picks {
        if !(1..=max_rank_n).contains(&pick.rank) {
            return Err(AppError::Validation(format!(
                "Rank {} is outside 1..={max_rank_n}",
                pick.rank
            )));
        }
        if !seen_ranks.insert(pick.rank) {
            return Err(AppError::Validation(format!(
                "Rank {} is used more than once",
                pick.rank
            )));
        }
        if !active_movies.contains(pick.movie_id.as_str()) {
            return Err(AppError::Validation(format!(
                "Movie {} is not part of this event",
                pick.movie_id
            )));
        }
        if !seen_movies.insert(pick.movie_id.as_str()) {
            return Err(AppError::Validation(format!(
                "Movie {} is ranked more than once",
                pick.movie_id
            )));
        }
    }

    Ok(RankedPicks::new(picks))
}

fn normalize_participant(participant: Participant) -> AppResult<Participant> {
    let id = participant.id.trim().to_string();
    if id.is_empty() {
        return Err(AppError::Validation(
            "Participant ID is required".to_string(),
        ));
    }
    if id.chars().count() > MAX_PARTICIPANT_ID_LEN {
        return Err(AppError::Validation("Participant ID is too long".to_string()));
    }

    let display_name = participant
        .display_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    if display_name
        .as_ref()
        .is_some_and(|name| name.chars().count() > MAX_DISPLAY_NAME_LEN)
    {
        return Err(AppError::Validation("Display name is too long".to_string()));
    }

    Ok(Participant {
        id,
        kind: participant.kind,
        display_name,
    })
}

/// Ballot service for business logic.
#[derive(Clone)]
pub struct BallotService {
    ballot_repo: BallotRepository,
    event_repo: VotingEventRepository,
    entry_repo: EventEntryRepository,
    change_log_repo: ChangeLogRepository,
    id_gen: IdGenerator,
}

impl BallotService {
    /// Create a new ballot service.
    #[must_use]
    pub const fn new(
        ballot_repo: BallotRepository,
        event_repo: VotingEventRepository,
        entry_repo: EventEntryRepository,
        change_log_repo: ChangeLogRepository,
    ) -> Self {
        Self {
            ballot_repo,
            event_repo,
            entry_repo,
            change_log_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create or replace a participant's ballot for a live event.
    ///
    /// The event row is share-locked for the duration, so a freeze or an
    /// entry removal waits for in-flight submissions and every ballot
    /// written before the freeze commits is counted. Each call appends a
    /// change-log entry, even when the picks are unchanged.
    pub async fn submit(
        &self,
        event_id: &str,
        participant: Participant,
        picks: Vec<RankedPick>,
    ) -> AppResult<ballot::Model> {
        let participant = normalize_participant(participant)?;

        let txn = self.ballot_repo.begin().await?;
        let event = self.event_repo.share_lock_by_id(&txn, event_id).await?;
        lifecycle::ensure_accepts_ballots(event.state)?;

        if participant.kind == ParticipantKind::Anonymous && !event.kind.allows_anonymous() {
            return Err(AppError::Validation(
                "Sign in to vote in a survey".to_string(),
            ));
        }

        let entries = self.entry_repo.list_active_in(&txn, event_id).await?;
        let movies = active_movie_ids(&entries);
        let ranks = validate_picks(event.kind, event.max_rank_n, picks, &movies)?;

        let existing = self
            .ballot_repo
            .lock_by_event_and_participant(&txn, event_id, &participant.id)
            .await?;

        let now = Utc::now();
        let (saved, previous) = match existing {
            Some(ballot) => {
                self.overwrite(&txn, ballot, ranks, participant.display_name, now)
                    .await?
            }
            None => {
                let model = ballot::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    event_id: Set(event_id.to_string()),
                    participant_id: Set(participant.id.clone()),
                    participant_kind: Set(participant.kind),
                    display_name: Set(participant.display_name.clone()),
                    ranks: Set(ranks.clone()),
                    disabled: Set(false),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };

                if let Some(created) = self.ballot_repo.insert_if_absent(&txn, model).await? {
                    (created, None)
                } else {
                    // Another submission created the row after our lookup;
                    // its commit is visible now, so lock it and overwrite.
                    debug!(event_id, participant_id = %participant.id, "Concurrent first ballot");
                    let ballot = self
                        .ballot_repo
                        .lock_by_event_and_participant(&txn, event_id, &participant.id)
                        .await?
                        .ok_or_else(|| {
                            AppError::Internal(format!(
                                "Ballot of {} conflicted but cannot be read",
                                participant.id
                            ))
                        })?;
                    self.overwrite(&txn, ballot, ranks, participant.display_name, now)
                        .await?
                }
            }
        };

        self.append_change(&txn, &saved, previous, ChangeReason::ParticipantUpdate, None)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(
            event_id,
            participant_id = %saved.participant_id,
            picks = saved.ranks.len(),
            "Ballot saved"
        );
        Ok(saved)
    }

    /// Get a participant's ballot for an event.
    pub async fn get_ballot(
        &self,
        event_id: &str,
        participant_id: &str,
    ) -> AppResult<Option<ballot::Model>> {
        self.ballot_repo
            .find_by_event_and_participant(event_id, participant_id)
            .await
    }

    /// List ballots of an event.
    pub async fn list_ballots(
        &self,
        event_id: &str,
        include_disabled: bool,
    ) -> AppResult<Vec<ballot::Model>> {
        self.ballot_repo.list_by_event(event_id, include_disabled).await
    }

    /// Number of ballots cast for an event, disabled ones included.
    pub async fn count(&self, event_id: &str) -> AppResult<u64> {
        self.ballot_repo
            .count_by_event(self.event_repo.db(), event_id)
            .await
    }

    /// Exclude a ballot from (or restore it to) standings and the
    /// leaderboard. Only possible while the event is still live.
    pub async fn set_disabled(
        &self,
        event_id: &str,
        participant_id: &str,
        disabled: bool,
    ) -> AppResult<ballot::Model> {
        let txn = self.ballot_repo.begin().await?;
        let event = self.event_repo.share_lock_by_id(&txn, event_id).await?;
        if event.state.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "Ballots of a {} event cannot be changed",
                event.state.as_str()
            )));
        }

        let ballot = self
            .ballot_repo
            .lock_by_event_and_participant(&txn, event_id, participant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ballot of {participant_id}")))?;

        if ballot.disabled == disabled {
            debug!(event_id, participant_id, disabled, "Ballot flag unchanged");
            return Ok(ballot);
        }

        let previous = ballot.ranks.clone();
        let mut active: ballot::ActiveModel = ballot.into();
        active.disabled = Set(disabled);
        active.updated_at = Set(Utc::now().into());
        let saved = self.ballot_repo.update(&txn, active).await?;

        let note = if disabled { "disabled" } else { "enabled" };
        self.append_change(
            &txn,
            &saved,
            Some(previous),
            ChangeReason::System,
            Some(note.to_string()),
        )
        .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(event_id, participant_id, disabled, "Ballot exclusion changed");
        Ok(saved)
    }

    /// Change history for an event, optionally for one participant.
    pub async fn change_log(
        &self,
        event_id: &str,
        participant_id: Option<&str>,
    ) -> AppResult<Vec<ballot_change_log::Model>> {
        self.change_log_repo.list(event_id, participant_id).await
    }

    /// Replace the picks of a locked ballot; returns it with the old picks.
    async fn overwrite(
        &self,
        txn: &DatabaseTransaction,
        ballot: ballot::Model,
        ranks: RankedPicks,
        display_name: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<(ballot::Model, Option<RankedPicks>)> {
        let previous = ballot.ranks.clone();
        let mut active: ballot::ActiveModel = ballot.into();
        active.ranks = Set(ranks);
        if display_name.is_some() {
            active.display_name = Set(display_name);
        }
        active.updated_at = Set(now.into());
        Ok((self.ballot_repo.update(txn, active).await?, Some(previous)))
    }

    async fn append_change<C: ConnectionTrait>(
        &self,
        conn: &C,
        ballot: &ballot::Model,
        previous: Option<RankedPicks>,
        reason: ChangeReason,
        note: Option<String>,
    ) -> AppResult<ballot_change_log::Model> {
        let model = change_entry(&self.id_gen, ballot, previous, reason, note);
        self.change_log_repo.append(conn, model).await
    }
}

/// Build a change-log row for `ballot` as it stands after the change.
pub(crate) fn change_entry(
    id_gen: &IdGenerator,
    ballot: &ballot::Model,
    previous: Option<RankedPicks>,
    reason: ChangeReason,
    note: Option<String>,
) -> ballot_change_log::ActiveModel {
    ballot_change_log::ActiveModel {
        id: Set(id_gen.generate()),
        event_id: Set(ballot.event_id.clone()),
        ballot_id: Set(ballot.id.clone()),
        participant_id: Set(ballot.participant_id.clone()),
        previous_ranks: Set(previous),
        new_ranks: Set(ballot.ranks.clone()),
        reason: Set(reason),
        note: Set(note),
        created_at: Set(Utc::now().into()),
    }
}

/// Active movie IDs of an event.
pub(crate) fn active_movie_ids(entries: &[event_entry::Model]) -> HashSet<&str> {
    entries
        .iter()
        .filter(|e| e.is_active())
        .map(|e| e.movie_id.as_str())
        .collect()
}
