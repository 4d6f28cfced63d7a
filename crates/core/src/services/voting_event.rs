//! Voting event service: creation, entries and state transitions.

use chrono::Utc;
use reelvote_common::{AppError, AppResult, IdGenerator, VotingConfig};
use reelvote_db::entities::voting_event::{EventKind, EventState};
use reelvote_db::entities::{event_entry, voting_event};
use reelvote_db::repositories::{EventEntryRepository, ListEventsQuery, VotingEventRepository};
use sea_orm::Set;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::lifecycle;
use crate::scoring::MovieRef;

/// Largest number of ranked slots an event may have.
pub const MAX_RANK_LIMIT: i32 = 10;

// Column widths of `event_entry`.
const MAX_MOVIE_ID_LEN: usize = 64;
const MAX_MOVIE_TITLE_LEN: usize = 512;
const MAX_POSTER_PATH_LEN: usize = 512;
const MAX_ADDED_BY_LEN: usize = 64;

fn validate_movie(movie: &MovieRef, added_by: Option<&str>) -> AppResult<()> {
    if movie.id.trim().is_empty() || movie.title.trim().is_empty() {
        return Err(AppError::Validation(
            "Movie ID and title are required".to_string(),
        ));
    }
    if movie.id.chars().count() > MAX_MOVIE_ID_LEN {
        return Err(AppError::Validation("Movie ID is too long".to_string()));
    }
    if movie.title.chars().count() > MAX_MOVIE_TITLE_LEN {
        return Err(AppError::Validation("Movie title is too long".to_string()));
    }
    if movie
        .poster_path
        .as_ref()
        .is_some_and(|path| path.chars().count() > MAX_POSTER_PATH_LEN)
    {
        return Err(AppError::Validation("Poster path is too long".to_string()));
    }
    if added_by.is_some_and(|id| id.chars().count() > MAX_ADDED_BY_LEN) {
        return Err(AppError::Validation("Added-by ID is too long".to_string()));
    }
    Ok(())
}

/// Input for creating a voting event.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventInput {
    pub kind: EventKind,
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(max = 2048))]
    pub description: Option<String>,
    /// Defaults to the configured `default_max_rank`.
    #[validate(range(min = 1, max = 10))]
    pub max_rank_n: Option<i32>,
    pub created_by: Option<String>,
}

/// Input for updating a voting event.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventInput {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    #[validate(length(max = 2048))]
    pub description: Option<Option<String>>,
    /// Only while the event is still a draft.
    #[validate(range(min = 1, max = 10))]
    pub max_rank_n: Option<i32>,
}

/// Voting event service for business logic.
#[derive(Clone)]
pub struct VotingEventService {
    event_repo: VotingEventRepository,
    entry_repo: EventEntryRepository,
    id_gen: IdGenerator,
    config: VotingConfig,
}

impl VotingEventService {
    /// Create a new voting event service.
    #[must_use]
    pub const fn new(
        event_repo: VotingEventRepository,
        entry_repo: EventEntryRepository,
        config: VotingConfig,
    ) -> Self {
        Self {
            event_repo,
            entry_repo,
            id_gen: IdGenerator::new(),
            config,
        }
    }

    /// Create an event in `draft`.
    pub async fn create_event(&self, input: CreateEventInput) -> AppResult<voting_event::Model> {
        input.validate()?;

        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title cannot be blank".to_string()));
        }

        let max_rank_n = input.max_rank_n.unwrap_or(self.config.default_max_rank);
        if !(1..=MAX_RANK_LIMIT).contains(&max_rank_n) {
            return Err(AppError::Validation(format!(
                "Ranked slots must be between 1 and {MAX_RANK_LIMIT}"
            )));
        }

        let model = voting_event::ActiveModel {
            id: Set(self.id_gen.generate()),
            kind: Set(input.kind),
            title: Set(title.to_string()),
            description: Set(input.description.filter(|d| !d.trim().is_empty())),
            state: Set(EventState::Draft),
            max_rank_n: Set(max_rank_n),
            archived: Set(false),
            created_by: Set(input.created_by),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
            live_at: Set(None),
            frozen_at: Set(None),
            closed_at: Set(None),
        };

        let event = self.event_repo.create(model).await?;
        info!(
            event_id = %event.id,
            kind = event.kind.as_str(),
            max_rank_n = event.max_rank_n,
            "Voting event created"
        );
        Ok(event)
    }

    /// Update title, description or ranked slots.
    ///
    /// Finished events cannot be edited. Ranked slots can only change while
    /// the event is a draft, since ballots are validated against them.
    pub async fn update_event(
        &self,
        event_id: &str,
        input: UpdateEventInput,
    ) -> AppResult<voting_event::Model> {
        input.validate()?;

        let txn = self.event_repo.begin().await?;
        let event = self.event_repo.lock_by_id(&txn, event_id).await?;

        if event.state.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "This {} is {} and can no longer be edited",
                event.kind.as_str(),
                event.state.as_str()
            )));
        }
        if input.max_rank_n.is_some() && event.state != EventState::Draft {
            return Err(AppError::InvalidState(
                "Ranked slots can only change before voting opens".to_string(),
            ));
        }

        let mut active: voting_event::ActiveModel = event.into();
        if let Some(title) = input.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(AppError::Validation("Title cannot be blank".to_string()));
            }
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(description.filter(|d| !d.trim().is_empty()));
        }
        if let Some(max_rank_n) = input.max_rank_n {
            active.max_rank_n = Set(max_rank_n);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.event_repo.update_in(&txn, active).await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(updated)
    }

    /// Move an event to `target`.
    ///
    /// Going live needs at least one movie, and for surveys no other live
    /// survey. The event row and any other live survey are locked for the
    /// whole check-and-set; the partial unique index on live surveys turns
    /// a lost race into [`AppError::Conflict`] as well.
    pub async fn change_state(
        &self,
        event_id: &str,
        target: EventState,
    ) -> AppResult<voting_event::Model> {
        let txn = self.event_repo.begin().await?;
        let event = self.event_repo.lock_by_id(&txn, event_id).await?;

        lifecycle::check_transition(event.kind, event.state, target)?;

        let now = Utc::now();
        let kind = event.kind;
        let from = event.state;
        let mut active: voting_event::ActiveModel = event.into();

        if target == EventState::Live {
            let entries = self.entry_repo.count_active_in(&txn, event_id).await?;
            if entries == 0 {
                return Err(AppError::InvalidState(
                    "Add at least one movie before opening voting".to_string(),
                ));
            }

            if kind.has_single_live_slot() {
                if let Some(live) = self
                    .event_repo
                    .lock_other_live_survey(&txn, event_id)
                    .await?
                {
                    warn!(
                        event_id,
                        live_event_id = %live.id,
                        "Rejected go-live: another survey is live"
                    );
                    return Err(AppError::Conflict(format!(
                        "Survey \"{}\" is already live",
                        live.title
                    )));
                }
            }

            active.live_at = Set(Some(now.into()));
        }

        match target {
            EventState::Frozen => active.frozen_at = Set(Some(now.into())),
            EventState::Closed => active.closed_at = Set(Some(now.into())),
            EventState::Draft | EventState::Live => {}
        }
        active.state = Set(target);
        active.updated_at = Set(Some(now.into()));

        let updated = self
            .event_repo
            .update_in(&txn, active)
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => {
                    warn!(event_id, "Lost go-live race to another survey");
                    AppError::Conflict("Another survey went live at the same time".to_string())
                }
                other => other,
            })?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(
            event_id,
            kind = kind.as_str(),
            from = from.as_str(),
            to = target.as_str(),
            "Voting event state changed"
        );
        Ok(updated)
    }

    /// Archive or unarchive an event. Archived events are hidden from
    /// listings and left out of the leaderboard.
    pub async fn set_archived(
        &self,
        event_id: &str,
        archived: bool,
    ) -> AppResult<voting_event::Model> {
        let event = self.event_repo.get_by_id(event_id).await?;
        if event.archived == archived {
            return Ok(event);
        }

        let mut active: voting_event::ActiveModel = event.into();
        active.archived = Set(archived);
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.event_repo.update(active).await?;
        info!(event_id, archived, "Voting event archive flag changed");
        Ok(updated)
    }

    /// Delete a draft. Events that have been live are history and stay.
    pub async fn delete_event(&self, event_id: &str) -> AppResult<()> {
        let txn = self.event_repo.begin().await?;
        let event = self.event_repo.lock_by_id(&txn, event_id).await?;

        if event.state != EventState::Draft {
            return Err(AppError::InvalidState(
                "Only draft events can be deleted; archive it instead".to_string(),
            ));
        }

        self.event_repo.delete_in(&txn, event_id).await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(event_id, "Draft voting event deleted");
        Ok(())
    }

    /// Attach a movie to an event.
    ///
    /// A movie removed earlier from the same event is restored rather than
    /// duplicated.
    pub async fn add_entry(
        &self,
        event_id: &str,
        movie: MovieRef,
        added_by: Option<&str>,
    ) -> AppResult<event_entry::Model> {
        validate_movie(&movie, added_by)?;

        let txn = self.event_repo.begin().await?;
        let event = self.event_repo.share_lock_by_id(&txn, event_id).await?;
        lifecycle::ensure_entries_mutable(event.state)?;

        let existing = self
            .entry_repo
            .find_by_event_and_movie(&txn, event_id, &movie.id)
            .await?;

        let entry = match existing {
            Some(entry) if entry.is_active() => {
                return Err(AppError::Conflict(format!(
                    "\"{}\" is already part of this event",
                    entry.title
                )));
            }
            Some(entry) => self.entry_repo.restore(&txn, entry).await?,
            None => {
                let model = event_entry::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    event_id: Set(event_id.to_string()),
                    movie_id: Set(movie.id),
                    title: Set(movie.title),
                    tmdb_id: Set(movie.tmdb_id),
                    poster_path: Set(movie.poster_path),
                    added_by: Set(added_by.map(str::to_string)),
                    created_at: Set(Utc::now().into()),
                    removed_at: Set(None),
                };
                self.entry_repo.create(&txn, model).await?
            }
        };

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(event_id, movie_id = %entry.movie_id, "Movie added to event");
        Ok(entry)
    }

    /// Movies attached to an event.
    pub async fn list_entries(
        &self,
        event_id: &str,
        include_removed: bool,
    ) -> AppResult<Vec<event_entry::Model>> {
        self.entry_repo.list_by_event(event_id, include_removed).await
    }

    /// Get an event by ID.
    pub async fn get_event(&self, event_id: &str) -> AppResult<voting_event::Model> {
        self.event_repo.get_by_id(event_id).await
    }

    /// List events, newest first.
    pub async fn list_events(&self, query: &ListEventsQuery) -> AppResult<Vec<voting_event::Model>> {
        self.event_repo.list(query).await
    }

    /// The survey that is currently open, if any.
    pub async fn find_live_survey(&self) -> AppResult<Option<voting_event::Model>> {
        self.event_repo.find_live_survey().await
    }

    /// Polls that are currently open.
    pub async fn list_live_polls(&self) -> AppResult<Vec<voting_event::Model>> {
        self.event_repo.list_live_polls().await
    }
}
