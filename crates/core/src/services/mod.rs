//! Business logic services.

#![allow(missing_docs)]

pub mod ballot;
pub mod event_maintenance;
pub mod leaderboard;
pub mod standings;
pub mod voting_event;

pub use ballot::{BallotService, Participant};
pub use event_maintenance::EventMaintenanceService;
pub use leaderboard::{Leaderboard, LeaderboardEntry, LeaderboardService};
pub use standings::{EventResults, StandingsService};
pub use voting_event::{CreateEventInput, UpdateEventInput, VotingEventService};
