//! Database entities.

#![allow(missing_docs)]

pub mod ballot;
pub mod ballot_change_log;
pub mod event_entry;
pub mod voting_event;

pub use ballot::Entity as Ballot;
pub use ballot_change_log::Entity as BallotChangeLog;
pub use event_entry::Entity as EventEntry;
pub use voting_event::Entity as VotingEvent;
