//! Voting engine for movie-night surveys and polls.

pub mod lifecycle;
pub mod scoring;
pub mod services;

pub use scoring::{MovieRef, Standing};
pub use services::*;
