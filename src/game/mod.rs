//! Game simulation modules

pub mod combat;
pub mod controller;
pub mod engine;
pub mod entities;
pub mod input;
pub mod r#match;
pub mod physics;
pub mod reporter;
pub mod session;
pub mod snapshot;
pub mod spawn;
pub mod tuning;

pub use r#match::{GameMatch, MatchCanceller, MatchConfig, MatchExit, MatchHandle, MatchRegistry};
pub use reporter::{SessionBackend, SessionReporter};
