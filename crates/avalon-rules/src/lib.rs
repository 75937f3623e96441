//! Ruleset data for Avalon.
//!
//! Pure functions only: nothing here owns state or a random source.
//! Callers pass their own [`rand::Rng`] so games stay reproducible under a
//! seeded generator.
//!
//! # Key items
//!
//! - [`Role`] / [`Loyalty`]: what a player is dealt
//! - [`required_team_size`] / [`quest_fails`]: the canonical quest table
//! - [`deal_roles`] / [`pick_leader`]: shuffling and the first leader

mod deal;
mod role;
mod table;

pub use deal::{deal_roles, pick_leader};
pub use role::{Loyalty, Role};
pub use table::{
    MAX_PLAYERS, MIN_PLAYERS, ROUNDS, evil_count, fails_required, good_count,
    quest_fails, required_team_size,
};
