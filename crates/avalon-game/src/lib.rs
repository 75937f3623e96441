//! Game sessions for Avalon.
//!
//! Each game is a [`GameSession`] state machine owned by its own Tokio
//! task (actor), reached through a [`SessionHandle`]. The
//! [`GameRegistry`] creates those actors and looks them up by id.
//!
//! # Key types
//!
//! - [`GameSession`]: rules, phases, and all per-game state
//! - [`SessionHandle`]: send commands to a running session actor
//! - [`GameRegistry`]: create/get/remove sessions
//! - [`Phase`]: where in a round the game is
//! - [`GameConfig`]: player limits, rejection cap, RNG seed

mod actor;
mod config;
mod error;
mod event;
mod registry;
mod session;

pub use actor::{Applied, SessionHandle};
pub use config::{GameConfig, Phase};
pub use error::GameError;
pub use event::{Action, GameEvent, GameOverReason, GameSnapshot, PlayerSummary, PlayerView};
pub use registry::GameRegistry;
pub use session::{GameSession, Player};

pub use avalon_rules::{Loyalty, Role};
