//! # Avalon
//!
//! Server-side rules engine for Avalon-style hidden-role games.
//!
//! A transport accepts connections, gives each one a
//! [`ConnectionHandle`](avalon_protocol::ConnectionHandle), and feeds
//! inbound frames to [`GameServer::handle_frame`]. The returned frames are
//! addressed either to one connection or to a whole game's group.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use avalon::prelude::*;
//!
//! # async fn run() -> Result<(), AvalonError> {
//! let server = GameServer::builder().build();
//! let alice = ConnectionHandle::new("alice-conn");
//!
//! let created = server
//!     .dispatch(&alice, ClientCommand::CreateGame { username: "alice".into() })
//!     .await?;
//! assert_eq!(created.snapshot.phase, Phase::Lobby);
//! # Ok(())
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::AvalonError;
pub use handler::{Dispatch, Membership, Reply, StateUpdate};
pub use server::{GameServer, GameServerBuilder};

pub use avalon_game;
pub use avalon_protocol;
pub use avalon_rules;

/// Convenient imports for transports and tools.
pub mod prelude {
    pub use crate::{AvalonError, Dispatch, GameServer, GameServerBuilder, Membership, Reply, StateUpdate};

    pub use avalon_game::{
        GameConfig, GameError, GameEvent, GameOverReason, GameSnapshot, Phase, PlayerView,
    };
    pub use avalon_protocol::{
        ClientCommand, Codec, ConnectionHandle, GameId, JsonCodec, Recipient, ServerMessage,
    };
    pub use avalon_rules::{Loyalty, Role};
}
