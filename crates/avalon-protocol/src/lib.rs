//! Wire protocol for the Avalon game server.
//!
//! - **Types** ([`ClientCommand`], [`ServerMessage`], [`Recipient`], ids):
//!   the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those structures
//!   become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about rules or sessions; it only
//! describes what a client may ask for and what the server may answer.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientCommand, ConnectionHandle, GameId, Recipient, ServerMessage};
