//! `GameServer` builder and shared state.
//!
//! The server is what a transport holds on to: one instance, shared
//! across connection tasks behind an `Arc`.

use avalon_game::{GameConfig, GameRegistry, PlayerView};
use avalon_protocol::{Codec, ConnectionHandle, GameId, JsonCodec};
use tokio::sync::Mutex;

use crate::AvalonError;

/// Builder for a [`GameServer`].
///
/// ```rust
/// use avalon::prelude::*;
///
/// let server = GameServerBuilder::new()
///     .config(GameConfig { max_rejections: 3, ..GameConfig::default() })
///     .build();
/// # let _ = server;
/// ```
pub struct GameServerBuilder {
    config: GameConfig,
}

impl GameServerBuilder {
    pub fn new() -> Self {
        Self {
            config: GameConfig::default(),
        }
    }

    /// Sets the configuration every new game uses.
    pub fn config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds a server speaking JSON.
    pub fn build(self) -> GameServer<JsonCodec> {
        self.build_with_codec(JsonCodec)
    }

    /// Builds a server using `codec` for frames.
    pub fn build_with_codec<C: Codec>(self, codec: C) -> GameServer<C> {
        GameServer {
            registry: Mutex::new(GameRegistry::new(self.config)),
            codec,
        }
    }
}

impl Default for GameServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The command surface for all games on this process.
///
/// The registry lock only guards create/get/remove. Commands run on the
/// session actor after the lock is released, so games never wait on each
/// other.
pub struct GameServer<C: Codec = JsonCodec> {
    pub(crate) registry: Mutex<GameRegistry>,
    pub(crate) codec: C,
}

impl GameServer<JsonCodec> {
    /// Creates a builder.
    pub fn builder() -> GameServerBuilder {
        GameServerBuilder::new()
    }
}

impl<C: Codec> GameServer<C> {
    /// Number of live games.
    pub async fn game_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// One player's private view of a game (their role, and fellow Evil
    /// players if they are Evil).
    pub async fn view(
        &self,
        game_id: GameId,
        viewer: &ConnectionHandle,
    ) -> Result<PlayerView, AvalonError> {
        let session = self.registry.lock().await.get(game_id)?;
        Ok(session.view_for(viewer.clone()).await?)
    }
}
