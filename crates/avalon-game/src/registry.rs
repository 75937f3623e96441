//! Game registry: creates, tracks, and discards session actors.

use std::collections::HashMap;

use avalon_protocol::{ConnectionHandle, GameId};

use crate::actor::spawn_session;
use crate::{GameConfig, GameError, GameSession, SessionHandle};

/// All live sessions, keyed by game id.
///
/// The registry only holds actor handles. Session state lives in each
/// actor, so a lock around the registry never covers game logic.
///
/// Must be used inside a Tokio runtime: [`create`](Self::create) spawns
/// a task.
pub struct GameRegistry {
    sessions: HashMap<GameId, SessionHandle>,
    next_id: u64,
    config: GameConfig,
}

impl GameRegistry {
    /// Creates an empty registry whose sessions use `config`.
    pub fn new(config: GameConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            next_id: 1,
            config: config.validated(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Opens a new lobby hosted by `host` and returns its id.
    ///
    /// Ids increase monotonically and are never reused by this registry.
    pub fn create(&mut self, host: ConnectionHandle, host_name: impl Into<String>) -> GameId {
        let game_id = GameId(self.next_id);
        self.next_id += 1;

        let session = GameSession::new(game_id, host.clone(), host_name, self.config.clone());
        let handle = spawn_session(session, self.config.command_buffer);
        self.sessions.insert(game_id, handle);
        tracing::info!(%game_id, %host, "game created");
        game_id
    }

    /// Returns a handle to a live session.
    ///
    /// # Errors
    /// [`GameError::GameNotFound`] if no session has this id.
    pub fn get(&self, game_id: GameId) -> Result<SessionHandle, GameError> {
        self.sessions
            .get(&game_id)
            .cloned()
            .ok_or(GameError::GameNotFound(game_id))
    }

    /// Forgets a session and returns its handle.
    ///
    /// Does not wait on the actor, so it is safe to call under a lock
    /// shared by every game. The actor stops once the returned handle is
    /// [shut down](SessionHandle::shutdown), or when the last clone of it
    /// is dropped.
    ///
    /// # Errors
    /// [`GameError::GameNotFound`] if no session has this id.
    pub fn remove(&mut self, game_id: GameId) -> Result<SessionHandle, GameError> {
        let handle = self
            .sessions
            .remove(&game_id)
            .ok_or(GameError::GameNotFound(game_id))?;
        tracing::info!(%game_id, "game removed");
        Ok(handle)
    }

    pub fn contains(&self, game_id: GameId) -> bool {
        self.sessions.contains_key(&game_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Ids of all live sessions, in no particular order.
    pub fn ids(&self) -> Vec<GameId> {
        self.sessions.keys().copied().collect()
    }
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}
