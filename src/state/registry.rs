use dashmap::DashMap;
use uuid::Uuid;

/// Identifier assigned to a live WebSocket connection.
pub type ConnectionId = Uuid;

/// Short identifier naming a player across connections.
///
/// Supplied by the client on join, or generated server-side. Scores are keyed
/// by this value, so a client reconnecting with the same identifier picks up
/// the same score entry.
pub type PlayerId = String;

/// Auxiliary context captured when a player joins, used only when reporting
/// final results to the external points service.
#[derive(Debug, Clone, Default)]
pub struct PlayerContext {
    /// Identifier of the event the player joined for.
    pub event_id: Option<String>,
    /// Identifier of the game/category, passed through to reporting.
    pub game_id: Option<String>,
    /// Opaque bearer credential, passed through unverified.
    pub credential: Option<String>,
}

/// Resolved identity and context for one registered connection.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    /// Stable player identifier the connection resolved to.
    pub player_id: PlayerId,
    /// Context captured at join time.
    pub context: PlayerContext,
}

/// Authority for the connection-to-player relation.
///
/// Many connections may map to the same player identifier over time, but at
/// any instant the relation is one-to-one; the durable player-to-score
/// relation lives in the session's score table.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: DashMap<ConnectionId, PlayerHandle>,
}

impl PlayerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a connection with a player identifier and its join context.
    ///
    /// Re-registering an existing connection replaces its previous identity.
    pub fn register(&self, connection: ConnectionId, player_id: PlayerId, context: PlayerContext) {
        self.players
            .insert(connection, PlayerHandle { player_id, context });
    }

    /// Resolve a connection to its player identifier, if registered.
    pub fn resolve(&self, connection: &ConnectionId) -> Option<PlayerId> {
        self.players
            .get(connection)
            .map(|entry| entry.player_id.clone())
    }

    /// Remove a connection, returning the handle it was registered under.
    pub fn remove(&self, connection: &ConnectionId) -> Option<PlayerHandle> {
        self.players.remove(connection).map(|(_, handle)| handle)
    }

    /// Number of registered (joined) connections, used as the live player count.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True when no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Snapshot every registered connection with its handle.
    pub fn snapshot(&self) -> Vec<(ConnectionId, PlayerHandle)> {
        self.players
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Drop every registration, as part of the end-of-game reset.
    pub fn clear(&self) {
        self.players.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_resolve_remove_roundtrip() {
        let registry = PlayerRegistry::new();
        let connection = Uuid::new_v4();

        assert!(registry.resolve(&connection).is_none());

        registry.register(connection, "AB12CD".into(), PlayerContext::default());
        assert_eq!(registry.resolve(&connection).as_deref(), Some("AB12CD"));
        assert_eq!(registry.len(), 1);

        let handle = registry.remove(&connection).unwrap();
        assert_eq!(handle.player_id, "AB12CD");
        assert!(registry.resolve(&connection).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn reused_player_id_resolves_from_a_new_connection() {
        let registry = PlayerRegistry::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        registry.register(first, "CAFE01".into(), PlayerContext::default());
        registry.remove(&first);

        // A rejoin with the same identifier is a fresh registration.
        registry.register(second, "CAFE01".into(), PlayerContext::default());
        assert_eq!(registry.resolve(&second).as_deref(), Some("CAFE01"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clear_empties_the_registry() {
        let registry = PlayerRegistry::new();
        registry.register(Uuid::new_v4(), "A".into(), PlayerContext::default());
        registry.register(Uuid::new_v4(), "B".into(), PlayerContext::default());

        registry.clear();
        assert!(registry.is_empty());
    }
}
