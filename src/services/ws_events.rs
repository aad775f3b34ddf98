use axum::extract::ws::Message;
use tracing::warn;

use crate::dto::event::EventSummary;
use crate::dto::ws::ServerMessage;
use crate::state::{ConnectionId, SharedState};

/// Serialize an outbound message into a WebSocket text frame.
///
/// Serialization failure is a bug in the message definition, not a transport
/// problem; it is logged and the message dropped.
fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(payload) => Some(Message::Text(payload.into())),
        Err(err) => {
            warn!(error = %err, "failed to serialize outbound message `{message:?}`");
            None
        }
    }
}

/// Deliver a message to a single connection.
///
/// A closed writer means the socket died without running its teardown yet;
/// the connection is evicted so later sends stop queueing into the void.
pub fn send_to_connection(state: &SharedState, connection: &ConnectionId, message: &ServerMessage) {
    let Some(frame) = encode(message) else {
        return;
    };
    let Some(tx) = state
        .clients()
        .get(connection)
        .map(|client| client.tx.clone())
    else {
        return;
    };

    if tx.send(frame).is_err() {
        warn!(connection = %connection, "writer closed; evicting client connection");
        state.clients().remove(connection);
    }
}

/// Deliver a message to every connected client.
pub fn broadcast_all(state: &SharedState, message: &ServerMessage) {
    let Some(frame) = encode(message) else {
        return;
    };

    let mut dead = Vec::new();
    for entry in state.clients().iter() {
        if entry.tx.send(frame.clone()).is_err() {
            dead.push(*entry.key());
        }
    }
    for connection in dead {
        warn!(connection = %connection, "writer closed; evicting client connection");
        state.clients().remove(&connection);
    }
}

/// Deliver a message to every connection joined to a room.
///
/// Until the game-start trigger constructs the session, room membership is
/// every connection registered during the join window; afterwards it is the
/// session's connection list.
pub async fn broadcast_room(state: &SharedState, room_code: &str, message: &ServerMessage) {
    let connections = match state
        .sessions()
        .with_room(room_code, |session| session.connections.clone())
        .await
    {
        Some(connections) => connections,
        None => state
            .registry()
            .snapshot()
            .into_iter()
            .map(|(connection, _)| connection)
            .collect(),
    };

    for connection in &connections {
        send_to_connection(state, connection, message);
    }
}

/// Push the current catalog snapshot to the whole audience.
pub async fn broadcast_catalog(state: &SharedState) {
    let events: Vec<EventSummary> = state
        .catalog_snapshot()
        .await
        .iter()
        .map(EventSummary::from)
        .collect();
    broadcast_all(state, &ServerMessage::EventsUpdate { events });
}

/// Send the current catalog snapshot to one connection.
pub async fn send_catalog(state: &SharedState, connection: &ConnectionId) {
    let events: Vec<EventSummary> = state
        .catalog_snapshot()
        .await
        .iter()
        .map(EventSummary::from)
        .collect();
    send_to_connection(state, connection, &ServerMessage::EventsUpdate { events });
}
