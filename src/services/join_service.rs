use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::dto::unix_millis;
use crate::dto::ws::{JoinRoomRequest, ServerMessage};
use crate::services::ws_events;
use crate::state::registry::PlayerContext;
use crate::state::{ConnectionId, SharedState, ShowPhase};

const PLAYER_ID_LENGTH: usize = 6;

const NOT_READY_MESSAGE: &str = "The room is not ready for joining yet. Please wait.";
const CLOSED_MESSAGE: &str = "The game has already started. You cannot join at this time.";
const NO_ACTIVE_GAME_MESSAGE: &str = "There is no active game at the moment.";

/// Handle one join attempt against the current room and join window.
///
/// Outcomes, in order: a mismatched code gets the current code back; a
/// request before the window opens gets "not ready"; at or past the close
/// boundary gets "closed"; otherwise the player is registered, seeded into
/// the session when one exists, and the room and audience are notified.
pub async fn handle_join(state: &SharedState, connection: ConnectionId, request: JoinRoomRequest) {
    let now = OffsetDateTime::now_utc();
    let show = state.show_snapshot().await;

    let Some(current_code) = show.room_code else {
        ws_events::send_to_connection(state, &connection, &ServerMessage::RoomNotFound);
        return;
    };

    if request.room_code != current_code {
        debug!(
            connection = %connection,
            requested = %request.room_code,
            "join with stale room code; sending current one"
        );
        ws_events::send_to_connection(
            state,
            &connection,
            &ServerMessage::RoomCodeUpdated {
                room_code: Some(current_code),
            },
        );
        return;
    }

    let Some(window) = show.window else {
        // A room code without a window means scheduling is mid-flight.
        ws_events::send_to_connection(state, &connection, &ServerMessage::RoomNotFound);
        return;
    };

    if now < window.opens_at {
        ws_events::send_to_connection(
            state,
            &connection,
            &ServerMessage::RoomNotReady {
                message: NOT_READY_MESSAGE.into(),
            },
        );
        return;
    }

    if now >= window.closes_at {
        ws_events::send_to_connection(
            state,
            &connection,
            &ServerMessage::RoomClosed {
                message: CLOSED_MESSAGE.into(),
            },
        );
        return;
    }

    // The window can claim the game is live before the game-start trigger has
    // constructed the session; treat that gap as closed rather than touching
    // a session that is not there.
    if show.phase == ShowPhase::Hosting && !state.sessions().contains(&current_code).await {
        ws_events::send_to_connection(
            state,
            &connection,
            &ServerMessage::RoomClosed {
                message: CLOSED_MESSAGE.into(),
            },
        );
        return;
    }

    if !state.verifier().verify(request.credential.clone()).await {
        ws_events::send_to_connection(
            state,
            &connection,
            &ServerMessage::GameError {
                message: "Credential rejected.".into(),
            },
        );
        return;
    }

    let player_id = request
        .player_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generate_player_id);

    state.registry().register(
        connection,
        player_id.clone(),
        PlayerContext {
            event_id: request.event_id,
            game_id: request.game_id,
            credential: request.credential,
        },
    );
    // The session only exists once the game-start trigger has fired; joins
    // made during the window are seeded into it at construction time instead.
    let _ = state
        .sessions()
        .with_room_mut(&current_code, |session| {
            session.join(connection, player_id.clone());
        })
        .await;

    let count = state.registry().len();
    info!(connection = %connection, player = %player_id, count, "player joined room");

    ws_events::send_to_connection(
        state,
        &connection,
        &ServerMessage::RoomJoined {
            room_code: current_code.clone(),
            player_id: player_id.clone(),
        },
    );
    if let Some(event_id) = show.current_event {
        state.set_event_player_count(&event_id, count).await;
        ws_events::broadcast_catalog(state).await;
    }
    ws_events::broadcast_room(
        state,
        &current_code,
        &ServerMessage::PlayerJoined {
            count,
            player_id: player_id.clone(),
        },
    )
    .await;
    ws_events::broadcast_all(state, &ServerMessage::PlayerCountUpdate { count });
}

/// Reconcile a dropped connection against the registry and the live session.
///
/// Removes the player's score entry when a session exists, and destroys the
/// session and room code outright when the last player leaves; the score
/// table cannot outlive its players.
pub async fn handle_disconnect(state: &SharedState, connection: ConnectionId) {
    let Some(handle) = state.registry().remove(&connection) else {
        return;
    };
    let player_id = handle.player_id;
    let count = state.registry().len();
    info!(connection = %connection, player = %player_id, count, "player left");

    let Some(room_code) = state.current_room_code().await else {
        ws_events::broadcast_all(state, &ServerMessage::PlayerCountUpdate { count });
        return;
    };

    let emptied = state
        .sessions()
        .with_room_mut(&room_code, |session| {
            session.leave(&connection, &player_id)
        })
        .await;

    ws_events::broadcast_room(
        state,
        &room_code,
        &ServerMessage::PlayerLeft {
            count,
            player_id: player_id.clone(),
        },
    )
    .await;
    ws_events::broadcast_all(state, &ServerMessage::PlayerCountUpdate { count });

    if emptied == Some(true) {
        info!(%room_code, "last player left; destroying session");
        state.sessions().remove(&room_code).await;
        state.clear_room().await;
    }
}

/// Answer a status poll the way a join would have been answered, without
/// touching any state.
pub async fn handle_status_poll(state: &SharedState, connection: ConnectionId) {
    let now = OffsetDateTime::now_utc();
    let show = state.show_snapshot().await;

    match (show.room_code, show.window) {
        (Some(room_code), Some(window)) if window.contains(now) => {
            ws_events::send_to_connection(
                state,
                &connection,
                &ServerMessage::GameStarting {
                    room_code,
                    starts_at_ms: unix_millis(window.closes_at),
                },
            );
        }
        (Some(_), Some(window)) if now < window.opens_at => {
            ws_events::send_to_connection(
                state,
                &connection,
                &ServerMessage::RoomNotReady {
                    message: NOT_READY_MESSAGE.into(),
                },
            );
        }
        _ if show.current_event.is_some() => {
            ws_events::send_to_connection(
                state,
                &connection,
                &ServerMessage::RoomClosed {
                    message: CLOSED_MESSAGE.into(),
                },
            );
        }
        _ => {
            ws_events::send_to_connection(
                state,
                &connection,
                &ServerMessage::NoActiveGame {
                    message: NO_ACTIVE_GAME_MESSAGE.into(),
                },
            );
        }
    }
}

/// Reply with the current room code, if any is scheduled.
pub async fn handle_room_code_poll(state: &SharedState, connection: ConnectionId) {
    let room_code = state.current_room_code().await;
    ws_events::send_to_connection(
        state,
        &connection,
        &ServerMessage::CurrentRoomCode { room_code },
    );
}

/// Generate a short player identifier for clients that did not supply one.
fn generate_player_id() -> String {
    Uuid::new_v4().simple().to_string()[..PLAYER_ID_LENGTH].to_uppercase()
}
