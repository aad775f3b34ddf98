use tracing::debug;

use crate::dto::ws::ServerMessage;
use crate::services::ws_events;
use crate::state::{ConnectionId, SharedState};

/// Record one answer submission for the current question.
///
/// Ignored outright when the room code does not match the current room, no
/// session exists, or the connection never joined. A player's second
/// submission for the same question is silently dropped; the first one is
/// scored on exact equality with the correct answer and acknowledged with a
/// private running-score update.
pub async fn submit_answer(
    state: &SharedState,
    connection: ConnectionId,
    room_code: &str,
    answer: &str,
) {
    let Some(current_code) = state.current_room_code().await else {
        return;
    };
    if current_code != room_code {
        return;
    }
    let Some(player_id) = state.registry().resolve(&connection) else {
        debug!(connection = %connection, "submission from an unjoined connection; ignoring");
        return;
    };

    let updated = state
        .sessions()
        .with_room_mut(&current_code, |session| {
            if session.has_answered(&player_id) {
                debug!(player = %player_id, "player already answered this question");
                return None;
            }
            let correct = session
                .current_question()
                .is_some_and(|question| question.correct_answer == answer);
            Some(session.record_answer(&player_id, correct))
        })
        .await
        .flatten();

    if let Some(score) = updated {
        debug!(player = %player_id, score, "answer recorded");
        ws_events::send_to_connection(state, &connection, &ServerMessage::ScoreUpdate { score });
    }
}
