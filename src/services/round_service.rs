use std::collections::HashSet;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::dto::ws::{LeaderboardEntry, ServerMessage};
use crate::services::{points_reporter, ws_events};
use crate::state::{EventStatus, SharedState, ShowEvent, ShowPhase};

/// Number of entries on the final leaderboard.
const LEADERBOARD_LIMIT: usize = 5;

/// What the presenting step found when it looked at the session.
enum PresentCue {
    /// A well-formed question to push to the room.
    Question {
        /// Question text.
        text: String,
        /// Ordered answer options.
        options: Vec<String>,
    },
    /// The question list is exhausted or was empty from the start.
    OutOfQuestions,
    /// The current question lacks text or options.
    Malformed,
}

/// Drive the per-question cycle for a session until the game ends:
/// present, wait out the answer window, reveal, pause, advance.
///
/// Timers are plain sleeps and cannot be cancelled; every step re-checks that
/// the session still exists, since the room can empty out at any point.
pub async fn run_rounds(state: SharedState, room_code: String) {
    loop {
        let cue = state
            .sessions()
            .with_room_mut(&room_code, |session| {
                session.clear_answered();
                match session.current_question() {
                    None => PresentCue::OutOfQuestions,
                    Some(question) if !question.is_well_formed() => PresentCue::Malformed,
                    Some(question) => PresentCue::Question {
                        text: question.text.clone(),
                        options: question.options.clone(),
                    },
                }
            })
            .await;

        match cue {
            None => {
                debug!(%room_code, "session gone before presenting; finishing");
                break;
            }
            Some(PresentCue::OutOfQuestions) => {
                warn!(%room_code, "no questions available; ending game");
                ws_events::broadcast_room(
                    &state,
                    &room_code,
                    &ServerMessage::GameError {
                        message: "No questions are available for this game.".into(),
                    },
                )
                .await;
                break;
            }
            Some(PresentCue::Malformed) => {
                warn!(%room_code, "invalid question data; ending game");
                ws_events::broadcast_room(
                    &state,
                    &room_code,
                    &ServerMessage::GameError {
                        message: "Invalid question data".into(),
                    },
                )
                .await;
                break;
            }
            Some(PresentCue::Question { text, options }) => {
                ws_events::broadcast_room(
                    &state,
                    &room_code,
                    &ServerMessage::NewQuestion { text, options },
                )
                .await;
            }
        }

        // Answers are collected until the deadline; submissions land in the
        // session directly, nothing here blocks on players.
        sleep(state.config().question_time).await;

        let correct = state
            .sessions()
            .with_room(&room_code, |session| {
                session
                    .current_question()
                    .map(|question| question.correct_answer.clone())
            })
            .await;
        match correct {
            Some(Some(correct_answer)) => {
                ws_events::broadcast_room(
                    &state,
                    &room_code,
                    &ServerMessage::QuestionEnded { correct_answer },
                )
                .await;
            }
            Some(None) => {
                warn!(%room_code, "question cursor out of range at reveal; ending game");
                break;
            }
            None => {
                // The room emptied while the answer window ran; the pending
                // deadline has nothing left to reveal.
                debug!(%room_code, "session gone during answer window; standing down");
                return;
            }
        }

        sleep(state.config().question_gap).await;

        match state
            .sessions()
            .with_room_mut(&room_code, |session| session.advance())
            .await
        {
            Some(true) => continue,
            Some(false) => break,
            None => {
                debug!(%room_code, "session gone during pause; finishing");
                break;
            }
        }
    }

    finish_game(&state, &room_code).await;
}

/// End-of-game sequence: leaderboard, per-player delivery, catalog
/// bookkeeping, external reporting, and the reset back to idle.
///
/// Tolerates an already-destroyed session so defensive exits from the round
/// loop land somewhere safe.
async fn finish_game(state: &SharedState, room_code: &str) {
    // Pull the session out first so any still-pending timer sees it gone.
    let session = state.sessions().remove(room_code).await;

    let leaderboard: Vec<LeaderboardEntry> = session
        .as_ref()
        .map(|session| {
            session
                .leaderboard(LEADERBOARD_LIMIT)
                .into_iter()
                .map(Into::into)
                .collect()
        })
        .unwrap_or_default();

    // One game-over per distinct player, even when several connections ended
    // up sharing an identifier.
    let roster = state.registry().snapshot();
    let mut delivered: HashSet<String> = HashSet::new();
    for (connection, handle) in &roster {
        if !delivered.insert(handle.player_id.clone()) {
            continue;
        }
        let score = session
            .as_ref()
            .and_then(|session| session.scores.get(&handle.player_id).copied())
            .unwrap_or(0);
        ws_events::send_to_connection(
            state,
            connection,
            &ServerMessage::GameOver {
                score,
                leaderboard: leaderboard.clone(),
            },
        );
    }
    info!(%room_code, players = delivered.len(), "game over");

    if let Some(event_id) = state.current_event_id().await {
        state
            .update_event_status(&event_id, EventStatus::Ended)
            .await;
        ws_events::broadcast_catalog(state).await;
    }

    points_reporter::report_results(state, session.as_ref(), &roster);

    if state.show_phase().await == ShowPhase::Hosting {
        let _ = state.apply_show_event(ShowEvent::FinishGame).await;
    }
    state.reset_show().await;
    state.registry().clear();
}
