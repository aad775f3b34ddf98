use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationError;

use crate::dto::event::EventSummary;
use crate::dto::validation::{validate_player_id, validate_room_code};

/// Error raised when an inbound frame cannot be decoded.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The payload was not valid JSON for any known message.
    #[error("malformed message: {0}")]
    Parse(#[from] serde_json::Error),
    /// The payload decoded but carried out-of-bounds fields.
    #[error("invalid message: {0}")]
    Validation(#[from] ValidationError),
}

/// Fields a client presents when asking to join the current room.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct JoinRoomRequest {
    /// Room code the client believes is current.
    pub room_code: String,
    /// Player identifier to rejoin under; generated when absent.
    #[serde(default)]
    pub player_id: Option<String>,
    /// Event identifier, captured for final reporting.
    #[serde(default)]
    pub event_id: Option<String>,
    /// Game/category identifier, captured for final reporting.
    #[serde(default)]
    pub game_id: Option<String>,
    /// Opaque bearer credential, passed through unverified.
    #[serde(default)]
    pub credential: Option<String>,
}

/// Messages accepted from client WebSocket connections.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Ask to join the current room.
    #[serde(rename = "join_room")]
    JoinRoom(JoinRoomRequest),
    /// Submit an answer for the current question.
    #[serde(rename = "submit_answer")]
    SubmitAnswer {
        /// Room code the submission is addressed to.
        room_code: String,
        /// Answer value, compared to the correct answer by equality.
        answer: String,
    },
    /// Request the current event catalog snapshot.
    #[serde(rename = "request_events")]
    RequestEvents,
    /// Request a question-count digest for one event.
    #[serde(rename = "request_event_questions")]
    RequestEventQuestions {
        /// Event to summarise.
        event_id: String,
    },
    /// Poll the live show status.
    #[serde(rename = "check_game_status")]
    CheckGameStatus,
    /// Poll the current room code.
    #[serde(rename = "request_room_code")]
    RequestRoomCode,
    /// Any unrecognised message type; ignored with a warning.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Decode and validate one inbound text frame.
    pub fn from_json_str(payload: &str) -> Result<Self, MessageError> {
        let message: Self = serde_json::from_str(payload)?;
        message.validate()?;
        Ok(message)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::JoinRoom(request) => {
                validate_room_code(&request.room_code)?;
                if let Some(player_id) = request.player_id.as_deref() {
                    validate_player_id(player_id)?;
                }
                Ok(())
            }
            Self::SubmitAnswer { room_code, .. } => validate_room_code(room_code),
            _ => Ok(()),
        }
    }
}

/// One row of the final leaderboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// Player the score belongs to.
    pub player_id: String,
    /// Final score.
    pub score: u32,
}

impl From<(String, u32)> for LeaderboardEntry {
    fn from((player_id, score): (String, u32)) -> Self {
        Self { player_id, score }
    }
}

/// Per-question digest served for catalog browsing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionDigest {
    /// Question text.
    pub text: String,
    /// Number of answer options, without revealing them.
    pub answer_count: usize,
}

/// Messages pushed to client WebSocket connections.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Snapshot of the event catalog.
    #[serde(rename = "events_update")]
    EventsUpdate {
        /// Every cached event with status and player count.
        events: Vec<EventSummary>,
    },
    /// A room code has been generated for the next event.
    #[serde(rename = "room_code_generated")]
    RoomCodeGenerated {
        /// The freshly generated code.
        room_code: String,
    },
    /// Reply to a join with a stale code, carrying the current one.
    #[serde(rename = "room_code_updated")]
    RoomCodeUpdated {
        /// Current room code, absent when nothing is scheduled.
        room_code: Option<String>,
    },
    /// Reply to an explicit room-code poll.
    #[serde(rename = "current_room_code")]
    CurrentRoomCode {
        /// Current room code, absent when nothing is scheduled.
        room_code: Option<String>,
    },
    /// The join window opened; the game starts at the carried instant.
    #[serde(rename = "game_starting")]
    GameStarting {
        /// Code of the now-joinable room.
        room_code: String,
        /// Absolute game start in unix milliseconds, so clients render a
        /// countdown independent of their own clock drift.
        starts_at_ms: i64,
    },
    /// Join accepted.
    #[serde(rename = "room_joined")]
    RoomJoined {
        /// Code of the joined room.
        room_code: String,
        /// Identifier the connection was registered under.
        player_id: String,
    },
    /// Join rejected: the window has not opened yet.
    #[serde(rename = "room_not_ready")]
    RoomNotReady {
        /// Human-readable explanation.
        message: String,
    },
    /// Join rejected: the window has closed.
    #[serde(rename = "room_closed")]
    RoomClosed {
        /// Human-readable explanation.
        message: String,
    },
    /// Join rejected: no room is scheduled at all.
    #[serde(rename = "room_not_found")]
    RoomNotFound,
    /// Status poll found no scheduled or running game.
    #[serde(rename = "no_active_game")]
    NoActiveGame {
        /// Human-readable explanation.
        message: String,
    },
    /// A player entered the room.
    #[serde(rename = "player_joined")]
    PlayerJoined {
        /// Live player count after the join.
        count: usize,
        /// Identifier of the joining player.
        player_id: String,
    },
    /// A player left the room.
    #[serde(rename = "player_left")]
    PlayerLeft {
        /// Live player count after the departure.
        count: usize,
        /// Identifier of the departing player.
        player_id: String,
    },
    /// Live player count, pushed to the whole audience.
    #[serde(rename = "player_count_update")]
    PlayerCountUpdate {
        /// Current live player count.
        count: usize,
    },
    /// A new question is open for answers.
    #[serde(rename = "new_question")]
    NewQuestion {
        /// Question text.
        text: String,
        /// Ordered answer options.
        options: Vec<String>,
    },
    /// The answer window elapsed; the correct answer is revealed.
    #[serde(rename = "question_ended")]
    QuestionEnded {
        /// The correct answer value.
        correct_answer: String,
    },
    /// The submitting player's running score, sent point-to-point.
    #[serde(rename = "score_update")]
    ScoreUpdate {
        /// Running score after the submission.
        score: u32,
    },
    /// The game finished; carries the recipient's own final score.
    #[serde(rename = "game_over")]
    GameOver {
        /// The recipient's final score.
        score: u32,
        /// Ranked top scores.
        leaderboard: Vec<LeaderboardEntry>,
    },
    /// Question-count digest for one event.
    #[serde(rename = "event_questions")]
    EventQuestions {
        /// Event the digest belongs to.
        event_id: String,
        /// One digest per question.
        questions: Vec<QuestionDigest>,
    },
    /// The game hit an unrecoverable condition and is ending.
    #[serde(rename = "game_error")]
    GameError {
        /// Human-readable explanation.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_room_decodes_with_optional_fields_absent() {
        let message =
            ClientMessage::from_json_str(r#"{"type": "join_room", "room_code": "AB12CD"}"#)
                .unwrap();
        match message {
            ClientMessage::JoinRoom(request) => {
                assert_eq!(request.room_code, "AB12CD");
                assert!(request.player_id.is_none());
                assert!(request.credential.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn join_room_with_invalid_player_id_is_rejected() {
        let err = ClientMessage::from_json_str(
            r#"{"type": "join_room", "room_code": "AB12CD", "player_id": "not valid!"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, MessageError::Validation(_)));
    }

    #[test]
    fn unknown_message_types_are_tolerated() {
        let message = ClientMessage::from_json_str(r#"{"type": "dance"}"#).unwrap();
        assert!(matches!(message, ClientMessage::Unknown));
    }

    #[test]
    fn submit_answer_decodes() {
        let message = ClientMessage::from_json_str(
            r#"{"type": "submit_answer", "room_code": "AB12CD", "answer": "Paris"}"#,
        )
        .unwrap();
        assert!(matches!(message, ClientMessage::SubmitAnswer { .. }));
    }

    #[test]
    fn server_messages_serialize_with_a_type_tag() {
        let payload = serde_json::to_value(ServerMessage::PlayerCountUpdate { count: 3 }).unwrap();
        assert_eq!(payload["type"], "player_count_update");
        assert_eq!(payload["count"], 3);
    }
}
