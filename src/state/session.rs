use std::collections::HashSet;

use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::state::registry::{ConnectionId, PlayerId};
use crate::upstream::QuestionRecord;

/// One quiz question as served to the room.
///
/// Immutable once loaded into a session; the correct answer is compared to
/// submissions by exact equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Question text pushed to players.
    pub text: String,
    /// Ordered answer options.
    pub options: Vec<String>,
    /// The correct answer value, expected to be one of the options.
    pub correct_answer: String,
}

impl Question {
    /// A question can only be presented when it has text and at least one option.
    pub fn is_well_formed(&self) -> bool {
        !self.text.trim().is_empty() && !self.options.is_empty()
    }
}

impl From<QuestionRecord> for Question {
    fn from(record: QuestionRecord) -> Self {
        Self {
            text: record.text,
            options: record.options,
            correct_answer: record.correct_answer,
        }
    }
}

/// The single live room: question list, progress cursor, score table, and the
/// connections currently joined.
#[derive(Debug, Clone)]
pub struct Session {
    /// Room code clients must present on join and submit.
    pub room_code: String,
    /// Identifier of the catalog event this session hosts.
    pub event_id: String,
    /// Ordered question list fetched at game start.
    pub questions: Vec<Question>,
    /// Index of the question currently being served.
    pub current_index: usize,
    /// Score per player, insertion-ordered so leaderboard ties keep join order.
    pub scores: IndexMap<PlayerId, u32>,
    /// Players who already submitted for the current question.
    pub answered: HashSet<PlayerId>,
    /// Connections currently joined to the room.
    pub connections: Vec<ConnectionId>,
}

impl Session {
    /// Build a session at game start, seeding zero scores and the connection
    /// list from every player registered during the join window.
    pub fn new(
        room_code: String,
        event_id: String,
        questions: Vec<Question>,
        roster: impl IntoIterator<Item = (ConnectionId, PlayerId)>,
    ) -> Self {
        let mut scores = IndexMap::new();
        let mut connections = Vec::new();
        for (connection, player_id) in roster {
            connections.push(connection);
            scores.entry(player_id).or_insert(0);
        }

        Self {
            room_code,
            event_id,
            questions,
            current_index: 0,
            scores,
            answered: HashSet::new(),
            connections,
        }
    }

    /// The question currently being served, if any remain.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    /// Forget who answered, called when a new question is presented.
    pub fn clear_answered(&mut self) {
        self.answered.clear();
    }

    /// Whether the player already submitted for the current question.
    pub fn has_answered(&self, player_id: &str) -> bool {
        self.answered.contains(player_id)
    }

    /// Record a submission for the current question and return the player's
    /// running score. The player is marked as having answered regardless of
    /// correctness; only a correct answer increments the score.
    pub fn record_answer(&mut self, player_id: &PlayerId, correct: bool) -> u32 {
        self.answered.insert(player_id.clone());
        let score = self.scores.entry(player_id.clone()).or_insert(0);
        if correct {
            *score += 1;
        }
        *score
    }

    /// Advance to the next question; `true` while more questions remain.
    pub fn advance(&mut self) -> bool {
        self.current_index += 1;
        self.current_index < self.questions.len()
    }

    /// Attach a connection mid-session, initialising its player's score to
    /// zero when the identifier is new.
    pub fn join(&mut self, connection: ConnectionId, player_id: PlayerId) {
        self.connections.push(connection);
        self.scores.entry(player_id).or_insert(0);
    }

    /// Detach a connection and drop its player's score entry.
    ///
    /// Returns `true` when the room is now empty, in which case the caller
    /// must destroy the session (a session cannot outlive its players).
    pub fn leave(&mut self, connection: &ConnectionId, player_id: &str) -> bool {
        self.connections.retain(|candidate| candidate != connection);
        self.scores.shift_remove(player_id);
        self.connections.is_empty()
    }

    /// Ranked top-`limit` of the score table: stable descending sort, so tied
    /// players appear in the order they first joined.
    pub fn leaderboard(&self, limit: usize) -> Vec<(PlayerId, u32)> {
        let mut entries: Vec<(PlayerId, u32)> = self
            .scores
            .iter()
            .map(|(player, score)| (player.clone(), *score))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(limit);
        entries
    }
}

/// Table of live sessions keyed by room code.
///
/// Only one entry is ever populated today, but handlers address sessions
/// through the table so multi-room support stays an additive change.
#[derive(Debug, Default)]
pub struct SessionTable {
    rooms: RwLock<IndexMap<String, Session>>,
}

impl SessionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a session under its room code.
    pub async fn insert(&self, session: Session) {
        let mut rooms = self.rooms.write().await;
        rooms.insert(session.room_code.clone(), session);
    }

    /// Remove and return the session for a room code.
    pub async fn remove(&self, room_code: &str) -> Option<Session> {
        let mut rooms = self.rooms.write().await;
        rooms.shift_remove(room_code)
    }

    /// Whether a session exists for the room code.
    pub async fn contains(&self, room_code: &str) -> bool {
        let rooms = self.rooms.read().await;
        rooms.contains_key(room_code)
    }

    /// Run a closure against the session for `room_code`, if present.
    pub async fn with_room<F, T>(&self, room_code: &str, f: F) -> Option<T>
    where
        F: FnOnce(&Session) -> T,
    {
        let rooms = self.rooms.read().await;
        rooms.get(room_code).map(f)
    }

    /// Run a mutating closure against the session for `room_code`, if present.
    pub async fn with_room_mut<F, T>(&self, room_code: &str, f: F) -> Option<T>
    where
        F: FnOnce(&mut Session) -> T,
    {
        let mut rooms = self.rooms.write().await;
        rooms.get_mut(room_code).map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn question(text: &str, correct: &str) -> Question {
        Question {
            text: text.into(),
            options: vec!["A".into(), "B".into(), correct.into()],
            correct_answer: correct.into(),
        }
    }

    fn roster(ids: &[&str]) -> Vec<(ConnectionId, PlayerId)> {
        ids.iter().map(|id| (Uuid::new_v4(), id.to_string())).collect()
    }

    #[test]
    fn new_session_seeds_zero_scores_from_roster() {
        let session = Session::new(
            "AAAAAA".into(),
            "ev-1".into(),
            vec![question("q1", "B")],
            roster(&["P1", "P2"]),
        );

        assert_eq!(session.connections.len(), 2);
        assert_eq!(session.scores.get("P1"), Some(&0));
        assert_eq!(session.scores.get("P2"), Some(&0));
        assert_eq!(session.current_index, 0);
    }

    #[test]
    fn record_answer_marks_player_and_scores_only_correct_ones() {
        let mut session = Session::new(
            "AAAAAA".into(),
            "ev-1".into(),
            vec![question("q1", "B")],
            roster(&["P1", "P2"]),
        );

        assert_eq!(session.record_answer(&"P1".to_string(), true), 1);
        assert_eq!(session.record_answer(&"P2".to_string(), false), 0);
        assert!(session.has_answered("P1"));
        assert!(session.has_answered("P2"));

        session.clear_answered();
        assert!(!session.has_answered("P1"));
        // Scores survive the per-question reset.
        assert_eq!(session.scores.get("P1"), Some(&1));
    }

    #[test]
    fn advance_reports_whether_questions_remain() {
        let mut session = Session::new(
            "AAAAAA".into(),
            "ev-1".into(),
            vec![question("q1", "B"), question("q2", "A")],
            roster(&["P1"]),
        );

        assert!(session.advance());
        assert_eq!(session.current_question().map(|q| q.text.as_str()), Some("q2"));
        assert!(!session.advance());
        assert!(session.current_question().is_none());
    }

    #[test]
    fn leave_drops_score_and_reports_empty_room() {
        let connections: Vec<ConnectionId> = vec![Uuid::new_v4(), Uuid::new_v4()];
        let mut session = Session::new(
            "AAAAAA".into(),
            "ev-1".into(),
            vec![question("q1", "B")],
            vec![
                (connections[0], "P1".to_string()),
                (connections[1], "P2".to_string()),
            ],
        );

        assert!(!session.leave(&connections[0], "P1"));
        assert!(session.scores.get("P1").is_none());
        assert!(session.leave(&connections[1], "P2"));
    }

    #[test]
    fn leaderboard_is_stable_descending_top_n() {
        let mut session = Session::new(
            "AAAAAA".into(),
            "ev-1".into(),
            vec![question("q1", "B")],
            roster(&["P1", "P2", "P3", "P4", "P5", "P6"]),
        );
        *session.scores.get_mut("P2").unwrap() = 3;
        *session.scores.get_mut("P4").unwrap() = 3;
        *session.scores.get_mut("P5").unwrap() = 1;

        let board = session.leaderboard(5);
        assert_eq!(board.len(), 5);
        // P2 and P4 tie; insertion order breaks the tie.
        assert_eq!(board[0], ("P2".to_string(), 3));
        assert_eq!(board[1], ("P4".to_string(), 3));
        assert_eq!(board[2], ("P5".to_string(), 1));
        assert_eq!(board[3].1, 0);
        assert_eq!(board[4].1, 0);
    }

    #[test]
    fn leaderboard_with_fewer_players_than_limit() {
        let session = Session::new(
            "AAAAAA".into(),
            "ev-1".into(),
            vec![question("q1", "B")],
            roster(&["P1", "P2"]),
        );

        assert_eq!(session.leaderboard(5).len(), 2);
    }

    #[tokio::test]
    async fn session_table_addresses_rooms_by_code() {
        let table = SessionTable::new();
        let session = Session::new(
            "ZZZZZZ".into(),
            "ev-9".into(),
            Vec::new(),
            roster(&["P1"]),
        );
        table.insert(session).await;

        assert!(table.contains("ZZZZZZ").await);
        assert!(!table.contains("AAAAAA").await);

        let code = table
            .with_room("ZZZZZZ", |room| room.event_id.clone())
            .await;
        assert_eq!(code.as_deref(), Some("ev-9"));

        assert!(table.remove("ZZZZZZ").await.is_some());
        assert!(!table.contains("ZZZZZZ").await);
    }
}
