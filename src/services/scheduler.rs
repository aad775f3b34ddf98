use rand::Rng;
use time::OffsetDateTime;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::dto::unix_millis;
use crate::dto::ws::ServerMessage;
use crate::error::ServiceError;
use crate::services::{round_service, ws_events};
use crate::state::{EventStatus, JoinWindow, Session, SharedState, ShowEvent, session::Question};

const ROOM_CODE_LENGTH: usize = 6;
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Compute the phase boundaries for an event and arm the three one-shot
/// triggers: announce at the event's start time, join-open one delay later,
/// game-start another delay after that.
///
/// The room code and join window are installed immediately so status polls
/// can already answer. Each trigger revalidates the room before acting, since
/// armed timers cannot be cancelled.
pub async fn schedule_event(state: &SharedState, event_id: String, starts_at: OffsetDateTime) {
    let delay = state.config().join_open_delay;
    let join_opens_at = starts_at + delay;
    let game_starts_at = join_opens_at + delay;

    let room_code = generate_room_code();
    state
        .arm_room(
            room_code.clone(),
            JoinWindow {
                opens_at: join_opens_at,
                closes_at: game_starts_at,
            },
        )
        .await;

    info!(
        event = %event_id,
        %room_code,
        game_starts_at = %game_starts_at,
        "scheduled event phases"
    );
    ws_events::broadcast_all(
        state,
        &ServerMessage::RoomCodeGenerated {
            room_code: room_code.clone(),
        },
    );

    tokio::spawn(run_announce_trigger(
        state.clone(),
        event_id.clone(),
        room_code.clone(),
        starts_at,
    ));
    tokio::spawn(run_open_trigger(
        state.clone(),
        room_code.clone(),
        join_opens_at,
        game_starts_at,
    ));
    tokio::spawn(run_start_trigger(
        state.clone(),
        event_id,
        room_code,
        game_starts_at,
    ));
}

/// Trigger fired at the event's scheduled start time.
async fn run_announce_trigger(
    state: SharedState,
    event_id: String,
    room_code: String,
    at: OffsetDateTime,
) {
    sleep_until(instant_at(at)).await;
    if !room_still_armed(&state, &room_code).await {
        debug!(event = %event_id, "room gone before announce trigger; skipping");
        return;
    }
    if let Err(err) = fire_announce(&state, &event_id).await {
        warn!(event = %event_id, error = %err, "announce trigger failed");
    }
}

/// Trigger fired when the join window opens.
async fn run_open_trigger(
    state: SharedState,
    room_code: String,
    at: OffsetDateTime,
    game_starts_at: OffsetDateTime,
) {
    sleep_until(instant_at(at)).await;
    if !room_still_armed(&state, &room_code).await {
        debug!(%room_code, "room gone before join-open trigger; skipping");
        return;
    }
    if let Err(err) = fire_open(&state, &room_code, game_starts_at).await {
        warn!(%room_code, error = %err, "join-open trigger failed");
    }
}

/// Trigger fired at game start.
async fn run_start_trigger(
    state: SharedState,
    event_id: String,
    room_code: String,
    at: OffsetDateTime,
) {
    sleep_until(instant_at(at)).await;
    if !room_still_armed(&state, &room_code).await {
        debug!(event = %event_id, "room gone before game-start trigger; skipping");
        return;
    }
    if let Err(err) = fire_game_start(&state, &event_id, &room_code).await {
        warn!(event = %event_id, error = %err, "game-start trigger failed");
    }
}

/// Mark the event as starting, make it current, and announce the catalog.
async fn fire_announce(state: &SharedState, event_id: &str) -> Result<(), ServiceError> {
    state.set_current_event(event_id.to_string()).await;
    state
        .update_event_status(event_id, EventStatus::Starting)
        .await;
    state.apply_show_event(ShowEvent::AnnounceEvent).await?;
    ws_events::broadcast_catalog(state).await;
    info!(event = %event_id, "event announced; joining opens shortly");
    Ok(())
}

/// Open the join window, telling the audience the room code and the absolute
/// game start so clients can run their own countdown.
async fn fire_open(
    state: &SharedState,
    room_code: &str,
    game_starts_at: OffsetDateTime,
) -> Result<(), ServiceError> {
    state.apply_show_event(ShowEvent::OpenJoin).await?;
    ws_events::broadcast_all(
        state,
        &ServerMessage::GameStarting {
            room_code: room_code.to_string(),
            starts_at_ms: unix_millis(game_starts_at),
        },
    );
    info!(%room_code, "room open for joining");
    Ok(())
}

/// Fetch the question set, construct the session, and start the rounds.
///
/// A failed or empty fetch still creates the session; the round controller
/// detects the empty question list and ends the game with an error broadcast
/// instead of hanging.
async fn fire_game_start(
    state: &SharedState,
    event_id: &str,
    room_code: &str,
) -> Result<(), ServiceError> {
    let questions: Vec<Question> = match state
        .questions_api()
        .fetch_questions(event_id.to_string())
        .await
    {
        Ok(records) => records.into_iter().map(Into::into).collect(),
        Err(err) => {
            warn!(event = %event_id, error = %err, "question fetch failed; starting with empty set");
            Vec::new()
        }
    };

    // The fetch was a suspension point: the room may have emptied meanwhile.
    if !room_still_armed(state, room_code).await {
        debug!(event = %event_id, "room gone while fetching questions; skipping game start");
        return Ok(());
    }

    let roster = state
        .registry()
        .snapshot()
        .into_iter()
        .map(|(connection, handle)| (connection, handle.player_id));
    let session = Session::new(
        room_code.to_string(),
        event_id.to_string(),
        questions,
        roster,
    );
    let question_count = session.questions.len();
    let player_count = session.scores.len();
    state.sessions().insert(session).await;

    if let Err(err) = state.apply_show_event(ShowEvent::StartGame).await {
        state.sessions().remove(room_code).await;
        return Err(err.into());
    }

    state
        .update_event_status(event_id, EventStatus::Hosting)
        .await;
    ws_events::broadcast_catalog(state).await;
    info!(
        event = %event_id,
        %room_code,
        questions = question_count,
        players = player_count,
        "game starting"
    );

    tokio::spawn(round_service::run_rounds(
        state.clone(),
        room_code.to_string(),
    ));
    Ok(())
}

/// Whether the room a trigger was armed for is still the current one.
async fn room_still_armed(state: &SharedState, room_code: &str) -> bool {
    state.current_room_code().await.as_deref() == Some(room_code)
}

/// Convert an absolute wall-clock target into a timer deadline. Targets in
/// the past fire immediately.
fn instant_at(when: OffsetDateTime) -> Instant {
    let now = OffsetDateTime::now_utc();
    let delay = if when > now {
        std::time::Duration::try_from(when - now).unwrap_or(std::time::Duration::ZERO)
    } else {
        std::time::Duration::ZERO
    };
    Instant::now() + delay
}

/// Generate a short opaque room code.
fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| {
            let index = rng.random_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[index] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::state::{EventEntry, ShowPhase, registry::PlayerContext};
    use crate::testing::{RecordingSink, StubBank, connect_client, recv_json, test_state};
    use crate::upstream::QuestionRecord;

    #[test]
    fn room_codes_have_the_expected_shape() {
        let code = generate_room_code();
        assert_eq!(code.len(), ROOM_CODE_LENGTH);
        assert!(
            code.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn past_targets_fire_immediately() {
        let deadline = instant_at(OffsetDateTime::now_utc() - Duration::from_secs(60));
        assert!(deadline <= Instant::now());
    }

    #[tokio::test(start_paused = true)]
    async fn chained_triggers_drive_a_full_show() {
        let bank = StubBank::with_questions(vec![QuestionRecord {
            text: "Capital of France?".into(),
            options: vec!["Paris".into(), "Lyon".into()],
            correct_answer: "Paris".into(),
        }]);
        let sink = RecordingSink::new();
        let state = test_state(bank, sink.clone());

        let starts_at = OffsetDateTime::now_utc() + Duration::from_secs(60);
        state
            .replace_catalog(vec![EventEntry {
                id: "ev-1".into(),
                name: "Friday Night Trivia".into(),
                starts_at,
                status: crate::state::EventStatus::Waiting,
                player_count: 0,
            }])
            .await;

        let (connection, mut rx) = connect_client(&state);
        schedule_event(&state, "ev-1".into(), starts_at).await;

        // The code is announced at scheduling time.
        let announced = recv_json(&mut rx).await;
        assert_eq!(announced["type"], "room_code_generated");
        let room_code = announced["room_code"].as_str().unwrap().to_string();
        assert_eq!(
            state.current_room_code().await.as_deref(),
            Some(room_code.as_str())
        );

        // Stand in for a join made during the window; the window arithmetic
        // itself is covered by the join service tests.
        state
            .registry()
            .register(connection, "P1".into(), PlayerContext::default());

        // Announce trigger at T.
        let update = recv_json(&mut rx).await;
        assert_eq!(update["type"], "events_update");
        assert_eq!(update["events"][0]["status"], "starting");
        assert_eq!(state.show_phase().await, ShowPhase::Announced);

        // Join-open trigger at T + delay.
        let opening = recv_json(&mut rx).await;
        assert_eq!(opening["type"], "game_starting");
        assert_eq!(opening["room_code"], room_code.as_str());
        let expected_start = unix_millis(starts_at + state.config().join_open_delay * 2);
        assert_eq!(opening["starts_at_ms"], expected_start);

        // Game-start trigger at T + 2 * delay.
        let hosting = recv_json(&mut rx).await;
        assert_eq!(hosting["type"], "events_update");
        assert_eq!(hosting["events"][0]["status"], "hosting");
        assert!(state.sessions().contains(&room_code).await);

        // The round controller takes over from here.
        let question = recv_json(&mut rx).await;
        assert_eq!(question["type"], "new_question");
        assert_eq!(question["text"], "Capital of France?");

        let reveal = recv_json(&mut rx).await;
        assert_eq!(reveal["type"], "question_ended");
        assert_eq!(reveal["correct_answer"], "Paris");

        let game_over = recv_json(&mut rx).await;
        assert_eq!(game_over["type"], "game_over");
        assert_eq!(game_over["score"], 0);
        assert_eq!(game_over["leaderboard"].as_array().unwrap().len(), 1);

        let ended = recv_json(&mut rx).await;
        assert_eq!(ended["type"], "events_update");
        assert_eq!(ended["events"][0]["status"], "ended");

        // Everything collapses back to idle.
        assert_eq!(state.show_phase().await, ShowPhase::Idle);
        assert!(state.current_room_code().await.is_none());
        assert!(state.current_event_id().await.is_none());
        assert!(!state.sessions().contains(&room_code).await);
        assert!(state.registry().is_empty());

        // Reporting runs out-of-band; give the spawned task a tick.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].player_id, "P1");
        assert_eq!(reports[0].score, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_question_fetch_still_creates_the_session_and_ends_with_an_error() {
        let sink = RecordingSink::new();
        let state = test_state(StubBank::failing(), sink.clone());

        let starts_at = OffsetDateTime::now_utc() + Duration::from_secs(30);
        let (connection, mut rx) = connect_client(&state);
        schedule_event(&state, "ev-1".into(), starts_at).await;

        let announced = recv_json(&mut rx).await;
        assert_eq!(announced["type"], "room_code_generated");
        state
            .registry()
            .register(connection, "P1".into(), PlayerContext::default());

        // The session comes up with zero questions and the round controller
        // aborts with an error instead of hanging.
        loop {
            let message = recv_json(&mut rx).await;
            if message["type"] == "game_error" {
                break;
            }
        }
        loop {
            let message = recv_json(&mut rx).await;
            if message["type"] == "game_over" {
                assert_eq!(message["score"], 0);
                assert_eq!(message["leaderboard"][0]["score"], 0);
                break;
            }
        }

        assert_eq!(state.show_phase().await, ShowPhase::Idle);
        assert!(state.current_room_code().await.is_none());

        tokio::time::sleep(Duration::from_millis(10)).await;
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].score, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn triggers_skip_when_the_room_was_torn_down() {
        let bank = StubBank::with_questions(Vec::new());
        let state = test_state(bank, RecordingSink::new());

        let starts_at = OffsetDateTime::now_utc() + Duration::from_secs(60);
        schedule_event(&state, "ev-1".into(), starts_at).await;

        // Simulate every player leaving before the event even starts.
        state.clear_room().await;

        // Let all three triggers elapse; none of them must act.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(state.show_phase().await, ShowPhase::Idle);
        assert!(state.current_event_id().await.is_none());
        assert!(!state.sessions().contains("ignored").await);
    }
}
