use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::dto::ws::QuestionDigest;
use crate::error::ServiceError;
use crate::services::{scheduler, ws_events};
use crate::state::{EventEntry, SharedState};
use crate::upstream::CatalogEvent;

const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(1_000);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Fetch the event catalog until the first success, then schedule the first
/// upcoming event.
///
/// Retries with exponential backoff and stops after the first successful
/// fetch: re-polling the catalog would re-schedule events that already have
/// timers armed, and duplicate-scheduling prevention belongs to the refresh
/// logic, not to the scheduler.
pub async fn run_catalog_bootstrap(state: SharedState) {
    let mut delay = INITIAL_RETRY_DELAY;

    loop {
        match state.events_api().fetch_events().await {
            Ok(events) => {
                initialize_catalog(&state, events).await;
                return;
            }
            Err(err) => {
                warn!(error = %err, "event catalog fetch failed; retrying");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
            }
        }
    }
}

/// Install the fetched events, filtered to the configured game, and hand the
/// first one to the phase scheduler.
async fn initialize_catalog(state: &SharedState, events: Vec<CatalogEvent>) {
    let game_name = &state.config().game_name;
    let entries: Vec<EventEntry> = events
        .into_iter()
        .filter(|event| event.game_name == *game_name)
        .map(EventEntry::from)
        .collect();

    info!(count = entries.len(), game = %game_name, "event catalog initialised");
    let first = entries.first().cloned();
    state.replace_catalog(entries).await;
    ws_events::broadcast_catalog(state).await;

    match first {
        Some(entry) => scheduler::schedule_event(state, entry.id, entry.starts_at).await,
        None => info!(game = %game_name, "no matching events in catalog; nothing to schedule"),
    }
}

/// Build the question-count digest for one event.
///
/// Reveals text and option counts only, never the options or correct answers.
pub async fn questions_digest(
    state: &SharedState,
    event_id: String,
) -> Result<Vec<QuestionDigest>, ServiceError> {
    let records = state.questions_api().fetch_questions(event_id).await?;
    Ok(records
        .into_iter()
        .map(|record| QuestionDigest {
            text: record.text,
            answer_count: record.options.len(),
        })
        .collect())
}
