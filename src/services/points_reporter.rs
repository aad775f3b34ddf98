use std::collections::HashSet;

use tracing::warn;

use crate::state::registry::{ConnectionId, PlayerHandle};
use crate::state::{Session, SharedState};
use crate::upstream::PlayerResult;

/// Fan final scores out to the external points service, one request per
/// distinct player identifier, with the credential captured at join time.
///
/// Fire-and-forget: the reporting task runs detached so the end-of-game reset
/// never waits on it, and a failure for one player is logged without
/// affecting the others.
pub fn report_results(
    state: &SharedState,
    session: Option<&Session>,
    roster: &[(ConnectionId, PlayerHandle)],
) {
    let mut seen = HashSet::new();
    let results: Vec<PlayerResult> = roster
        .iter()
        .filter_map(|(_, handle)| {
            if !seen.insert(handle.player_id.clone()) {
                return None;
            }
            let score = session
                .and_then(|session| session.scores.get(&handle.player_id).copied())
                .unwrap_or(0);
            Some(PlayerResult {
                player_id: handle.player_id.clone(),
                game_id: handle.context.game_id.clone(),
                event_id: handle.context.event_id.clone(),
                score,
                point: score,
                credential: handle.context.credential.clone(),
            })
        })
        .collect();

    if results.is_empty() {
        return;
    }

    let api = state.points_api();
    tokio::spawn(async move {
        for result in results {
            let player_id = result.player_id.clone();
            if let Err(err) = api.report(result).await {
                warn!(player = %player_id, error = %err, "points report failed");
            }
        }
    });
}
