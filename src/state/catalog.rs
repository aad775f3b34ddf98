use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::upstream::CatalogEvent;

/// Lifecycle status of a catalog event, advanced by the phase scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Scheduled but its start time has not been reached.
    Waiting,
    /// Start time reached; the join window opens shortly.
    Starting,
    /// A session for this event is live.
    Hosting,
    /// The game for this event finished.
    Ended,
}

/// A catalog event wrapped with the local status and player-count snapshot.
///
/// Entries live until the next catalog refresh replaces them.
#[derive(Debug, Clone)]
pub struct EventEntry {
    /// Upstream identifier of the event.
    pub id: String,
    /// Display name shown to clients.
    pub name: String,
    /// Scheduled start time.
    pub starts_at: OffsetDateTime,
    /// Local lifecycle status.
    pub status: EventStatus,
    /// Snapshot of the live player count while this event is current.
    pub player_count: usize,
}

impl From<CatalogEvent> for EventEntry {
    fn from(event: CatalogEvent) -> Self {
        Self {
            id: event.id,
            name: event.name,
            starts_at: event.starts_at,
            status: EventStatus::Waiting,
            player_count: 0,
        }
    }
}
