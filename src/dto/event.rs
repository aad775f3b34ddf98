use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{EventEntry, EventStatus};

/// One catalog event as pushed to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventSummary {
    /// Upstream identifier of the event.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Scheduled start time, RFC 3339.
    pub starts_at: String,
    /// Local lifecycle status.
    pub status: EventStatus,
    /// Live player count while the event is current.
    pub player_count: usize,
}

impl From<&EventEntry> for EventSummary {
    fn from(entry: &EventEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            starts_at: super::format_timestamp(entry.starts_at),
            status: entry.status,
            player_count: entry.player_count,
        }
    }
}
