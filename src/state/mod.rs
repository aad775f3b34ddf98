pub mod catalog;
pub mod phase;
pub mod registry;
pub mod session;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use time::OffsetDateTime;
use tokio::sync::{RwLock, mpsc};

use crate::config::AppConfig;
use crate::upstream::{CredentialVerifier, EventCatalog, PointsSink, QuestionBank};

pub use self::catalog::{EventEntry, EventStatus};
pub use self::phase::{InvalidTransition, ShowEvent, ShowPhase, ShowStateMachine};
pub use self::registry::{ConnectionId, PlayerId, PlayerRegistry};
pub use self::session::{Session, SessionTable};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Handle used to push messages to a connected client.
#[derive(Clone)]
pub struct ClientConnection {
    /// Connection identifier the client is registered under.
    pub id: ConnectionId,
    /// Writer channel draining into the client's WebSocket.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Half-open interval during which join requests for the current room are
/// accepted: `[opens_at, closes_at)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinWindow {
    /// First instant at which a join is accepted.
    pub opens_at: OffsetDateTime,
    /// First instant at which a join is rejected as closed; equals game start.
    pub closes_at: OffsetDateTime,
}

impl JoinWindow {
    /// Whether `now` falls inside the window.
    pub fn contains(&self, now: OffsetDateTime) -> bool {
        now >= self.opens_at && now < self.closes_at
    }
}

/// Mutable show bookkeeping guarded by one lock so the join hot path reads a
/// consistent snapshot.
#[derive(Debug, Default)]
struct ShowState {
    machine: ShowStateMachine,
    current_event: Option<String>,
    room_code: Option<String>,
    window: Option<JoinWindow>,
}

/// Consistent view of the show taken under the lock.
#[derive(Debug, Clone)]
pub struct ShowSnapshot {
    /// Phase at snapshot time.
    pub phase: ShowPhase,
    /// Identifier of the current event, once announced.
    pub current_event: Option<String>,
    /// Room code of the scheduled or live room.
    pub room_code: Option<String>,
    /// Join window of the scheduled or live room.
    pub window: Option<JoinWindow>,
}

/// Central application state: connections, the player registry, the session
/// table, the event catalog cache, and the upstream collaborators.
pub struct AppState {
    config: AppConfig,
    clients: DashMap<ConnectionId, ClientConnection>,
    registry: PlayerRegistry,
    sessions: SessionTable,
    catalog: RwLock<Vec<EventEntry>>,
    show: RwLock<ShowState>,
    events_api: Arc<dyn EventCatalog>,
    questions_api: Arc<dyn QuestionBank>,
    points_api: Arc<dyn PointsSink>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl AppState {
    /// Construct the state wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        events_api: Arc<dyn EventCatalog>,
        questions_api: Arc<dyn QuestionBank>,
        points_api: Arc<dyn PointsSink>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> SharedState {
        Arc::new(Self {
            config,
            clients: DashMap::new(),
            registry: PlayerRegistry::new(),
            sessions: SessionTable::new(),
            catalog: RwLock::new(Vec::new()),
            show: RwLock::new(ShowState::default()),
            events_api,
            questions_api,
            points_api,
            verifier,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registry of connected client sockets keyed by connection identifier.
    pub fn clients(&self) -> &DashMap<ConnectionId, ClientConnection> {
        &self.clients
    }

    /// Authority for the connection-to-player relation.
    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    /// Table of live sessions keyed by room code.
    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Source of upcoming quiz events.
    pub fn events_api(&self) -> Arc<dyn EventCatalog> {
        self.events_api.clone()
    }

    /// Source of question sets.
    pub fn questions_api(&self) -> Arc<dyn QuestionBank> {
        self.questions_api.clone()
    }

    /// Sink for final per-player results.
    pub fn points_api(&self) -> Arc<dyn PointsSink> {
        self.points_api.clone()
    }

    /// Pluggable credential verifier consulted on join.
    pub fn verifier(&self) -> Arc<dyn CredentialVerifier> {
        self.verifier.clone()
    }

    /// Copy of the cached event catalog.
    pub async fn catalog_snapshot(&self) -> Vec<EventEntry> {
        self.catalog.read().await.clone()
    }

    /// Replace the cached event catalog wholesale.
    pub async fn replace_catalog(&self, entries: Vec<EventEntry>) {
        let mut catalog = self.catalog.write().await;
        *catalog = entries;
    }

    /// Advance the status of one catalog entry.
    pub async fn update_event_status(&self, event_id: &str, status: EventStatus) {
        let mut catalog = self.catalog.write().await;
        if let Some(entry) = catalog.iter_mut().find(|entry| entry.id == event_id) {
            entry.status = status;
        }
    }

    /// Refresh the player-count snapshot of one catalog entry.
    pub async fn set_event_player_count(&self, event_id: &str, count: usize) {
        let mut catalog = self.catalog.write().await;
        if let Some(entry) = catalog.iter_mut().find(|entry| entry.id == event_id) {
            entry.player_count = count;
        }
    }

    /// Consistent view of the show bookkeeping.
    pub async fn show_snapshot(&self) -> ShowSnapshot {
        let show = self.show.read().await;
        ShowSnapshot {
            phase: show.machine.phase(),
            current_event: show.current_event.clone(),
            room_code: show.room_code.clone(),
            window: show.window,
        }
    }

    /// Current phase of the show state machine.
    pub async fn show_phase(&self) -> ShowPhase {
        self.show.read().await.machine.phase()
    }

    /// Room code join and submit requests are validated against.
    pub async fn current_room_code(&self) -> Option<String> {
        self.show.read().await.room_code.clone()
    }

    /// Identifier of the current event, once announced.
    pub async fn current_event_id(&self) -> Option<String> {
        self.show.read().await.current_event.clone()
    }

    /// Install the room code and join window computed at scheduling time.
    pub async fn arm_room(&self, room_code: String, window: JoinWindow) {
        let mut show = self.show.write().await;
        show.room_code = Some(room_code);
        show.window = Some(window);
    }

    /// Make an event the current one, as of its announce trigger.
    pub async fn set_current_event(&self, event_id: String) {
        let mut show = self.show.write().await;
        show.current_event = Some(event_id);
    }

    /// Apply an event to the show state machine.
    pub async fn apply_show_event(
        &self,
        event: ShowEvent,
    ) -> Result<ShowPhase, InvalidTransition> {
        let mut show = self.show.write().await;
        show.machine.apply(event)
    }

    /// Clear the room code and window and collapse the machine to idle,
    /// keeping the current event. Used when the room empties before game end.
    pub async fn clear_room(&self) {
        let mut show = self.show.write().await;
        show.room_code = None;
        show.window = None;
        if show.machine.phase() != ShowPhase::Idle {
            let _ = show.machine.apply(ShowEvent::Reset);
        }
    }

    /// Reset every piece of show bookkeeping to idle at end of game.
    pub async fn reset_show(&self) {
        let mut show = self.show.write().await;
        show.room_code = None;
        show.window = None;
        show.current_event = None;
        if show.machine.phase() != ShowPhase::Idle {
            let _ = show.machine.apply(ShowEvent::Reset);
        }
    }
}
