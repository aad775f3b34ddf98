//! Shared stubs and helpers for exercising services without real upstreams
//! or sockets.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::Message;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::state::{AppState, ClientConnection, ConnectionId, SharedState};
use crate::upstream::{
    AcceptAll, CatalogEvent, EventCatalog, PlayerResult, PointsSink, QuestionBank, QuestionRecord,
    UpstreamError, UpstreamResult,
};

/// Catalog stub serving a fixed event list.
#[derive(Default)]
pub(crate) struct StubCatalog {
    pub(crate) events: Vec<CatalogEvent>,
}

impl EventCatalog for StubCatalog {
    fn fetch_events(&self) -> BoxFuture<'static, UpstreamResult<Vec<CatalogEvent>>> {
        let events = self.events.clone();
        Box::pin(async move { Ok(events) })
    }
}

/// Question bank stub serving a fixed question set, or failing on demand.
pub(crate) struct StubBank {
    questions: Vec<QuestionRecord>,
    fail: bool,
}

impl StubBank {
    pub(crate) fn with_questions(questions: Vec<QuestionRecord>) -> Self {
        Self {
            questions,
            fail: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            questions: Vec::new(),
            fail: true,
        }
    }
}

impl QuestionBank for StubBank {
    fn fetch_questions(
        &self,
        _event_id: String,
    ) -> BoxFuture<'static, UpstreamResult<Vec<QuestionRecord>>> {
        if self.fail {
            return Box::pin(async {
                Err(UpstreamError::request(
                    "stub question bank",
                    std::io::Error::other("bank offline"),
                ))
            });
        }
        let questions = self.questions.clone();
        Box::pin(async move { Ok(questions) })
    }
}

/// Points sink recording every report it receives.
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    reports: Arc<Mutex<Vec<PlayerResult>>>,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reports(&self) -> Vec<PlayerResult> {
        self.reports.lock().unwrap().clone()
    }
}

impl PointsSink for RecordingSink {
    fn report(&self, result: PlayerResult) -> BoxFuture<'static, UpstreamResult<()>> {
        let reports = self.reports.clone();
        Box::pin(async move {
            reports.lock().unwrap().push(result);
            Ok(())
        })
    }
}

/// Configuration with short, test-friendly timings.
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        join_open_delay: Duration::from_secs(5),
        question_time: Duration::from_secs(10),
        question_gap: Duration::from_secs(3),
        ..AppConfig::default()
    }
}

/// Application state wired to stub upstreams.
pub(crate) fn test_state(bank: StubBank, sink: RecordingSink) -> SharedState {
    test_state_with_catalog(StubCatalog::default(), bank, sink)
}

/// Application state wired to stub upstreams, with a preloaded catalog stub.
pub(crate) fn test_state_with_catalog(
    catalog: StubCatalog,
    bank: StubBank,
    sink: RecordingSink,
) -> SharedState {
    AppState::new(
        test_config(),
        Arc::new(catalog),
        Arc::new(bank),
        Arc::new(sink),
        Arc::new(AcceptAll),
    )
}

/// Register a fake client connection and hand back the receiving end of its
/// writer channel so tests can observe everything pushed to it.
pub(crate) fn connect_client(
    state: &SharedState,
) -> (ConnectionId, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = Uuid::new_v4();
    state.clients().insert(id, ClientConnection { id, tx });
    (id, rx)
}

/// Await the next text frame pushed to a fake client and decode it.
pub(crate) async fn recv_json(rx: &mut mpsc::UnboundedReceiver<Message>) -> serde_json::Value {
    loop {
        match rx
            .recv()
            .await
            .expect("writer channel closed while awaiting a message")
        {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("invalid JSON frame");
            }
            _ => continue,
        }
    }
}

/// Decode the next already-queued text frame, if any.
pub(crate) fn try_recv_json(rx: &mut mpsc::UnboundedReceiver<Message>) -> Option<serde_json::Value> {
    loop {
        match rx.try_recv() {
            Ok(Message::Text(text)) => {
                return Some(serde_json::from_str(&text).expect("invalid JSON frame"));
            }
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
}
