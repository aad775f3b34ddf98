//! External collaborators the core calls over HTTP: the event catalog, the
//! question bank, and the points-reporting sink, plus the pluggable
//! credential verifier accepted by the join path.

pub mod catalog;
pub mod points;
pub mod questions;

use std::error::Error;

use futures::future::BoxFuture;
use thiserror::Error;
use time::OffsetDateTime;

pub use self::catalog::HttpEventCatalog;
pub use self::points::HttpPointsSink;
pub use self::questions::HttpQuestionBank;

/// Result alias for upstream calls.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Error raised by upstream collaborators regardless of transport.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request could not be completed.
    #[error("upstream request failed: {message}")]
    Request {
        /// Human-readable description of the failed call.
        message: String,
        /// Transport-level cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl UpstreamError {
    /// Construct a request error from any transport failure.
    pub fn request(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        UpstreamError::Request {
            message: message.into(),
            source: Box::new(source),
        }
    }
}

/// One event as published by the external catalog, already reduced to the
/// fields the core consumes.
#[derive(Debug, Clone)]
pub struct CatalogEvent {
    /// Unique upstream identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Game/category identifier used for filtering.
    pub game_name: String,
    /// Scheduled start time.
    pub starts_at: OffsetDateTime,
}

/// One question record as served by the question bank.
#[derive(Debug, Clone)]
pub struct QuestionRecord {
    /// Question text.
    pub text: String,
    /// Ordered answer options.
    pub options: Vec<String>,
    /// The correct answer value.
    pub correct_answer: String,
}

/// Final result reported for one player when the game ends.
#[derive(Debug, Clone)]
pub struct PlayerResult {
    /// Player identifier the score is keyed by.
    pub player_id: String,
    /// Game/category identifier captured at join time.
    pub game_id: Option<String>,
    /// Event identifier captured at join time.
    pub event_id: Option<String>,
    /// Count of questions answered correctly.
    pub score: u32,
    /// Points awarded, mirroring the score.
    pub point: u32,
    /// Bearer credential captured at join time, passed through unverified.
    pub credential: Option<String>,
}

/// Source of upcoming quiz events.
pub trait EventCatalog: Send + Sync {
    /// Fetch the full event list from the catalog.
    fn fetch_events(&self) -> BoxFuture<'static, UpstreamResult<Vec<CatalogEvent>>>;
}

/// Source of question sets, fetched by event identifier.
///
/// A payload that reports failure or comes back malformed yields an empty
/// list; only transport failures surface as errors, and callers substitute an
/// empty list for those too.
pub trait QuestionBank: Send + Sync {
    /// Fetch the question set for an event.
    fn fetch_questions(
        &self,
        event_id: String,
    ) -> BoxFuture<'static, UpstreamResult<Vec<QuestionRecord>>>;
}

/// Sink receiving one final result per player when a game ends.
pub trait PointsSink: Send + Sync {
    /// Report one player's final result.
    fn report(&self, result: PlayerResult) -> BoxFuture<'static, UpstreamResult<()>>;
}

/// Pluggable verification of the opaque join credential.
///
/// The core accepts a verifier but ships only [`AcceptAll`]; credentials are
/// otherwise passed through untouched.
pub trait CredentialVerifier: Send + Sync {
    /// Decide whether the presented credential admits the player.
    fn verify(&self, credential: Option<String>) -> BoxFuture<'static, bool>;
}

/// Default verifier admitting every join attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl CredentialVerifier for AcceptAll {
    fn verify(&self, _credential: Option<String>) -> BoxFuture<'static, bool> {
        Box::pin(async { true })
    }
}
