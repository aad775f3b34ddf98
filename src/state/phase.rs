use thiserror::Error;

/// High-level phases the live show can be in.
///
/// There is at most one show per process; the phase tracks it from the moment
/// an event is announced until the final scoreboard collapses everything back
/// to [`ShowPhase::Idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowPhase {
    /// No show is scheduled or running.
    Idle,
    /// The scheduled event has been announced; the room is not joinable yet.
    Announced,
    /// The join window is open and players can enter the room.
    Joinable,
    /// The session exists and questions are being served.
    Hosting,
    /// Terminal phase; immediately collapses back to [`ShowPhase::Idle`].
    Ended,
}

/// Events that drive the show phase machine.
///
/// The first three are fired by the phase scheduler's chained timers, the
/// fourth by the round controller, and [`ShowEvent::Reset`] by any teardown
/// path (end of game, last player leaving).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowEvent {
    /// The event's scheduled start time has been reached.
    AnnounceEvent,
    /// The join window has opened.
    OpenJoin,
    /// The game-start trigger fired and a session now exists.
    StartGame,
    /// The round controller finished the last question.
    FinishGame,
    /// Collapse back to idle from any non-idle phase.
    Reset,
}

/// Error returned when an event cannot be applied in the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the machine was in when the invalid event was received.
    pub from: ShowPhase,
    /// The event that cannot be applied from this phase.
    pub event: ShowEvent,
}

/// State machine implementing the show lifecycle.
#[derive(Debug, Clone, Default)]
pub struct ShowStateMachine {
    phase: ShowPhase,
}

impl Default for ShowPhase {
    fn default() -> Self {
        ShowPhase::Idle
    }
}

impl ShowStateMachine {
    /// Create a new machine initialised in the idle phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> ShowPhase {
        self.phase
    }

    /// Apply an event, returning the phase entered on success.
    pub fn apply(&mut self, event: ShowEvent) -> Result<ShowPhase, InvalidTransition> {
        self.phase = self.compute_transition(event)?;
        Ok(self.phase)
    }

    /// Compute the transition for an event without mutating the machine.
    fn compute_transition(&self, event: ShowEvent) -> Result<ShowPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (ShowPhase::Idle, ShowEvent::AnnounceEvent) => ShowPhase::Announced,
            (ShowPhase::Announced, ShowEvent::OpenJoin) => ShowPhase::Joinable,
            (ShowPhase::Joinable, ShowEvent::StartGame) => ShowPhase::Hosting,
            (ShowPhase::Hosting, ShowEvent::FinishGame) => ShowPhase::Ended,
            // Teardown is legal from any non-idle phase: the room can empty
            // out before the game ever starts.
            (
                ShowPhase::Announced | ShowPhase::Joinable | ShowPhase::Hosting | ShowPhase::Ended,
                ShowEvent::Reset,
            ) => ShowPhase::Idle,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
