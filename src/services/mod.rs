/// Event catalog bootstrap and question digests.
pub mod catalog_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Join-window validation and connect/disconnect reconciliation.
pub mod join_service;
/// Fire-and-forget final-score reporting.
pub mod points_reporter;
/// Per-question round progression and end-of-game handling.
pub mod round_service;
/// Phase scheduling for upcoming events.
pub mod scheduler;
/// Answer submission and scoring.
pub mod score_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
/// Outbound fan-out to the audience, a room, or one connection.
pub mod ws_events;
