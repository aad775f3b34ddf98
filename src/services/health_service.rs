use crate::dto::health::HealthResponse;
use crate::state::SharedState;

/// Build the current health status of the backend.
pub fn health_status(state: &SharedState) -> HealthResponse {
    HealthResponse::ok(state.registry().len())
}
