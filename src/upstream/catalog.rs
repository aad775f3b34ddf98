use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::warn;

use super::{CatalogEvent, EventCatalog, UpstreamError, UpstreamResult};

/// HTTP client for the external event catalog.
#[derive(Clone)]
pub struct HttpEventCatalog {
    client: Client,
    base_url: Arc<str>,
}

impl HttpEventCatalog {
    /// Build a catalog client against the service base URL.
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }
}

/// Wire shape of the catalog listing.
#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    events: Vec<RawEvent>,
}

/// Wire shape of a single catalog event.
#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    name: String,
    game_name: String,
    starts_at: String,
}

impl EventCatalog for HttpEventCatalog {
    fn fetch_events(&self) -> BoxFuture<'static, UpstreamResult<Vec<CatalogEvent>>> {
        let client = self.client.clone();
        let url = format!("{}/api/event/all", self.base_url);

        Box::pin(async move {
            let response = client
                .get(&url)
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(|source| UpstreamError::request("event catalog fetch", source))?;

            let payload: CatalogResponse = response
                .json()
                .await
                .map_err(|source| UpstreamError::request("event catalog payload", source))?;

            Ok(payload
                .events
                .into_iter()
                .filter_map(parse_event)
                .collect())
        })
    }
}

/// Convert a wire event, skipping entries whose start time does not parse.
fn parse_event(raw: RawEvent) -> Option<CatalogEvent> {
    match OffsetDateTime::parse(&raw.starts_at, &Rfc3339) {
        Ok(starts_at) => Some(CatalogEvent {
            id: raw.id,
            name: raw.name,
            game_name: raw.game_name,
            starts_at,
        }),
        Err(err) => {
            warn!(event = %raw.id, starts_at = %raw.starts_at, error = %err,
                "dropping catalog event with unparseable start time");
            None
        }
    }
}
