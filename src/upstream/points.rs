use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Serialize;

use super::{PlayerResult, PointsSink, UpstreamError, UpstreamResult};

/// HTTP client for the external points-reporting service.
#[derive(Clone)]
pub struct HttpPointsSink {
    client: Client,
    base_url: Arc<str>,
}

impl HttpPointsSink {
    /// Build a points client against the service base URL.
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }
}

/// Wire shape posted once per finishing player.
#[derive(Debug, Serialize)]
struct PointsReport<'a> {
    player_id: &'a str,
    game_id: Option<&'a str>,
    event_id: Option<&'a str>,
    score: u32,
    point: u32,
}

impl PointsSink for HttpPointsSink {
    fn report(&self, result: PlayerResult) -> BoxFuture<'static, UpstreamResult<()>> {
        let client = self.client.clone();
        let url = format!("{}/api/points", self.base_url);

        Box::pin(async move {
            let body = PointsReport {
                player_id: &result.player_id,
                game_id: result.game_id.as_deref(),
                event_id: result.event_id.as_deref(),
                score: result.score,
                point: result.point,
            };

            let mut request = client.post(&url).json(&body);
            if let Some(credential) = result.credential.as_deref() {
                request = request.bearer_auth(credential);
            }

            request
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(|source| {
                    UpstreamError::request(
                        format!("points report for player `{}`", result.player_id),
                        source,
                    )
                })?;

            Ok(())
        })
    }
}
