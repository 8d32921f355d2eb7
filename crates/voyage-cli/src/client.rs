//! HTTP client for a running voyage server.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;

use voyage_core::{RouteRequest, RouteResponse};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct PlannerClient {
    client: Client,
    base_url: String,
}

impl PlannerClient {
    /// `base_url` without a trailing path, e.g. "http://localhost:8000".
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn plan_url(&self) -> String {
        format!("{}/v1/routes/plan", self.base_url)
    }

    pub async fn plan(&self, request: &RouteRequest) -> Result<RouteResponse> {
        let url = self.plan_url();
        tracing::debug!(%url, waypoints = request.waypoints_count, "Submitting route plan");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let reason = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status.to_string(),
            };
            bail!("server rejected plan ({status}): {reason}");
        }

        response
            .json::<RouteResponse>()
            .await
            .context("decoding route response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_url_ignores_trailing_slash() {
        let client = PlannerClient::new("http://localhost:8000/");
        assert_eq!(client.plan_url(), "http://localhost:8000/v1/routes/plan");
    }
}
