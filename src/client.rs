//! HTTP adapter for the routing backend.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::config::ClientConfig;
use crate::error::RoutingError;
use crate::model::{City, RouteResponse, RoutesRequest};
use crate::traits::RoutingClient;

#[derive(Debug, Clone)]
pub struct HttpRoutingClient {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpRoutingClient {
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `POST /routes` without cancellation.
    pub async fn post_routes(&self, request: &RoutesRequest) -> Result<RouteResponse, RoutingError> {
        debug!(
            url = %self.config.routes_url(),
            vehicles = request.vehicles.len(),
            "posting routes request"
        );
        let response = self
            .client
            .post(self.config.routes_url())
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }

    /// Charging stations known to the backend for a city.
    pub async fn stations(&self, city: City) -> Result<Vec<Value>, RoutingError> {
        let response = self
            .client
            .get(self.config.stations_url())
            .query(&[("city", city.as_str())])
            .send()
            .await?;
        read_json(response).await
    }

    /// Whether `GET /health` answers with a success status.
    pub async fn health(&self) -> Result<bool, RoutingError> {
        let response = self.client.get(self.config.health_url()).send().await?;
        Ok(response.status().is_success())
    }
}

impl RoutingClient for HttpRoutingClient {
    fn submit(
        &self,
        request: &RoutesRequest,
        cancel: CancelToken,
    ) -> impl Future<Output = Result<RouteResponse, RoutingError>> + Send {
        async move {
            if cancel.is_cancelled() {
                return Err(RoutingError::Cancelled);
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("routes request aborted");
                    Err(RoutingError::Cancelled)
                }
                result = self.post_routes(request) => result,
            }
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RoutingError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RoutingError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}
