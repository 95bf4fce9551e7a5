//! HTTP implementation of the `procure-core` collaborator traits.
//!
//! One [`BackendClient`] holds the cookie jar for the session, so every
//! trait implemented here shares the same login.

mod endpoints;
pub mod response;

use std::time::Duration;

use procure_core::config::ApiConfig;
use procure_core::errors::ApiError;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::response::{status_error, transport_error};

pub use endpoints::routes;

type ErrorMapper = fn(u16, &str) -> ApiError;

#[derive(Clone, Debug)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(15)))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(transport_error)?;
        Ok(Self { http, base_url: config.base_url.trim().trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path))
    }

    fn patch(&self, path: &str) -> RequestBuilder {
        self.http.patch(self.url(path))
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.http.delete(self.url(path))
    }

    async fn send(
        &self,
        request: RequestBuilder,
        on_error: ErrorMapper,
    ) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(
            event_name = "client.response.error",
            status = status.as_u16(),
            body = %excerpt(&body),
            "backend answered with an error status"
        );
        Err(on_error(status.as_u16(), &body))
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.json_with(request, status_error).await
    }

    async fn json_with<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        on_error: ErrorMapper,
    ) -> Result<T, ApiError> {
        let response = self.send(request, on_error).await?;
        let bytes = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&bytes).map_err(|error| ApiError::Decode(error.to_string()))
    }

    async fn empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request, status_error).await.map(|_| ())
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(120).collect()
}
