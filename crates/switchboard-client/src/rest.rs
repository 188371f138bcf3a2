//! REST client for the switch endpoints.
//!
//! Thin `reqwest` wrapper over `GET /switches`, `GET /switches/{id}` and
//! `PUT /switches/{id}`. Also the [`SnapshotSource`] the mirror hydrates
//! from.

use reqwest::{Response, StatusCode};
use serde_json::json;
use switchboard_types::{Switch, SwitchId, SwitchMap, SwitchStatus, index_by_id};
use tracing::debug;

use crate::error::ClientError;
use crate::mirror::SnapshotSource;

/// HTTP client for one Switchboard server.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestClient {
    /// Client for the server at `base_url` (e.g. `http://localhost:3000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every switch.
    ///
    /// # Errors
    ///
    /// [`ClientError::Http`] on transport failure or a non-success status.
    pub async fn list_switches(&self) -> Result<Vec<Switch>, ClientError> {
        let url = format!("{}/switches", self.base_url);
        debug!(%url, "listing switches");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Http(format!("GET {url} failed: {e}")))?;
        let response = check(response, None).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Http(format!("GET {url} returned invalid body: {e}")))
    }

    /// One switch.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotFound`] for an unknown id, [`ClientError::Http`]
    /// otherwise.
    pub async fn get_switch(&self, id: &str) -> Result<Switch, ClientError> {
        let url = format!("{}/switches/{id}", self.base_url);
        debug!(%url, "fetching switch");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Http(format!("GET {url} failed: {e}")))?;
        let response = check(response, Some(id)).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Http(format!("GET {url} returned invalid body: {e}")))
    }

    /// Set a switch to `status`. Returns the updated switch.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotFound`] for an unknown id, [`ClientError::Http`]
    /// otherwise.
    pub async fn set_status(&self, id: &str, status: SwitchStatus) -> Result<Switch, ClientError> {
        let url = format!("{}/switches/{id}", self.base_url);
        debug!(%url, %status, "setting switch status");
        let response = self
            .client
            .put(&url)
            .json(&json!({ "status": status }))
            .send()
            .await
            .map_err(|e| ClientError::Http(format!("PUT {url} failed: {e}")))?;
        let response = check(response, Some(id)).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Http(format!("PUT {url} returned invalid body: {e}")))
    }
}

impl SnapshotSource for RestClient {
    async fn fetch_snapshot(&self) -> Result<SwitchMap, ClientError> {
        Ok(index_by_id(self.list_switches().await?))
    }
}

/// Map a non-success response to an error. A 404 on a per-switch call is
/// [`ClientError::NotFound`].
async fn check(response: Response, id: Option<&str>) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if let (StatusCode::NOT_FOUND, Some(id)) = (status, id) {
        return Err(ClientError::NotFound(SwitchId::from(id)));
    }

    let body: Option<serde_json::Value> = response.json().await.ok();
    let message = body
        .as_ref()
        .and_then(|b| b.get("error"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("no error message");
    Err(ClientError::Http(format!("server returned {status}: {message}")))
}
