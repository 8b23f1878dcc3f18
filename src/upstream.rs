//! Shared HTTP client for the identity provider and reporting service calls.
//! No retry layer: every call is attempted exactly once.
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::errors::{AppError, Stage};

pub fn build_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .pool_max_idle_per_host(8)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .user_agent(concat!("embed-gateway/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// A fully-read upstream response.
pub struct UpstreamBody {
    pub status: reqwest::StatusCode,
    pub text: String,
}

impl UpstreamBody {
    pub async fn read(stage: Stage, resp: reqwest::Response) -> Result<Self, AppError> {
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AppError::transport(stage, e))?;
        Ok(Self { status, text })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self, stage: Stage) -> Result<T, AppError> {
        serde_json::from_str(&self.text).map_err(|source| AppError::Serialization { stage, source })
    }
}

/// Send a prepared request, mapping transport failures to `stage`, and
/// decode a successful JSON body. Non-success statuses become `UpstreamFetch`.
pub async fn send_json<T: DeserializeOwned>(
    stage: Stage,
    req: reqwest::RequestBuilder,
) -> Result<T, AppError> {
    let resp = req.send().await.map_err(|e| {
        tracing::warn!(stage = %stage, "upstream request failed: {}", e);
        AppError::transport(stage, e)
    })?;
    let body = UpstreamBody::read(stage, resp).await?;
    if !body.is_success() {
        return Err(AppError::upstream_status(stage, body.status, &body.text));
    }
    body.json(stage)
}
