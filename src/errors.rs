use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Body returned to callers for every failure of the embed flow.
pub const EMBED_FAILURE_MESSAGE: &str = "Failed to get embed info";

/// The upstream call an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Identity,
    ReportMetadata,
    GenerateToken,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Identity => "identity",
            Stage::ReportMetadata => "report_metadata",
            Stage::GenerateToken => "generate_token",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("identity provider rejected token request ({status}): {body}")]
    Authentication {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{stage} call failed: {detail}")]
    UpstreamFetch { stage: Stage, detail: String },

    #[error("{stage} response is not valid JSON: {source}")]
    Serialization {
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },
}

impl AppError {
    /// Transport-level failure (DNS, connect, timeout, body read).
    pub fn transport(stage: Stage, err: reqwest::Error) -> Self {
        AppError::UpstreamFetch {
            stage,
            detail: err.to_string(),
        }
    }

    /// Non-success status from a reporting-service call.
    pub fn upstream_status(stage: Stage, status: reqwest::StatusCode, body: &str) -> Self {
        AppError::UpstreamFetch {
            stage,
            detail: format!("status {}: {}", status, body),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            AppError::Authentication { .. } => Stage::Identity,
            AppError::UpstreamFetch { stage, .. } | AppError::Serialization { stage, .. } => *stage,
        }
    }

    /// Stable code used in server-side logs.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Authentication { .. } => "authentication_error",
            AppError::UpstreamFetch { .. } => "upstream_fetch_error",
            AppError::Serialization { .. } => "serialization_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Detail stays in the logs; callers only ever see the fixed message.
        tracing::error!(
            code = self.code(),
            stage = %self.stage(),
            error = %self,
            "Error in /embed-info"
        );
        (StatusCode::INTERNAL_SERVER_ERROR, EMBED_FAILURE_MESSAGE).into_response()
    }
}
