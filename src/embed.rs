//! Embed info composition.
//!
//! A request runs three upstream calls in a fixed order: token acquisition,
//! report metadata, embed token generation. Any failure stops the pipeline
//! and later calls are never issued.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::errors::AppError;
use crate::identity::TokenAcquirer;
use crate::powerbi::{EmbedToken, GenerateTokenRequest, ReportClient};

/// Response body of `GET /embed-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedInfoResponse {
    pub embed_url: String,
    pub report_id: String,
    pub embed_token: String,
    pub expiration: String,
}

#[derive(Clone)]
pub struct EmbedInfoService {
    config: Arc<Config>,
    acquirer: TokenAcquirer,
    reports: ReportClient,
}

impl EmbedInfoService {
    pub fn new(config: Arc<Config>, client: reqwest::Client) -> Self {
        let acquirer = TokenAcquirer::new(client.clone(), config.authority_host.clone());
        let reports = ReportClient::new(client, config.api_base.clone());
        Self {
            config,
            acquirer,
            reports,
        }
    }

    #[tracing::instrument(skip(self), fields(report_id = %self.config.target.report_id))]
    pub async fn embed_info(&self) -> Result<EmbedInfoResponse, AppError> {
        let cfg = &self.config;
        let target = &cfg.target;

        let token = self.acquirer.acquire(&cfg.credentials, &cfg.scope).await?;

        let report = self
            .reports
            .get_report(&token, &target.workspace_id, &target.report_id)
            .await?;

        let request = GenerateTokenRequest::new(target.access_level, &target.dataset_ids);
        let embed = self
            .reports
            .generate_token(&token, &target.workspace_id, &target.report_id, &request)
            .await?;
        log_expiry(&embed, Utc::now());

        Ok(EmbedInfoResponse {
            embed_url: report.embed_url,
            report_id: report.id,
            embed_token: embed.token,
            expiration: embed.expiration,
        })
    }
}

/// Seconds until `expiration`, or `None` if it is not RFC 3339.
fn remaining_secs(expiration: &str, now: DateTime<Utc>) -> Option<i64> {
    let at = DateTime::parse_from_rfc3339(expiration).ok()?;
    Some((at.with_timezone(&Utc) - now).num_seconds())
}

fn log_expiry(embed: &EmbedToken, now: DateTime<Utc>) {
    match remaining_secs(&embed.expiration, now) {
        Some(secs) if secs <= 0 => tracing::warn!(
            expiration = %embed.expiration,
            "embed token already expired when issued"
        ),
        Some(secs) => tracing::info!(
            token_id = embed.token_id.as_deref(),
            expires_in_secs = secs,
            "issued embed token"
        ),
        None => tracing::warn!(
            expiration = %embed.expiration,
            "embed token expiration is not RFC 3339; passing through"
        ),
    }
}
