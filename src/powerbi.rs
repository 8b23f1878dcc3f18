//! Reporting service calls: report metadata and embed token generation.

use serde::{Deserialize, Serialize};

use crate::config::AccessLevel;
use crate::errors::{AppError, Stage};
use crate::identity::AccessToken;
use crate::upstream;

/// `GET /groups/{workspace}/reports/{report}` response (fields we use).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub id: String,
    pub embed_url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dataset_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetRef {
    pub id: String,
}

/// Body of the `GenerateToken` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTokenRequest {
    pub access_level: AccessLevel,
    pub datasets: Vec<DatasetRef>,
}

impl GenerateTokenRequest {
    pub fn new(access_level: AccessLevel, dataset_ids: &[String]) -> Self {
        Self {
            access_level,
            datasets: dataset_ids
                .iter()
                .map(|id| DatasetRef { id: id.clone() })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedToken {
    pub token: String,
    pub expiration: String,
    #[serde(default)]
    pub token_id: Option<String>,
}

#[derive(Clone)]
pub struct ReportClient {
    client: reqwest::Client,
    api_base: String,
}

impl ReportClient {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn report_url(&self, workspace_id: &str, report_id: &str) -> String {
        format!(
            "{}/groups/{}/reports/{}",
            self.api_base, workspace_id, report_id
        )
    }

    #[tracing::instrument(skip(self, token))]
    pub async fn get_report(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        report_id: &str,
    ) -> Result<ReportMetadata, AppError> {
        let req = self
            .client
            .get(self.report_url(workspace_id, report_id))
            .bearer_auth(token.secret());
        let report: ReportMetadata = upstream::send_json(Stage::ReportMetadata, req).await?;
        tracing::debug!(
            name = report.name.as_deref(),
            dataset_id = report.dataset_id.as_deref(),
            "fetched report metadata"
        );
        Ok(report)
    }

    #[tracing::instrument(skip(self, token, request), fields(datasets = request.datasets.len()))]
    pub async fn generate_token(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        report_id: &str,
        request: &GenerateTokenRequest,
    ) -> Result<EmbedToken, AppError> {
        let url = format!("{}/GenerateToken", self.report_url(workspace_id, report_id));
        let req = self
            .client
            .post(url)
            .bearer_auth(token.secret())
            .json(request);
        upstream::send_json(Stage::GenerateToken, req).await
    }
}
