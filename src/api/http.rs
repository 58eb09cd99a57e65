use std::time::{Duration as StdDuration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::ActivityApi;
use crate::error::{AppError, AppResult};
use crate::models::activity::{
    ActivityForm, MonthlyActivityRecord, SaveReceipt, YearlyGoal,
};
use crate::models::metric::TaskStatus;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub http_timeout: StdDuration,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("OIBOARD_API_BASE_URL")
            .ok()
            .unwrap_or_else(|| "http://localhost:8080/api".to_string());
        let http_timeout = std::env::var("OIBOARD_API_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(StdDuration::from_secs)
            .unwrap_or_else(|| StdDuration::from_secs(30));

        Self {
            base_url,
            http_timeout,
        }
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http_timeout: StdDuration::from_secs(30),
        }
    }
}

/// `reqwest`-backed client for the dashboard task-management API.
///
/// Failed saves are never retried here; the user resubmits manually. Reads
/// map to degradable errors so the ledger can substitute defaults.
pub struct HttpActivityApi {
    client: reqwest::Client,
    config: ApiConfig,
}

impl HttpActivityApi {
    pub fn new(config: ApiConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|err| AppError::other(format!("failed to build HTTP client: {err}")))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

/// Wire shape of a monthly record. Status arrives as whatever label the
/// producing API uses (Korean display labels or English codes); it is
/// normalized here so raw strings never travel past this boundary.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonthlyRecordDto {
    task_id: Option<String>,
    year: i32,
    month: u32,
    #[serde(default)]
    activity_content: Option<String>,
    #[serde(default)]
    actual_value: Option<f64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    activity_id: Option<i64>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl MonthlyRecordDto {
    fn into_record(self, task_id: &str) -> MonthlyActivityRecord {
        MonthlyActivityRecord {
            task_id: self.task_id.unwrap_or_else(|| task_id.to_string()),
            year: self.year,
            month: self.month,
            activity_content: self.activity_content,
            actual_value: self.actual_value,
            status: TaskStatus::normalize(self.status.as_deref()),
            activity_id: self.activity_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveMonthlyRecordBody<'a> {
    activity_content: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual_value: Option<f64>,
    attachments: &'a [crate::models::activity::Attachment],
}

#[async_trait]
impl ActivityApi for HttpActivityApi {
    async fn get_monthly_record(
        &self,
        task_id: &str,
        year: i32,
        month: u32,
    ) -> AppResult<Option<MonthlyActivityRecord>> {
        let correlation_id = Uuid::new_v4().to_string();
        let url = self.url(&format!("tasks/{task_id}/activities/{year}/{month}"));
        let started = Instant::now();

        let response = self
            .client
            .get(&url)
            .header("X-Correlation-Id", &correlation_id)
            .send()
            .await
            .map_err(|err| {
                AppError::fetch(
                    format!("monthly record request failed: {err}"),
                    Some(&correlation_id),
                )
            })?;

        debug!(
            target: "oiboard::api::http",
            correlation_id = %correlation_id,
            latency_ms = started.elapsed().as_millis() as u64,
            status = response.status().as_u16(),
            "GET monthly record"
        );

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let dto: MonthlyRecordDto = response.json().await.map_err(|err| {
                    AppError::fetch(
                        format!("monthly record response was not valid JSON: {err}"),
                        Some(&correlation_id),
                    )
                })?;
                Ok(Some(dto.into_record(task_id)))
            }
            status => Err(AppError::http(
                status.as_u16(),
                "monthly record fetch rejected",
                &correlation_id,
            )),
        }
    }

    async fn save_monthly_record(
        &self,
        task_id: &str,
        year: i32,
        month: u32,
        form: &ActivityForm,
    ) -> AppResult<SaveReceipt> {
        let correlation_id = Uuid::new_v4().to_string();
        let url = self.url(&format!("tasks/{task_id}/activities/{year}/{month}"));

        let body = SaveMonthlyRecordBody {
            activity_content: &form.activity_content,
            status: form.status.as_str(),
            actual_value: form.actual_value,
            attachments: &form.attachments,
        };

        let response = self
            .client
            .put(&url)
            .header("X-Correlation-Id", &correlation_id)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                AppError::persistence(
                    format!("save request failed: {err}"),
                    Some(&correlation_id),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::persistence(
                format!("server rejected save with status {}", status.as_u16()),
                Some(&correlation_id),
            ));
        }

        let receipt: SaveReceipt = response.json().await.map_err(|err| {
            AppError::persistence(
                format!("save acknowledgement was not valid JSON: {err}"),
                Some(&correlation_id),
            )
        })?;

        debug!(
            target: "oiboard::api::http",
            correlation_id = %correlation_id,
            activity_id = receipt.activity_id,
            "monthly record saved"
        );

        Ok(receipt)
    }

    async fn get_yearly_goals(&self, task_id: &str, year: i32) -> AppResult<Vec<YearlyGoal>> {
        let correlation_id = Uuid::new_v4().to_string();
        let url = self.url(&format!("tasks/{task_id}/goals/{year}"));

        let response = self
            .client
            .get(&url)
            .header("X-Correlation-Id", &correlation_id)
            .send()
            .await
            .map_err(|err| {
                AppError::fetch(
                    format!("yearly goals request failed: {err}"),
                    Some(&correlation_id),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::http(
                status.as_u16(),
                "yearly goals fetch rejected",
                &correlation_id,
            ));
        }

        response.json().await.map_err(|err| {
            AppError::fetch(
                format!("yearly goals response was not valid JSON: {err}"),
                Some(&correlation_id),
            )
        })
    }

    async fn get_previous_activities(
        &self,
        task_id: &str,
        limit: usize,
    ) -> AppResult<Vec<MonthlyActivityRecord>> {
        let correlation_id = Uuid::new_v4().to_string();
        let url = self.url(&format!("tasks/{task_id}/activities/recent?limit={limit}"));

        let response = self
            .client
            .get(&url)
            .header("X-Correlation-Id", &correlation_id)
            .send()
            .await
            .map_err(|err| {
                AppError::fetch(
                    format!("previous activities request failed: {err}"),
                    Some(&correlation_id),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                target: "oiboard::api::http",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                "previous activities fetch rejected"
            );
            return Err(AppError::http(
                status.as_u16(),
                "previous activities fetch rejected",
                &correlation_id,
            ));
        }

        let dtos: Vec<MonthlyRecordDto> = response.json().await.map_err(|err| {
            AppError::fetch(
                format!("previous activities response was not valid JSON: {err}"),
                Some(&correlation_id),
            )
        })?;

        Ok(dtos
            .into_iter()
            .map(|dto| dto.into_record(task_id))
            .collect())
    }
}
