use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use storage::repository::StressTestRepository;
use stress_core::model::{AnswerSet, MemberId, StressTestId, StressTestSubmission};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::SubmissionError;

/// Destination of a finished questionnaire.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Persist the submission and return the id assigned to it.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError` for any non-success outcome.
    async fn submit(&self, submission: &StressTestSubmission)
    -> Result<StressTestId, SubmissionError>;
}

//
// ─── REPOSITORY SINK ───────────────────────────────────────────────────────────
//

/// Stores results through a local `StressTestRepository`.
#[derive(Clone)]
pub struct RepositorySubmissionSink {
    results: Arc<dyn StressTestRepository>,
}

impl RepositorySubmissionSink {
    #[must_use]
    pub fn new(results: Arc<dyn StressTestRepository>) -> Self {
        Self { results }
    }
}

#[async_trait]
impl SubmissionSink for RepositorySubmissionSink {
    async fn submit(
        &self,
        submission: &StressTestSubmission,
    ) -> Result<StressTestId, SubmissionError> {
        let id = self.results.create_result(submission).await?;
        info!(%id, total = submission.scores.total_score(), "stored stress test result");
        Ok(id)
    }
}

//
// ─── HTTP SINK ─────────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct HttpSubmissionConfig {
    pub base_url: String,
}

impl HttpSubmissionConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("STRESS_API_BASE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self { base_url })
    }
}

/// Posts results to the console backend's `/api/stress-test` endpoint.
#[derive(Clone)]
pub struct HttpSubmissionSink {
    client: Client,
    endpoint: Url,
}

impl HttpSubmissionSink {
    /// # Errors
    ///
    /// Returns `SubmissionError::InvalidEndpoint` if the base URL is not an
    /// absolute http(s) URL.
    pub fn new(config: &HttpSubmissionConfig) -> Result<Self, SubmissionError> {
        Ok(Self {
            client: Client::new(),
            endpoint: endpoint_for(&config.base_url)?,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn endpoint_for(base_url: &str) -> Result<Url, SubmissionError> {
    let mut base = Url::parse(base_url.trim())
        .map_err(|e| SubmissionError::InvalidEndpoint(format!("{base_url}: {e}")))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(SubmissionError::InvalidEndpoint(format!(
            "{base_url}: unsupported scheme {}",
            base.scheme()
        )));
    }
    // Joining replaces the last path segment unless the base ends in a slash.
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("api/stress-test")
        .map_err(|e| SubmissionError::InvalidEndpoint(format!("{base_url}: {e}")))
}

#[async_trait]
impl SubmissionSink for HttpSubmissionSink {
    async fn submit(
        &self,
        submission: &StressTestSubmission,
    ) -> Result<StressTestId, SubmissionError> {
        let scores = submission.scores;
        let payload = SubmitRequest {
            member_id: submission.member_id,
            name: &submission.respondent.name,
            position: &submission.respondent.position,
            test_date: &submission.respondent.test_date,
            scores: ScorePayload {
                a_score: scores.a_score(),
                b_score: scores.b_score(),
                c_score: scores.c_score(),
                d_score: scores.d_score(),
                total_score: scores.total_score(),
            },
            answers: &submission.answers,
        };

        debug!(endpoint = %self.endpoint, "posting stress test result");
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: Option<SubmitResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let message = parsed
                .and_then(|r| r.error)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_owned());
            warn!(%status, %message, "stress test submission rejected");
            return Err(SubmissionError::Rejected {
                status: Some(status.as_u16()),
                message,
            });
        }

        let parsed = parsed.ok_or_else(|| SubmissionError::Rejected {
            status: Some(status.as_u16()),
            message: "response body is not a submission result".into(),
        })?;
        match parsed {
            SubmitResponse {
                success: true,
                stress_id: Some(id),
                ..
            } => {
                info!(id, "stress test result accepted");
                Ok(StressTestId::new(id))
            }
            SubmitResponse {
                success: true,
                stress_id: None,
                ..
            } => Err(SubmissionError::Rejected {
                status: Some(status.as_u16()),
                message: "response carried no stress_id".into(),
            }),
            SubmitResponse { error, .. } => Err(SubmissionError::Rejected {
                status: Some(status.as_u16()),
                message: error.unwrap_or_else(|| "unspecified error".into()),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    member_id: Option<MemberId>,
    name: &'a str,
    position: &'a str,
    test_date: &'a str,
    scores: ScorePayload,
    answers: &'a AnswerSet,
}

#[derive(Debug, Serialize)]
struct ScorePayload {
    a_score: u32,
    b_score: u32,
    c_score: u32,
    d_score: u32,
    total_score: u32,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    success: bool,
    #[serde(default)]
    stress_id: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}
