//! HTTP clients for the assignment and attempt services.

use async_trait::async_trait;
use attempts::{AnswerInput, Score};
use common::{AssignmentId, AttemptId, IdempotencyKey, UserId};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{AssignmentClient, AttemptClient, CreatedAttempt, EligibilityResponse};
use crate::error::RemoteError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserRequest<'a> {
    user_id: &'a UserId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReservationRequest<'a> {
    user_id: &'a UserId,
    idempotency_key: &'a IdempotencyKey,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAttemptRequest<'a> {
    assignment_id: AssignmentId,
    user_id: &'a UserId,
    idempotency_key: &'a IdempotencyKey,
}

#[derive(Serialize)]
struct AnswersRequest<'a> {
    answers: &'a [AnswerInput],
}

#[derive(Serialize, Deserialize)]
struct ScoreBody {
    score: Score,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

/// Turns a non-success response into a classified [`RemoteError`].
async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await?;
    let (message, code) = match serde_json::from_slice::<ErrorBody>(&body) {
        Ok(parsed) => (parsed.error, parsed.code),
        Err(_) => (String::from_utf8_lossy(&body).to_string(), None),
    };

    Err(match (code.as_deref(), status) {
        (Some("not_found"), _) | (None, StatusCode::NOT_FOUND) => RemoteError::NotFound(message),
        (Some("not_eligible"), _) => RemoteError::NotEligible(message),
        (Some("invalid_state"), _) | (None, StatusCode::CONFLICT) => {
            RemoteError::InvalidState(message)
        }
        (Some("bad_request"), _) | (None, StatusCode::BAD_REQUEST) => {
            RemoteError::BadRequest(message)
        }
        _ => RemoteError::Status {
            status: status.as_u16(),
            message,
        },
    })
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
    let response = check(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

fn join(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Assignment service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAssignmentClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAssignmentClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn url(&self, assignment_id: AssignmentId, action: &str) -> String {
        join(
            &self.base_url,
            &format!("/assignments/{assignment_id}/{action}"),
        )
    }
}

#[async_trait]
impl AssignmentClient for HttpAssignmentClient {
    async fn check_eligibility(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
    ) -> Result<EligibilityResponse, RemoteError> {
        let response = self
            .client
            .post(self.url(assignment_id, "check-eligibility"))
            .json(&UserRequest { user_id })
            .send()
            .await?;
        decode(response).await
    }

    async fn reserve(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.url(assignment_id, "reserve"))
            .json(&ReservationRequest {
                user_id,
                idempotency_key: key,
            })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn release(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.url(assignment_id, "release"))
            .json(&ReservationRequest {
                user_id,
                idempotency_key: key,
            })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// Attempt service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAttemptClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAttemptClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn url(&self, attempt_id: AttemptId, action: &str) -> String {
        join(&self.base_url, &format!("/attempts/{attempt_id}/{action}"))
    }
}

#[async_trait]
impl AttemptClient for HttpAttemptClient {
    async fn create_attempt(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<CreatedAttempt, RemoteError> {
        let response = self
            .client
            .post(join(&self.base_url, "/attempts"))
            .json(&CreateAttemptRequest {
                assignment_id,
                user_id,
                idempotency_key: key,
            })
            .send()
            .await?;
        decode(response).await
    }

    async fn cancel_attempt(&self, attempt_id: AttemptId) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.url(attempt_id, "cancel"))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn submit_answers(
        &self,
        attempt_id: AttemptId,
        answers: &[AnswerInput],
    ) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.url(attempt_id, "answers"))
            .json(&AnswersRequest { answers })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn auto_score(&self, attempt_id: AttemptId) -> Result<Score, RemoteError> {
        let response = self
            .client
            .post(self.url(attempt_id, "autoscore"))
            .send()
            .await?;
        let body: ScoreBody = decode(response).await?;
        Ok(body.score)
    }

    async fn finalize_attempt(
        &self,
        attempt_id: AttemptId,
        score: Score,
    ) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.url(attempt_id, "finalize"))
            .json(&ScoreBody { score })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}
