//! Submission intake. Responses are schema-checked on every write; the
//! required-field gate only applies when the caller marks the submission
//! SUBMITTED, so drafts can be saved half-finished.

use crate::db;
use crate::domain::fields;
use crate::state::SharedState;
use crate::web::error::ApiError;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SubmissionStatus {
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "SUBMITTED")]
    Submitted,
}

impl SubmissionStatus {
    fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::InProgress => "IN_PROGRESS",
            SubmissionStatus::Submitted => "SUBMITTED",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmissionPayload {
    pub responses: serde_json::Map<String, serde_json::Value>,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub member_id: Option<Uuid>,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/forms/:form_id/submissions", post(create_submission))
        .route(
            "/submissions/:submission_id",
            get(get_submission).delete(delete_submission),
        )
        .route("/submissions/:submission_id/resubmit", post(resubmit))
}

/// Unknown member ids are a not-found, not a database constraint error.
fn require_member(member_id: Uuid, found: &[db::Member]) -> Result<(), ApiError> {
    if found.iter().any(|m| m.id == member_id) {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("member {member_id} not found")))
    }
}

/// Schema-checks the raw responses and, for SUBMITTED, walks every step's
/// required fields, collecting all missing ids into one rejection.
fn validate_payload(
    descriptors: &[fields::FieldDescriptor],
    payload: &SubmissionPayload,
) -> Result<(), ApiError> {
    let decoded = fields::decode_responses(descriptors, &payload.responses)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    if payload.status == SubmissionStatus::Submitted {
        let mut missing = Vec::new();
        for step in fields::build_steps(descriptors) {
            missing.extend(fields::validate_step(&step.fields, &decoded));
        }
        if !missing.is_empty() {
            return Err(ApiError::Validation(format!(
                "required fields missing: {}",
                missing.join(", ")
            )));
        }
    }
    Ok(())
}

async fn create_submission(
    State(state): State<SharedState>,
    Path((workspace_id, form_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SubmissionPayload>,
) -> Result<Json<db::Submission>, ApiError> {
    let form = db::get_form_template(&state.pool, workspace_id, form_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("form {form_id} not found")))?;
    let descriptors = form.descriptors()?;
    validate_payload(&descriptors, &payload)?;

    if let Some(member_id) = payload.member_id {
        let found = db::get_members(&state.pool, workspace_id, &[member_id]).await?;
        require_member(member_id, &found)?;
    }

    let revision = db::next_revision(&state.pool, form_id, payload.member_id).await?;
    let submission = db::insert_submission(
        &state.pool,
        workspace_id,
        form_id,
        payload.member_id,
        &serde_json::Value::Object(payload.responses),
        payload.status.as_str(),
        revision,
    )
    .await?;
    tracing::info!(
        workspace_id = %workspace_id,
        submission_id = %submission.id,
        status = payload.status.as_str(),
        revision,
        "submission stored"
    );
    Ok(Json(submission))
}

async fn get_submission(
    State(state): State<SharedState>,
    Path((workspace_id, submission_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<db::Submission>, ApiError> {
    let submission = db::get_submission(&state.pool, workspace_id, submission_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("submission {submission_id} not found")))?;
    Ok(Json(submission))
}

async fn delete_submission(
    State(state): State<SharedState>,
    Path((workspace_id, submission_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = db::delete_submission(&state.pool, workspace_id, submission_id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!(
            "submission {submission_id} not found"
        )));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Appends a new revision for the same form and member. Resubmissions always
/// run the full SUBMITTED validation regardless of the requested status.
async fn resubmit(
    State(state): State<SharedState>,
    Path((workspace_id, submission_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SubmissionPayload>,
) -> Result<Json<db::Submission>, ApiError> {
    let previous = db::get_submission(&state.pool, workspace_id, submission_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("submission {submission_id} not found")))?;
    let form = db::get_form_template(&state.pool, workspace_id, previous.form_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("form for submission no longer exists".to_string()))?;
    let descriptors = form.descriptors()?;

    let strict = SubmissionPayload {
        responses: payload.responses.clone(),
        status: SubmissionStatus::Submitted,
        member_id: previous.member_id,
    };
    validate_payload(&descriptors, &strict)?;

    let revision = db::next_revision(&state.pool, previous.form_id, previous.member_id).await?;
    let submission = db::insert_submission(
        &state.pool,
        workspace_id,
        previous.form_id,
        previous.member_id,
        &serde_json::Value::Object(payload.responses),
        SubmissionStatus::Submitted.as_str(),
        revision,
    )
    .await?;
    Ok(Json(submission))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn unknown_member_ids_surface_as_not_found() {
        let member = db::Member {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            full_name: "Jane Doe".into(),
            email: None,
            created_at: Utc::now(),
        };
        assert!(require_member(member.id, std::slice::from_ref(&member)).is_ok());

        let err = require_member(Uuid::new_v4(), &[member]).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
