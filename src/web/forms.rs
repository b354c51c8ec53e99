//! Form template CRUD and the derived wizard-step view.

use crate::db;
use crate::domain::fields::{self, FieldDescriptor};
use crate::state::SharedState;
use crate::web::error::ApiError;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct FormPayload {
    pub title: String,
    pub fields: Vec<FieldDescriptor>,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/forms", post(create_form))
        .route(
            "/forms/:form_id",
            get(get_form).put(update_form).delete(delete_form),
        )
        .route("/forms/:form_id/steps", get(form_steps))
}

async fn require_workspace(state: &SharedState, workspace_id: Uuid) -> Result<(), ApiError> {
    db::get_workspace(&state.pool, workspace_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::NotFound(format!("workspace {workspace_id} not found")))
}

fn validated_fields(payload: &FormPayload) -> Result<serde_json::Value, ApiError> {
    fields::validate_descriptors(&payload.fields)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    serde_json::to_value(&payload.fields).map_err(|e| ApiError::Internal(e.into()))
}

async fn create_form(
    State(state): State<SharedState>,
    Path(workspace_id): Path<Uuid>,
    Json(payload): Json<FormPayload>,
) -> Result<Json<db::FormTemplate>, ApiError> {
    require_workspace(&state, workspace_id).await?;
    let fields_json = validated_fields(&payload)?;
    let form =
        db::insert_form_template(&state.pool, workspace_id, &payload.title, &fields_json).await?;
    tracing::info!(workspace_id = %workspace_id, form_id = %form.id, "form created");
    Ok(Json(form))
}

async fn get_form(
    State(state): State<SharedState>,
    Path((workspace_id, form_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<db::FormTemplate>, ApiError> {
    let form = db::get_form_template(&state.pool, workspace_id, form_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("form {form_id} not found")))?;
    Ok(Json(form))
}

async fn update_form(
    State(state): State<SharedState>,
    Path((workspace_id, form_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<FormPayload>,
) -> Result<Json<db::FormTemplate>, ApiError> {
    let fields_json = validated_fields(&payload)?;
    let form =
        db::update_form_template(&state.pool, workspace_id, form_id, &payload.title, &fields_json)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("form {form_id} not found")))?;
    Ok(Json(form))
}

async fn delete_form(
    State(state): State<SharedState>,
    Path((workspace_id, form_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = db::delete_form_template(&state.pool, workspace_id, form_id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("form {form_id} not found")));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// The wizard view: the stored field list split into steps at each section
/// break. Derived on read, never persisted.
async fn form_steps(
    State(state): State<SharedState>,
    Path((workspace_id, form_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<fields::FormStep>>, ApiError> {
    let form = db::get_form_template(&state.pool, workspace_id, form_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("form {form_id} not found")))?;
    let descriptors = form.descriptors()?;
    Ok(Json(fields::build_steps(&descriptors)))
}
