//! Report generation endpoint. Collects member profiles, resolves them onto
//! the canonical report slots, renders through the PDF service and streams
//! back a single PDF or a ZIP bundle.

use crate::db;
use crate::domain::report::{ReportJob, ReportType};
use crate::services::bundle::{self, MemberProfile};
use crate::services::resolver::{self, Profile};
use crate::state::SharedState;
use crate::templates::{assets, Branding};
use crate::web::error::ApiError;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use uuid::Uuid;

pub fn router() -> Router<SharedState> {
    Router::new().route("/reports", post(generate_report))
}

async fn generate_report(
    State(state): State<SharedState>,
    Path(workspace_id): Path<Uuid>,
    Json(job): Json<ReportJob>,
) -> Result<impl IntoResponse, ApiError> {
    let report_type =
        ReportType::parse(&job.report_type).map_err(|e| ApiError::Validation(e.to_string()))?;
    if job.member_ids.is_empty() {
        return Err(ApiError::Validation(
            "memberIds must name at least one member".to_string(),
        ));
    }

    let workspace = db::get_workspace(&state.pool, workspace_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("workspace {workspace_id} not found")))?;

    let found = db::get_members(&state.pool, workspace_id, &job.member_ids).await?;
    // Preserve request order and reject ids that resolved to nothing.
    let mut members = Vec::with_capacity(job.member_ids.len());
    for id in &job.member_ids {
        let member = found
            .iter()
            .find(|m| m.id == *id)
            .ok_or_else(|| ApiError::NotFound(format!("member {id} not found")))?;
        let responses = db::member_profile(&state.pool, workspace_id, member.id).await?;
        members.push(MemberProfile {
            id: member.id,
            full_name: member.full_name.clone(),
            responses,
        });
    }

    let descriptors = db::workspace_field_descriptors(&state.pool, workspace_id).await?;
    let labels = resolver::field_label_map(descriptors.iter());
    let overrides = job.template_data.unwrap_or_else(Profile::new);

    let branding = Branding {
        logo_data_uri: workspace
            .logo_path
            .as_deref()
            .and_then(assets::load_logo_data_uri),
        workspace_name: workspace.name,
        accent_color: workspace.accent_color,
    };

    let result = bundle::generate_report_bundle(
        workspace_id,
        report_type,
        &branding,
        &members,
        &labels,
        &overrides,
        &state.templates,
        state.renderer.as_ref(),
        &state.signing_key,
        &state.verify_base_url,
    )
    .await?;

    for document in &result.documents {
        db::insert_document(&state.pool, workspace_id, document).await?;
    }
    tracing::info!(
        workspace_id = %workspace_id,
        report_type = report_type.as_str(),
        documents = result.documents.len(),
        "report bundle issued"
    );

    let artifact = result.artifact;
    let disposition = format!("attachment; filename=\"{}\"", artifact.filename());
    Ok((
        [
            (CONTENT_TYPE, artifact.content_type().to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        artifact.into_bytes(),
    ))
}
