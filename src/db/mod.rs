//! Database access. Every query is scoped by workspace id; cross-tenant
//! reads are not possible through this module.

use crate::domain::fields::FieldDescriptor;
use crate::services::bundle::IssuedDocument;
use crate::services::resolver::Profile;
use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub logo_path: Option<String>,
    pub accent_color: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Member {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct FormTemplate {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub title: String,
    pub fields: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FormTemplate {
    /// Deserializes the stored JSONB field list. Rows are only ever written
    /// through the validated create/update paths, so a decode failure here
    /// means the column was edited out of band.
    pub fn descriptors(&self) -> Result<Vec<FieldDescriptor>> {
        Ok(serde_json::from_value(self.fields.clone())?)
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Submission {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub form_id: Uuid,
    pub member_id: Option<Uuid>,
    pub responses: serde_json::Value,
    pub status: String,
    pub revision: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct VerificationRecord {
    pub reference: String,
    pub workspace_name: String,
    pub recipient: String,
    pub report_type: String,
    pub issued_at: DateTime<Utc>,
}

pub async fn get_workspace(pool: &PgPool, workspace_id: Uuid) -> Result<Option<Workspace>> {
    let workspace = sqlx::query_as::<_, Workspace>(
        "SELECT id, name, logo_path, accent_color, created_at FROM workspaces WHERE id = $1",
    )
    .bind(workspace_id)
    .fetch_optional(pool)
    .await?;
    Ok(workspace)
}

pub async fn insert_form_template(
    pool: &PgPool,
    workspace_id: Uuid,
    title: &str,
    fields: &serde_json::Value,
) -> Result<FormTemplate> {
    let form = sqlx::query_as::<_, FormTemplate>(
        "INSERT INTO form_templates (id, workspace_id, title, fields)
         VALUES ($1, $2, $3, $4)
         RETURNING id, workspace_id, title, fields, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(workspace_id)
    .bind(title)
    .bind(fields)
    .fetch_one(pool)
    .await?;
    Ok(form)
}

pub async fn get_form_template(
    pool: &PgPool,
    workspace_id: Uuid,
    form_id: Uuid,
) -> Result<Option<FormTemplate>> {
    let form = sqlx::query_as::<_, FormTemplate>(
        "SELECT id, workspace_id, title, fields, created_at, updated_at
         FROM form_templates WHERE id = $1 AND workspace_id = $2",
    )
    .bind(form_id)
    .bind(workspace_id)
    .fetch_optional(pool)
    .await?;
    Ok(form)
}

pub async fn update_form_template(
    pool: &PgPool,
    workspace_id: Uuid,
    form_id: Uuid,
    title: &str,
    fields: &serde_json::Value,
) -> Result<Option<FormTemplate>> {
    let form = sqlx::query_as::<_, FormTemplate>(
        "UPDATE form_templates SET title = $3, fields = $4, updated_at = NOW()
         WHERE id = $1 AND workspace_id = $2
         RETURNING id, workspace_id, title, fields, created_at, updated_at",
    )
    .bind(form_id)
    .bind(workspace_id)
    .bind(title)
    .bind(fields)
    .fetch_optional(pool)
    .await?;
    Ok(form)
}

pub async fn delete_form_template(
    pool: &PgPool,
    workspace_id: Uuid,
    form_id: Uuid,
) -> Result<bool> {
    let result = sqlx::query("DELETE FROM form_templates WHERE id = $1 AND workspace_id = $2")
        .bind(form_id)
        .bind(workspace_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Every field descriptor across all of the workspace's forms, used to build
/// the id-to-label index for report resolution.
pub async fn workspace_field_descriptors(
    pool: &PgPool,
    workspace_id: Uuid,
) -> Result<Vec<FieldDescriptor>> {
    let forms = sqlx::query_as::<_, FormTemplate>(
        "SELECT id, workspace_id, title, fields, created_at, updated_at
         FROM form_templates WHERE workspace_id = $1 ORDER BY created_at",
    )
    .bind(workspace_id)
    .fetch_all(pool)
    .await?;

    let mut descriptors = Vec::new();
    for form in &forms {
        descriptors.extend(form.descriptors()?);
    }
    Ok(descriptors)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_submission(
    pool: &PgPool,
    workspace_id: Uuid,
    form_id: Uuid,
    member_id: Option<Uuid>,
    responses: &serde_json::Value,
    status: &str,
    revision: i32,
) -> Result<Submission> {
    let submission = sqlx::query_as::<_, Submission>(
        "INSERT INTO submissions (id, workspace_id, form_id, member_id, responses, status, revision)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING id, workspace_id, form_id, member_id, responses, status, revision, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(workspace_id)
    .bind(form_id)
    .bind(member_id)
    .bind(responses)
    .bind(status)
    .bind(revision)
    .fetch_one(pool)
    .await?;
    Ok(submission)
}

pub async fn get_submission(
    pool: &PgPool,
    workspace_id: Uuid,
    submission_id: Uuid,
) -> Result<Option<Submission>> {
    let submission = sqlx::query_as::<_, Submission>(
        "SELECT id, workspace_id, form_id, member_id, responses, status, revision, created_at
         FROM submissions WHERE id = $1 AND workspace_id = $2",
    )
    .bind(submission_id)
    .bind(workspace_id)
    .fetch_optional(pool)
    .await?;
    Ok(submission)
}

/// Next revision number for the form/member pair. Resubmissions append a new
/// row; history is never overwritten.
pub async fn next_revision(
    pool: &PgPool,
    form_id: Uuid,
    member_id: Option<Uuid>,
) -> Result<i32> {
    let max: Option<i32> = sqlx::query_scalar(
        "SELECT MAX(revision) FROM submissions WHERE form_id = $1 AND member_id IS NOT DISTINCT FROM $2",
    )
    .bind(form_id)
    .bind(member_id)
    .fetch_one(pool)
    .await?;
    Ok(max.unwrap_or(0) + 1)
}

pub async fn delete_submission(
    pool: &PgPool,
    workspace_id: Uuid,
    submission_id: Uuid,
) -> Result<bool> {
    let result = sqlx::query("DELETE FROM submissions WHERE id = $1 AND workspace_id = $2")
        .bind(submission_id)
        .bind(workspace_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_members(
    pool: &PgPool,
    workspace_id: Uuid,
    member_ids: &[Uuid],
) -> Result<Vec<Member>> {
    let members = sqlx::query_as::<_, Member>(
        "SELECT id, workspace_id, full_name, email, created_at
         FROM members WHERE workspace_id = $1 AND id = ANY($2)",
    )
    .bind(workspace_id)
    .bind(member_ids)
    .fetch_all(pool)
    .await?;
    Ok(members)
}

/// Merged response profile for one member: every SUBMITTED submission,
/// oldest first, folded into one map so later answers win.
pub async fn member_profile(
    pool: &PgPool,
    workspace_id: Uuid,
    member_id: Uuid,
) -> Result<Profile> {
    let submissions = sqlx::query_as::<_, Submission>(
        "SELECT id, workspace_id, form_id, member_id, responses, status, revision, created_at
         FROM submissions
         WHERE workspace_id = $1 AND member_id = $2 AND status = 'SUBMITTED'
         ORDER BY created_at ASC",
    )
    .bind(workspace_id)
    .bind(member_id)
    .fetch_all(pool)
    .await?;

    let mut profile = Profile::new();
    for submission in submissions {
        if let serde_json::Value::Object(map) = submission.responses {
            for (key, value) in map {
                profile.insert(key, value);
            }
        }
    }
    Ok(profile)
}

pub async fn insert_document(
    pool: &PgPool,
    workspace_id: Uuid,
    document: &IssuedDocument,
) -> Result<()> {
    let issued_at = Utc
        .timestamp_opt(document.issued_at, 0)
        .single()
        .unwrap_or_else(Utc::now);
    sqlx::query(
        "INSERT INTO documents (id, workspace_id, member_id, reference, report_type, recipient, qr_payload, issued_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(Uuid::new_v4())
    .bind(workspace_id)
    .bind(document.member_id)
    .bind(&document.reference)
    .bind(&document.report_type)
    .bind(&document.recipient)
    .bind(&document.qr_payload)
    .bind(issued_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_document_by_reference(
    pool: &PgPool,
    reference: &str,
) -> Result<Option<VerificationRecord>> {
    let record = sqlx::query_as::<_, VerificationRecord>(
        "SELECT d.reference, w.name AS workspace_name, d.recipient, d.report_type, d.issued_at
         FROM documents d JOIN workspaces w ON w.id = d.workspace_id
         WHERE d.reference = $1",
    )
    .bind(reference)
    .fetch_optional(pool)
    .await?;
    Ok(record)
}
