//! Report generation pipeline: canonical mapping, reference issuance, HTML
//! rendering, PDF conversion, and packaging. A batch either produces one
//! aggregate PDF (attendance), one per-member PDF, or a ZIP of per-member
//! PDFs. Any render failure aborts the whole batch; there are no partial
//! bundles.

use crate::domain::report::ReportType;
use crate::services::pdf::{PdfRenderer, RenderError};
use crate::services::reference::{self, QrClaims, QrError};
use crate::services::resolver::{
    self, AttendanceRow, CanonicalReport, FieldLabelMap, Profile,
};
use crate::templates::{Branding, ReportBody, ReportContext, TemplateRegistry};
use chrono::Utc;
use std::io::{Cursor, Write};
use uuid::Uuid;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One member selected for the batch, with their merged response profile.
#[derive(Debug, Clone)]
pub struct MemberProfile {
    pub id: Uuid,
    pub full_name: String,
    pub responses: Profile,
}

/// Record of one issued document, persisted for later verification.
/// `member_id` is `None` for aggregate documents addressed to the workspace.
#[derive(Debug, Clone)]
pub struct IssuedDocument {
    pub member_id: Option<Uuid>,
    pub reference: String,
    pub recipient: String,
    pub report_type: String,
    pub qr_payload: String,
    pub issued_at: i64,
}

#[derive(Debug)]
pub enum ReportArtifact {
    Pdf { filename: String, bytes: Vec<u8> },
    Zip { filename: String, bytes: Vec<u8> },
}

impl ReportArtifact {
    pub fn content_type(&self) -> &'static str {
        match self {
            ReportArtifact::Pdf { .. } => "application/pdf",
            ReportArtifact::Zip { .. } => "application/zip",
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            ReportArtifact::Pdf { filename, .. } => filename,
            ReportArtifact::Zip { filename, .. } => filename,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            ReportArtifact::Pdf { bytes, .. } => bytes,
            ReportArtifact::Zip { bytes, .. } => bytes,
        }
    }
}

#[derive(Debug)]
pub struct ReportBundle {
    pub artifact: ReportArtifact,
    pub documents: Vec<IssuedDocument>,
}

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("at least one member is required")]
    EmptyMembers,
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Sign(#[from] QrError),
    #[error("zip packaging failed: {0}")]
    Zip(String),
}

#[allow(clippy::too_many_arguments)]
pub async fn generate_report_bundle(
    workspace_id: Uuid,
    report_type: ReportType,
    branding: &Branding,
    members: &[MemberProfile],
    labels: &FieldLabelMap,
    overrides: &Profile,
    templates: &TemplateRegistry,
    renderer: &dyn PdfRenderer,
    signing_key: &[u8],
    verify_base_url: &str,
) -> Result<ReportBundle, BundleError> {
    if members.is_empty() {
        return Err(BundleError::EmptyMembers);
    }

    let template = templates.template_for(workspace_id);
    let issued_at = Utc::now();

    if report_type.is_aggregate() {
        // One roster document covering every member, in request order.
        let rows: Vec<AttendanceRow> = members
            .iter()
            .map(|member| {
                let canonical = resolver::map_responses_to_canonical(
                    report_type,
                    &member.responses,
                    labels,
                    overrides,
                    &member.full_name,
                );
                match canonical {
                    CanonicalReport::Attendance(row) => row,
                    _ => unreachable!("attendance mapping yields attendance rows"),
                }
            })
            .collect();

        let doc_reference = reference::generate_reference(report_type.reference_prefix());
        let qr_payload = reference::sign_qr_payload(
            signing_key,
            &QrClaims {
                reference: doc_reference.clone(),
                workspace: branding.workspace_name.clone(),
                recipient: branding.workspace_name.clone(),
                issued_at: issued_at.timestamp(),
            },
        )?;
        let verify_url = reference::verification_url(verify_base_url, &doc_reference);
        let html = template.render(&ReportContext {
            branding,
            body: ReportBody::Attendance { rows: &rows },
            reference: &doc_reference,
            verify_url: &verify_url,
            qr_payload: &qr_payload,
            issued_at,
        });
        let bytes = renderer.render(&html).await?;

        let filename = format!(
            "{}_{}.pdf",
            sanitize_filename(&branding.workspace_name),
            report_type.as_str()
        );
        return Ok(ReportBundle {
            artifact: ReportArtifact::Pdf { filename, bytes },
            documents: vec![IssuedDocument {
                member_id: None,
                reference: doc_reference,
                recipient: branding.workspace_name.clone(),
                report_type: report_type.as_str().to_string(),
                qr_payload,
                issued_at: issued_at.timestamp(),
            }],
        });
    }

    let mut entries: Vec<(String, Vec<u8>)> = Vec::with_capacity(members.len());
    let mut documents = Vec::with_capacity(members.len());

    for member in members {
        let canonical = resolver::map_responses_to_canonical(
            report_type,
            &member.responses,
            labels,
            overrides,
            &member.full_name,
        );
        let recipient = canonical.recipient().to_string();
        let doc_reference = reference::generate_reference(report_type.reference_prefix());
        let qr_payload = reference::sign_qr_payload(
            signing_key,
            &QrClaims {
                reference: doc_reference.clone(),
                workspace: branding.workspace_name.clone(),
                recipient: recipient.clone(),
                issued_at: issued_at.timestamp(),
            },
        )?;
        let verify_url = reference::verification_url(verify_base_url, &doc_reference);

        let body = match &canonical {
            CanonicalReport::Transcript(data) => ReportBody::Transcript(data),
            CanonicalReport::Certificate(data) => ReportBody::Certificate(data),
            CanonicalReport::Receipt(data) => ReportBody::Receipt(data),
            CanonicalReport::Attendance(row) => ReportBody::Attendance {
                rows: std::slice::from_ref(row),
            },
        };
        let html = template.render(&ReportContext {
            branding,
            body,
            reference: &doc_reference,
            verify_url: &verify_url,
            qr_payload: &qr_payload,
            issued_at,
        });

        let bytes = match renderer.render(&html).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(member_id = %member.id, error = %err, "report render failed, aborting batch");
                return Err(err.into());
            }
        };

        // Entries are named from the registered member, not the resolved
        // recipient, so archive contents line up with the member roster even
        // when a profile's name answer says something else.
        let entry_name = unique_entry_name(&entries, &member.full_name, report_type);
        entries.push((entry_name, bytes));
        documents.push(IssuedDocument {
            member_id: Some(member.id),
            reference: doc_reference,
            recipient,
            report_type: report_type.as_str().to_string(),
            qr_payload,
            issued_at: issued_at.timestamp(),
        });
    }

    let artifact = if entries.len() == 1 {
        let (filename, bytes) = entries.pop().ok_or(BundleError::EmptyMembers)?;
        ReportArtifact::Pdf { filename, bytes }
    } else {
        let bytes = write_zip(&entries)?;
        let filename = format!(
            "{}_{}_bundle.zip",
            sanitize_filename(&branding.workspace_name),
            report_type.as_str()
        );
        ReportArtifact::Zip { filename, bytes }
    };

    Ok(ReportBundle {
        artifact,
        documents,
    })
}

/// `{MemberName}_{TYPE}.pdf`, with a numeric suffix on name collisions so two
/// members who share a name both survive inside the ZIP.
fn unique_entry_name(
    existing: &[(String, Vec<u8>)],
    member_name: &str,
    report_type: ReportType,
) -> String {
    let base = format!("{}_{}", sanitize_filename(member_name), report_type.as_str());
    let mut candidate = format!("{base}.pdf");
    let mut counter = 2;
    while existing.iter().any(|(name, _)| name == &candidate) {
        candidate = format!("{base}_{counter}.pdf");
        counter += 1;
    }
    candidate
}

/// Keeps alphanumerics, `-` and `_`; whitespace becomes `_`; everything else
/// is dropped. An all-stripped name falls back to "document".
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect();
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

fn write_zip(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, BundleError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));
    for (name, bytes) in entries {
        writer
            .start_file(name, options)
            .map_err(|e| BundleError::Zip(e.to_string()))?;
        writer
            .write_all(bytes)
            .map_err(|e| BundleError::Zip(e.to_string()))?;
    }
    let cursor = writer.finish().map_err(|e| BundleError::Zip(e.to_string()))?;
    Ok(cursor.into_inner())
}
