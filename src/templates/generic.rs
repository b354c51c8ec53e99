//! The default document layouts used when a workspace has no bespoke
//! template registered.

use super::{HtmlDoc, ReportBody, ReportContext, ReportTemplate};
use crate::services::resolver::{
    AttendanceRow, CertificateData, ReceiptData, TranscriptData,
};
use std::fmt::Write;

pub struct GenericTemplate;

impl ReportTemplate for GenericTemplate {
    fn render(&self, ctx: &ReportContext) -> String {
        let accent = ctx
            .branding
            .accent_color
            .as_deref()
            .unwrap_or(super::DEFAULT_ACCENT);
        match &ctx.body {
            ReportBody::Transcript(data) => render_transcript(ctx, accent, data),
            ReportBody::Certificate(data) => render_certificate(ctx, accent, data),
            ReportBody::Receipt(data) => render_receipt(ctx, accent, data),
            ReportBody::Attendance { rows } => render_attendance(ctx, accent, rows),
        }
    }
}

fn custom_field_rows(fields: &[(String, String)]) -> Vec<Vec<String>> {
    fields
        .iter()
        .map(|(k, v)| vec![k.clone(), v.clone()])
        .collect()
}

fn render_transcript(ctx: &ReportContext, accent: &str, data: &TranscriptData) -> String {
    let mut doc = HtmlDoc::new("Academic Transcript", accent);
    for page in &data.pages {
        doc.start_page();
        doc.header(ctx.branding, "Academic Transcript");
        doc.kv_list(&[
            ("Student", &data.student_name),
            ("Registration Number", &data.reg_number),
            ("Program", &data.program),
            ("Intake Year", &data.intake_year.to_string()),
        ]);
        let section = format!("{} {}", page.title, page.period);
        let section = section.trim();
        if !section.is_empty() {
            doc.heading(section);
        }
        if page.results.is_empty() {
            doc.paragraph("No results recorded.");
        } else {
            let rows: Vec<Vec<String>> = page
                .results
                .iter()
                .map(|r| {
                    vec![
                        r.course.clone(),
                        r.grade.clone(),
                        r.credits.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            doc.table(&["Course", "Grade", "Credits"], &rows);
        }
        let mut summary: Vec<(&str, &str)> = Vec::new();
        if let Some(gpa) = &data.gpa {
            summary.push(("GPA", gpa));
        }
        if let Some(credits) = &data.total_credits {
            summary.push(("Total Credits", credits));
        }
        if !summary.is_empty() {
            doc.kv_list(&summary);
        }
        if !data.custom_fields.is_empty() {
            doc.heading("Additional Information");
            doc.table(&["Field", "Value"], &custom_field_rows(&data.custom_fields));
        }
        doc.verification_footer(ctx.reference, ctx.verify_url, ctx.qr_payload);
        doc.end_page();
    }
    doc.finish()
}

fn render_certificate(ctx: &ReportContext, accent: &str, data: &CertificateData) -> String {
    let mut doc = HtmlDoc::new("Certificate of Completion", accent);
    doc.start_page();
    doc.header(ctx.branding, "Certificate of Completion");
    doc.paragraph("This is to certify that");
    doc.heading(&data.recipient_name);
    let mut sentence = String::new();
    let _ = write!(
        sentence,
        "has successfully completed {} on {}.",
        data.program, data.completion_date
    );
    doc.paragraph(&sentence);
    if !data.custom_fields.is_empty() {
        doc.table(&["Field", "Value"], &custom_field_rows(&data.custom_fields));
    }
    doc.verification_footer(ctx.reference, ctx.verify_url, ctx.qr_payload);
    doc.end_page();
    doc.finish()
}

fn render_receipt(ctx: &ReportContext, accent: &str, data: &ReceiptData) -> String {
    let mut doc = HtmlDoc::new("Payment Receipt", accent);
    doc.start_page();
    doc.header(ctx.branding, "Payment Receipt");
    let amount = format!("{:.2} {}", data.amount, data.currency);
    doc.kv_list(&[
        ("Received From", &data.payer_name),
        ("Amount", &amount),
        ("Payment Method", &data.payment_method),
        ("Transaction ID", &data.transaction_id),
        ("Date", &data.payment_date),
    ]);
    if !data.custom_fields.is_empty() {
        doc.table(&["Field", "Value"], &custom_field_rows(&data.custom_fields));
    }
    doc.verification_footer(ctx.reference, ctx.verify_url, ctx.qr_payload);
    doc.end_page();
    doc.finish()
}

fn render_attendance(ctx: &ReportContext, accent: &str, rows: &[AttendanceRow]) -> String {
    let mut doc = HtmlDoc::new("Attendance Sheet", accent);
    doc.start_page();
    doc.header(ctx.branding, "Attendance Sheet");
    doc.paragraph(&format!("Members listed: {}", rows.len()));
    let table_rows: Vec<Vec<String>> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            vec![
                (i + 1).to_string(),
                row.full_name.clone(),
                row.reg_number.clone(),
                row.program.clone(),
                String::new(),
            ]
        })
        .collect();
    doc.table(
        &["#", "Name", "Reg Number", "Program", "Signature"],
        &table_rows,
    );
    doc.verification_footer(ctx.reference, ctx.verify_url, ctx.qr_payload);
    doc.end_page();
    doc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::resolver::{ActivityPage, ResultRow};
    use crate::templates::Branding;
    use chrono::Utc;

    fn branding() -> Branding {
        Branding {
            workspace_name: "Acme Institute".into(),
            logo_data_uri: None,
            accent_color: None,
        }
    }

    fn ctx<'a>(branding: &'a Branding, body: ReportBody<'a>) -> ReportContext<'a> {
        ReportContext {
            branding,
            body,
            reference: "REF-1",
            verify_url: "http://localhost:3000/verify/REF-1",
            qr_payload: "signed-payload",
            issued_at: Utc::now(),
        }
    }

    #[test]
    fn user_text_is_escaped_in_output() {
        let b = branding();
        let cert = CertificateData {
            recipient_name: r#"Jane <script>&"Doe"</script>"#.into(),
            program: "CS".into(),
            completion_date: "2024-06-30".into(),
            custom_fields: Vec::new(),
        };
        let html = GenericTemplate.render(&ctx(&b, ReportBody::Certificate(&cert)));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Jane &lt;script&gt;&amp;&quot;Doe&quot;&lt;/script&gt;"));
    }

    #[test]
    fn attendance_lists_every_member_on_one_page() {
        let b = branding();
        let rows = vec![
            AttendanceRow {
                full_name: "Amy".into(),
                reg_number: "R-1".into(),
                program: "Law".into(),
            },
            AttendanceRow {
                full_name: "Ben".into(),
                reg_number: "R-2".into(),
                program: "Law".into(),
            },
            AttendanceRow {
                full_name: "Cleo".into(),
                reg_number: "R-3".into(),
                program: "Law".into(),
            },
        ];
        let html = GenericTemplate.render(&ctx(&b, ReportBody::Attendance { rows: &rows }));
        assert!(html.contains("Members listed: 3"));
        for name in ["Amy", "Ben", "Cleo"] {
            assert!(html.contains(name));
        }
        assert_eq!(html.matches("class=\"page\"").count(), 1);
    }

    #[test]
    fn transcript_renders_one_page_per_activity() {
        let b = branding();
        let data = TranscriptData {
            student_name: "Jane".into(),
            reg_number: "R-1".into(),
            program: "CS".into(),
            intake_year: 2022,
            gpa: Some("3.8".into()),
            total_credits: None,
            pages: vec![
                ActivityPage {
                    title: "Year One".into(),
                    period: "2022".into(),
                    results: vec![ResultRow {
                        course: "Intro".into(),
                        grade: "A".into(),
                        credits: Some("10".into()),
                    }],
                },
                ActivityPage {
                    title: "Year Two".into(),
                    period: "2023".into(),
                    results: Vec::new(),
                },
            ],
            custom_fields: Vec::new(),
        };
        let html = GenericTemplate.render(&ctx(&b, ReportBody::Transcript(&data)));
        assert_eq!(html.matches("class=\"page\"").count(), 2);
        let one = html.find("Year One").unwrap();
        let two = html.find("Year Two").unwrap();
        assert!(one < two);
        assert!(html.contains("No results recorded."));
    }

    #[test]
    fn footer_carries_reference_link_and_qr_payload() {
        let b = branding();
        let receipt = ReceiptData {
            payer_name: "Jane".into(),
            amount: 1500.0,
            currency: "RWF".into(),
            payment_method: "Cash".into(),
            transaction_id: "TXN-1".into(),
            payment_date: "2024-06-30".into(),
            custom_fields: Vec::new(),
        };
        let html = GenericTemplate.render(&ctx(&b, ReportBody::Receipt(&receipt)));
        assert!(html.contains("REF-1"));
        assert!(html.contains("http://localhost:3000/verify/REF-1"));
        assert!(html.contains("data-qr-payload=\"signed-payload\""));
        assert!(html.contains("1500.00 RWF"));
    }
}
