//! Report templates: HTML layouts fed to the PDF renderer. A registry
//! dispatches per workspace, falling back to the generic layout when no
//! bespoke template is registered.

pub mod assets;
pub mod generic;

use crate::services::resolver::{
    AttendanceRow, CertificateData, ReceiptData, TranscriptData,
};
use chrono::{DateTime, Utc};
use generic::GenericTemplate;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use uuid::Uuid;

/// Workspace identity rendered into every document header.
#[derive(Debug, Clone)]
pub struct Branding {
    pub workspace_name: String,
    pub logo_data_uri: Option<String>,
    pub accent_color: Option<String>,
}

pub enum ReportBody<'a> {
    Transcript(&'a TranscriptData),
    Certificate(&'a CertificateData),
    Receipt(&'a ReceiptData),
    Attendance { rows: &'a [AttendanceRow] },
}

pub struct ReportContext<'a> {
    pub branding: &'a Branding,
    pub body: ReportBody<'a>,
    pub reference: &'a str,
    pub verify_url: &'a str,
    pub qr_payload: &'a str,
    pub issued_at: DateTime<Utc>,
}

pub trait ReportTemplate: Send + Sync {
    fn render(&self, ctx: &ReportContext) -> String;
}

/// Per-workspace template dispatch with a generic fallback.
pub struct TemplateRegistry {
    custom: HashMap<Uuid, Arc<dyn ReportTemplate>>,
    fallback: Arc<dyn ReportTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            custom: HashMap::new(),
            fallback: Arc::new(GenericTemplate),
        }
    }

    pub fn register(&mut self, workspace_id: Uuid, template: Arc<dyn ReportTemplate>) {
        self.custom.insert(workspace_id, template);
    }

    pub fn template_for(&self, workspace_id: Uuid) -> Arc<dyn ReportTemplate> {
        self.custom
            .get(&workspace_id)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// HTML-escapes text interpolated into a document.
pub fn esc(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

pub const DEFAULT_ACCENT: &str = "#1d3557";

/// Incremental HTML document builder. One `.page` div per physical page;
/// print CSS forces a break after each.
pub struct HtmlDoc {
    buf: String,
}

impl HtmlDoc {
    pub fn new(title: &str, accent: &str) -> Self {
        let mut buf = String::with_capacity(4096);
        let _ = write!(
            buf,
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title><style>\
             body{{font-family:Georgia,'Times New Roman',serif;color:#222;margin:0;}}\
             .page{{padding:48px 56px;page-break-after:always;}}\
             .page:last-child{{page-break-after:auto;}}\
             header{{display:flex;align-items:center;gap:16px;border-bottom:3px solid {accent};padding-bottom:12px;margin-bottom:24px;}}\
             header img{{height:56px;}}\
             header .ws{{font-size:20px;font-weight:bold;color:{accent};}}\
             h1{{font-size:24px;color:{accent};margin:8px 0 16px;}}\
             h2{{font-size:18px;margin:16px 0 8px;}}\
             p{{margin:8px 0;line-height:1.5;}}\
             table{{width:100%;border-collapse:collapse;margin:12px 0;}}\
             th,td{{border:1px solid #ccc;padding:6px 10px;text-align:left;font-size:13px;}}\
             th{{background:{accent};color:#fff;}}\
             dl{{display:grid;grid-template-columns:180px 1fr;gap:4px 12px;margin:12px 0;}}\
             dt{{font-weight:bold;}}dd{{margin:0;}}\
             footer{{margin-top:32px;border-top:1px solid #ccc;padding-top:10px;font-size:11px;color:#555;}}\
             .qr{{width:96px;height:96px;border:1px dashed #999;margin-top:8px;}}\
             </style></head><body>",
            esc(title),
            accent = accent,
        );
        Self { buf }
    }

    pub fn start_page(&mut self) {
        self.buf.push_str("<div class=\"page\">");
    }

    pub fn end_page(&mut self) {
        self.buf.push_str("</div>");
    }

    pub fn header(&mut self, branding: &Branding, heading: &str) {
        self.buf.push_str("<header>");
        if let Some(logo) = &branding.logo_data_uri {
            let _ = write!(self.buf, "<img src=\"{}\" alt=\"logo\">", logo);
        }
        let _ = write!(
            self.buf,
            "<div class=\"ws\">{}</div></header><h1>{}</h1>",
            esc(&branding.workspace_name),
            esc(heading),
        );
    }

    pub fn heading(&mut self, text: &str) {
        let _ = write!(self.buf, "<h2>{}</h2>", esc(text));
    }

    pub fn paragraph(&mut self, text: &str) {
        let _ = write!(self.buf, "<p>{}</p>", esc(text));
    }

    pub fn kv_list(&mut self, pairs: &[(&str, &str)]) {
        self.buf.push_str("<dl>");
        for (key, value) in pairs {
            let _ = write!(self.buf, "<dt>{}</dt><dd>{}</dd>", esc(key), esc(value));
        }
        self.buf.push_str("</dl>");
    }

    pub fn table(&mut self, headers: &[&str], rows: &[Vec<String>]) {
        self.buf.push_str("<table><thead><tr>");
        for header in headers {
            let _ = write!(self.buf, "<th>{}</th>", esc(header));
        }
        self.buf.push_str("</tr></thead><tbody>");
        for row in rows {
            self.buf.push_str("<tr>");
            for cell in row {
                let _ = write!(self.buf, "<td>{}</td>", esc(cell));
            }
            self.buf.push_str("</tr>");
        }
        self.buf.push_str("</tbody></table>");
    }

    /// Reference line, verification link, and the QR payload as a data
    /// attribute for the renderer's QR hook to pick up.
    pub fn verification_footer(&mut self, reference: &str, verify_url: &str, qr_payload: &str) {
        let _ = write!(
            self.buf,
            "<footer><div>Reference: <strong>{}</strong></div>\
             <div>Verify at <a href=\"{}\">{}</a></div>\
             <div class=\"qr\" data-qr-payload=\"{}\"></div></footer>",
            esc(reference),
            esc(verify_url),
            esc(verify_url),
            esc(qr_payload),
        );
    }

    pub fn finish(mut self) -> String {
        self.buf.push_str("</body></html>");
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn esc_neutralizes_markup() {
        assert_eq!(
            esc(r#"<b>"x" & 'y'</b>"#),
            "&lt;b&gt;&quot;x&quot; &amp; &#x27;y&#x27;&lt;/b&gt;"
        );
    }

    #[test]
    fn registry_falls_back_to_the_generic_template() {
        struct Bespoke;
        impl ReportTemplate for Bespoke {
            fn render(&self, _ctx: &ReportContext) -> String {
                "bespoke".into()
            }
        }

        let tenant = Uuid::new_v4();
        let mut registry = TemplateRegistry::new();
        registry.register(tenant, Arc::new(Bespoke));

        let branding = Branding {
            workspace_name: "Acme".into(),
            logo_data_uri: None,
            accent_color: None,
        };
        let cert = crate::services::resolver::CertificateData {
            recipient_name: "Jane".into(),
            program: "CS".into(),
            completion_date: "2024-06-30".into(),
            custom_fields: Vec::new(),
        };
        let ctx = ReportContext {
            branding: &branding,
            body: ReportBody::Certificate(&cert),
            reference: "CRT-1",
            verify_url: "http://localhost:3000/verify/CRT-1",
            qr_payload: "payload",
            issued_at: Utc::now(),
        };

        assert_eq!(registry.template_for(tenant).render(&ctx), "bespoke");
        let generic = registry.template_for(Uuid::new_v4()).render(&ctx);
        assert!(generic.contains("Jane"));
    }
}
