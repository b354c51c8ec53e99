//! Smart key resolution: maps workspace-authored response keys/labels onto
//! the canonical slots each report layout expects. Field ids and labels are
//! user-defined per workspace, so lookup is exact-then-fuzzy over an ordered
//! alias list per slot. Exact matches always win; the fuzzy substring pass
//! exists because workspaces name the same thing inconsistently
//! ("Reg Number" vs "Registration No" vs "Student ID").

use crate::domain::fields::FieldDescriptor;
use crate::domain::report::ReportType;
use crate::services::reference;
use chrono::{Datelike, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Response data for one member, keyed by field id (and, after expansion,
/// by label and normalized label too). Insertion-ordered: the fuzzy pass's
/// first-match-wins rule follows it.
pub type Profile = Map<String, Value>;

/// Derived index `field id -> human label`, built once per report job.
pub type FieldLabelMap = BTreeMap<String, String>;

pub fn field_label_map<'a>(
    fields: impl IntoIterator<Item = &'a FieldDescriptor>,
) -> FieldLabelMap {
    fields
        .into_iter()
        .filter(|f| !f.id.is_empty() && !f.label.is_empty())
        .map(|f| (f.id.clone(), f.label.clone()))
        .collect()
}

/// Lowercase with every character outside `[a-z0-9]` removed. Two keys are
/// equal when their normalized forms match.
pub fn normalize_key(s: &str) -> String {
    s.chars()
        .flat_map(|c| c.to_lowercase())
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Two-phase lookup. Phase one walks the candidates in priority order and
/// tries the normalized then the verbatim key. Phase two is the fuzzy
/// fallback: candidates longer than 3 characters match the first key whose
/// lowercase form contains them as a substring.
pub fn get_value<'a>(data: &'a Profile, candidates: &[&str]) -> Option<&'a Value> {
    for candidate in candidates {
        if let Some(v) = data.get(&normalize_key(candidate)) {
            return Some(v);
        }
        if let Some(v) = data.get(*candidate) {
            return Some(v);
        }
    }
    for candidate in candidates {
        if candidate.len() <= 3 {
            continue;
        }
        let needle = candidate.to_lowercase();
        for (key, value) in data {
            if key.to_lowercase().contains(&needle) {
                return Some(value);
            }
        }
    }
    None
}

/// For every entry keyed by a known field id, adds the resolved label and the
/// label's normalized form as extra keys to the same value. Duplication is
/// intentional: id, label and normalized label all stay valid downstream.
pub fn expand_profile(raw: &Profile, labels: &FieldLabelMap) -> Profile {
    let mut expanded = raw.clone();
    for (key, value) in raw {
        if let Some(label) = labels.get(key) {
            if !expanded.contains_key(label) {
                expanded.insert(label.clone(), value.clone());
            }
            let normalized = normalize_key(label);
            if !normalized.is_empty() && !expanded.contains_key(&normalized) {
                expanded.insert(normalized, value.clone());
            }
        }
    }
    expanded
}

fn merge_overrides(profile: &mut Profile, overrides: &Profile) {
    for (key, value) in overrides {
        profile.insert(key.clone(), value.clone());
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn get_string(data: &Profile, candidates: &[&str]) -> Option<String> {
    get_value(data, candidates)
        .and_then(scalar_to_string)
        .filter(|s| !s.trim().is_empty())
}

fn get_number(data: &Profile, candidates: &[&str]) -> Option<f64> {
    match get_value(data, candidates)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

// Ordered alias tables, most specific first. Kept as static consts so the
// matching policy is auditable and independently testable.
const NAME_ALIASES: &[&str] = &[
    "student name",
    "full name",
    "fullname",
    "member name",
    "name",
];
const REG_NUMBER_ALIASES: &[&str] = &[
    "registration number",
    "registration no",
    "reg number",
    "reg no",
    "student id",
    "regnumber",
];
const PROGRAM_ALIASES: &[&str] = &["program", "programme", "course", "department", "faculty"];
const INTAKE_YEAR_ALIASES: &[&str] = &[
    "intake year",
    "admission year",
    "year of entry",
    "intake",
    "year",
];
const GPA_ALIASES: &[&str] = &["cumulative gpa", "gpa", "grade point average"];
const TOTAL_CREDITS_ALIASES: &[&str] = &["total credits", "credits earned", "credits"];
const RESULTS_ALIASES: &[&str] = &["results", "grades", "marks", "scores"];
const HISTORY_ALIASES: &[&str] = &["academic history", "history", "activities"];
const AMOUNT_ALIASES: &[&str] = &["amount paid", "amount", "fee paid", "total", "price"];
const CURRENCY_ALIASES: &[&str] = &["currency"];
const PAYMENT_METHOD_ALIASES: &[&str] = &["payment method", "paid via", "method"];
const TRANSACTION_ID_ALIASES: &[&str] = &[
    "transaction id",
    "transaction reference",
    "receipt number",
    "transaction",
];
const PAYMENT_DATE_ALIASES: &[&str] = &["payment date", "date paid", "paid on"];
const COMPLETION_DATE_ALIASES: &[&str] = &[
    "completion date",
    "date of completion",
    "graduation date",
    "end date",
];

/// Normalized-key substrings that mark an entry as already covered by a
/// canonical slot; everything else scalar lands in `custom_fields`.
const STANDARD_KEY_MARKERS: &[&str] = &[
    "name",
    "regnumber",
    "registration",
    "studentid",
    "program",
    "course",
    "department",
    "faculty",
    "intake",
    "year",
    "amount",
    "currency",
    "payment",
    "transaction",
    "gpa",
    "credit",
    "result",
    "grade",
    "mark",
    "score",
    "date",
    "history",
    "email",
    "phone",
    "photo",
    "signature",
];

#[derive(Debug, Clone, serde::Serialize)]
pub struct ResultRow {
    pub course: String,
    pub grade: String,
    pub credits: Option<String>,
}

/// One physical transcript page: a historical activity and its result rows.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ActivityPage {
    pub title: String,
    pub period: String,
    pub results: Vec<ResultRow>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TranscriptData {
    pub student_name: String,
    pub reg_number: String,
    pub program: String,
    pub intake_year: i32,
    pub gpa: Option<String>,
    pub total_credits: Option<String>,
    /// Oldest first; always at least one page.
    pub pages: Vec<ActivityPage>,
    pub custom_fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CertificateData {
    pub recipient_name: String,
    pub program: String,
    pub completion_date: String,
    pub custom_fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ReceiptData {
    pub payer_name: String,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    pub transaction_id: String,
    pub payment_date: String,
    pub custom_fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AttendanceRow {
    pub full_name: String,
    pub reg_number: String,
    pub program: String,
}

#[derive(Debug, Clone)]
pub enum CanonicalReport {
    Transcript(TranscriptData),
    Certificate(CertificateData),
    Receipt(ReceiptData),
    Attendance(AttendanceRow),
}

impl CanonicalReport {
    pub fn recipient(&self) -> &str {
        match self {
            CanonicalReport::Transcript(d) => &d.student_name,
            CanonicalReport::Certificate(d) => &d.recipient_name,
            CanonicalReport::Receipt(d) => &d.payer_name,
            CanonicalReport::Attendance(d) => &d.full_name,
        }
    }
}

/// Full pipeline for one member: expand the raw profile by field labels,
/// merge caller overrides on top (overrides win), pull each canonical slot
/// through the alias tables, then sweep leftovers into `custom_fields`.
pub fn map_responses_to_canonical(
    report_type: ReportType,
    raw_profile: &Profile,
    labels: &FieldLabelMap,
    overrides: &Profile,
    fallback_name: &str,
) -> CanonicalReport {
    let mut data = expand_profile(raw_profile, labels);
    merge_overrides(&mut data, overrides);

    let name = get_string(&data, NAME_ALIASES).unwrap_or_else(|| fallback_name.to_string());

    match report_type {
        ReportType::Transcript => {
            let program = get_string(&data, PROGRAM_ALIASES).unwrap_or_else(|| "N/A".into());
            let intake_year = get_number(&data, INTAKE_YEAR_ALIASES)
                .map(|y| y as i32)
                .unwrap_or_else(|| Utc::now().year());
            let main_results = get_value(&data, RESULTS_ALIASES)
                .map(parse_results)
                .unwrap_or_default();
            let mut pages = get_value(&data, HISTORY_ALIASES)
                .map(parse_history)
                .unwrap_or_default();
            if pages.is_empty() {
                pages.push(ActivityPage {
                    title: program.clone(),
                    period: intake_year.to_string(),
                    results: main_results,
                });
            }
            CanonicalReport::Transcript(TranscriptData {
                student_name: name,
                reg_number: get_string(&data, REG_NUMBER_ALIASES).unwrap_or_else(|| "N/A".into()),
                program,
                intake_year,
                gpa: get_string(&data, GPA_ALIASES),
                total_credits: get_string(&data, TOTAL_CREDITS_ALIASES),
                pages,
                custom_fields: collect_custom_fields(&data),
            })
        }
        ReportType::Certificate => CanonicalReport::Certificate(CertificateData {
            recipient_name: name,
            program: get_string(&data, PROGRAM_ALIASES).unwrap_or_else(|| "N/A".into()),
            completion_date: get_string(&data, COMPLETION_DATE_ALIASES)
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
            custom_fields: collect_custom_fields(&data),
        }),
        ReportType::Receipt => CanonicalReport::Receipt(ReceiptData {
            payer_name: name,
            amount: get_number(&data, AMOUNT_ALIASES).unwrap_or(0.0),
            currency: get_string(&data, CURRENCY_ALIASES).unwrap_or_else(|| "RWF".into()),
            payment_method: get_string(&data, PAYMENT_METHOD_ALIASES)
                .unwrap_or_else(|| "Cash".into()),
            transaction_id: get_string(&data, TRANSACTION_ID_ALIASES)
                .unwrap_or_else(|| reference::generate_reference("TXN")),
            payment_date: get_string(&data, PAYMENT_DATE_ALIASES)
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
            custom_fields: collect_custom_fields(&data),
        }),
        ReportType::Attendance => CanonicalReport::Attendance(AttendanceRow {
            full_name: name,
            reg_number: get_string(&data, REG_NUMBER_ALIASES).unwrap_or_else(|| "N/A".into()),
            program: get_string(&data, PROGRAM_ALIASES).unwrap_or_else(|| "N/A".into()),
        }),
    }
}

/// Leftover scalar entries become extra display rows. Keys of the form
/// `field_*`, keys covered by a standard marker, and nested objects/arrays
/// (unrenderable blobs) are all skipped. Deduped on normalized key because
/// expansion inserts the same value under up to three keys.
fn collect_custom_fields(data: &Profile) -> Vec<(String, String)> {
    let mut seen = std::collections::HashSet::new();
    let mut custom = Vec::new();
    for (key, value) in data {
        if key.starts_with("field_") {
            continue;
        }
        let normalized = normalize_key(key);
        if normalized.is_empty()
            || STANDARD_KEY_MARKERS.iter().any(|m| normalized.contains(m))
        {
            continue;
        }
        let Some(rendered) = scalar_to_string(value) else {
            continue;
        };
        if seen.insert(normalized) {
            custom.push((key.clone(), rendered));
        }
    }
    custom
}

fn parse_results(value: &Value) -> Vec<ResultRow> {
    let Value::Array(rows) = value else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| {
            let Value::Object(obj) = row else { return None };
            let course = get_string(obj, &["course", "subject", "module", "title", "name"])?;
            let grade =
                get_string(obj, &["grade", "score", "mark", "result"]).unwrap_or_default();
            let credits = get_string(obj, &["credits", "credit", "units"]);
            Some(ResultRow {
                course,
                grade,
                credits,
            })
        })
        .collect()
}

/// Historical activities, one page each, in the stored (oldest-first) order.
fn parse_history(value: &Value) -> Vec<ActivityPage> {
    let Value::Array(entries) = value else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let Value::Object(obj) = entry else { return None };
            let title =
                get_string(obj, &["title", "program", "activity", "name"]).unwrap_or_default();
            let period =
                get_string(obj, &["period", "term", "session", "year", "date"]).unwrap_or_default();
            let results = obj
                .iter()
                .find(|(k, _)| RESULTS_ALIASES.contains(&normalize_key(k).as_str()))
                .map(|(_, v)| parse_results(v))
                .unwrap_or_default();
            if title.is_empty() && results.is_empty() {
                return None;
            }
            Some(ActivityPage {
                title,
                period,
                results,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(json: &str) -> Profile {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn normalize_strips_everything_but_alphanumerics() {
        assert_eq!(normalize_key("Reg. Number!"), "regnumber");
        assert_eq!(normalize_key("regnumber"), "regnumber");
        assert_eq!(normalize_key("  Intake Year (2024) "), "intakeyear2024");
    }

    #[test]
    fn get_value_hits_normalized_keys() {
        let data = profile(r#"{"regnumber": "X"}"#);
        let hit = get_value(&data, &["Reg Number"]).unwrap();
        assert_eq!(hit, &Value::String("X".into()));
    }

    #[test]
    fn get_value_prefers_exact_over_fuzzy() {
        let data = profile(r#"{"studentIdNumber": "fuzzy", "studentid": "exact"}"#);
        let hit = get_value(&data, &["Student Id"]).unwrap();
        assert_eq!(hit, &Value::String("exact".into()));
    }

    #[test]
    fn fuzzy_fallback_matches_substrings_for_long_candidates() {
        let data = profile(r#"{"studentIdNumber": "S-001"}"#);
        let hit = get_value(&data, &["studentId"]).unwrap();
        assert_eq!(hit, &Value::String("S-001".into()));

        // Candidates of 3 characters or fewer never go fuzzy.
        let data = profile(r#"{"candidate": "x"}"#);
        assert!(get_value(&data, &["did"]).is_none());
    }

    #[test]
    fn fuzzy_first_match_follows_insertion_order() {
        let data = profile(r#"{"Date of Birth": "1999-01-01", "Completion Date": "2024-06-30"}"#);
        let hit = get_value(&data, &["date"]).unwrap();
        assert_eq!(hit, &Value::String("1999-01-01".into()));
    }

    #[test]
    fn expansion_keeps_id_label_and_normalized_paths_valid() {
        let mut labels = FieldLabelMap::new();
        labels.insert("field_12".into(), "Reg Number".into());
        let raw = profile(r#"{"field_12": "RN-7"}"#);
        let expanded = expand_profile(&raw, &labels);
        assert_eq!(expanded.get("field_12").unwrap(), "RN-7");
        assert_eq!(expanded.get("Reg Number").unwrap(), "RN-7");
        assert_eq!(expanded.get("regnumber").unwrap(), "RN-7");
    }

    #[test]
    fn empty_receipt_gets_the_documented_defaults() {
        let out = map_responses_to_canonical(
            ReportType::Receipt,
            &Profile::new(),
            &FieldLabelMap::new(),
            &Profile::new(),
            "Jane Doe",
        );
        let CanonicalReport::Receipt(receipt) = out else {
            panic!("expected receipt");
        };
        assert_eq!(receipt.payer_name, "Jane Doe");
        assert_eq!(receipt.amount, 0.0);
        assert_eq!(receipt.currency, "RWF");
        assert_eq!(receipt.payment_method, "Cash");
        assert!(!receipt.transaction_id.is_empty());
    }

    #[test]
    fn overrides_win_over_profile_values() {
        let raw = profile(r#"{"amount": 100}"#);
        let overrides = profile(r#"{"amount": 250}"#);
        let out = map_responses_to_canonical(
            ReportType::Receipt,
            &raw,
            &FieldLabelMap::new(),
            &overrides,
            "Jane",
        );
        let CanonicalReport::Receipt(receipt) = out else {
            panic!("expected receipt");
        };
        assert_eq!(receipt.amount, 250.0);
    }

    #[test]
    fn custom_fields_keep_only_unclaimed_scalars() {
        let raw = profile(
            r#"{
                "field_1": "ignored id key",
                "Blood Group": "O+",
                "Emergency Contact": {"phone": "123"},
                "Hobbies": ["chess"],
                "Reg Number": "RN-1"
            }"#,
        );
        let out = map_responses_to_canonical(
            ReportType::Certificate,
            &raw,
            &FieldLabelMap::new(),
            &Profile::new(),
            "Jane",
        );
        let CanonicalReport::Certificate(cert) = out else {
            panic!("expected certificate");
        };
        assert_eq!(
            cert.custom_fields,
            vec![("Blood Group".to_string(), "O+".to_string())]
        );
    }

    #[test]
    fn transcript_mapping_fills_slots_and_defaults() {
        let mut labels = FieldLabelMap::new();
        labels.insert("field_9".into(), "Registration Number".into());
        let raw = profile(
            r#"{
                "field_9": "2023-0042",
                "Program": "Computer Science",
                "Intake Year": 2023,
                "results": [
                    {"course": "Algorithms", "grade": "A", "credits": 10},
                    {"course": "Databases", "grade": "B+"}
                ]
            }"#,
        );
        let out = map_responses_to_canonical(
            ReportType::Transcript,
            &raw,
            &labels,
            &Profile::new(),
            "Jane Doe",
        );
        let CanonicalReport::Transcript(t) = out else {
            panic!("expected transcript");
        };
        assert_eq!(t.student_name, "Jane Doe");
        assert_eq!(t.reg_number, "2023-0042");
        assert_eq!(t.program, "Computer Science");
        assert_eq!(t.intake_year, 2023);
        assert_eq!(t.pages.len(), 1);
        assert_eq!(t.pages[0].results.len(), 2);
        assert_eq!(t.pages[0].results[0].course, "Algorithms");
        assert_eq!(t.pages[0].results[0].credits.as_deref(), Some("10"));
    }

    #[test]
    fn transcript_history_renders_one_page_per_activity() {
        let raw = profile(
            r#"{
                "history": [
                    {"title": "Year One", "period": "2022", "results": [{"course": "Intro", "grade": "A"}]},
                    {"title": "Year Two", "period": "2023", "results": [{"course": "Advanced", "grade": "B"}]}
                ]
            }"#,
        );
        let out = map_responses_to_canonical(
            ReportType::Transcript,
            &raw,
            &FieldLabelMap::new(),
            &Profile::new(),
            "Jane",
        );
        let CanonicalReport::Transcript(t) = out else {
            panic!("expected transcript");
        };
        assert_eq!(t.pages.len(), 2);
        assert_eq!(t.pages[0].title, "Year One");
        assert_eq!(t.pages[1].title, "Year Two");
    }

    #[test]
    fn attendance_maps_to_a_roster_row() {
        let raw = profile(r#"{"Full Name": "Amy", "Reg Number": "R-9", "Program": "Law"}"#);
        let out = map_responses_to_canonical(
            ReportType::Attendance,
            &raw,
            &FieldLabelMap::new(),
            &Profile::new(),
            "fallback",
        );
        let CanonicalReport::Attendance(row) = out else {
            panic!("expected attendance row");
        };
        assert_eq!(row.full_name, "Amy");
        assert_eq!(row.reg_number, "R-9");
        assert_eq!(row.program, "Law");
    }
}
