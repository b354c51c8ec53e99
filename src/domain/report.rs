use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SUPPORTED_REPORT_TYPES: [&str; 4] =
    ["TRANSCRIPT", "CERTIFICATE", "RECEIPT", "ATTENDANCE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportType {
    Transcript,
    Certificate,
    Receipt,
    Attendance,
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported report type {given:?}; expected one of TRANSCRIPT, CERTIFICATE, RECEIPT, ATTENDANCE")]
pub struct UnknownReportType {
    pub given: String,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Transcript => "TRANSCRIPT",
            ReportType::Certificate => "CERTIFICATE",
            ReportType::Receipt => "RECEIPT",
            ReportType::Attendance => "ATTENDANCE",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ReportType::Transcript => "Academic Transcript",
            ReportType::Certificate => "Certificate of Completion",
            ReportType::Receipt => "Payment Receipt",
            ReportType::Attendance => "Attendance Sheet",
        }
    }

    /// Prefix stamped onto generated reference numbers.
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            ReportType::Transcript => "TRN",
            ReportType::Certificate => "CRT",
            ReportType::Receipt => "RCP",
            ReportType::Attendance => "ATT",
        }
    }

    /// Attendance aggregates the whole member set into one roster document;
    /// every other type renders one document per member.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, ReportType::Attendance)
    }

    /// Trim + uppercase normalization; anything else is a hard rejection.
    pub fn parse(raw: &str) -> Result<Self, UnknownReportType> {
        match raw.trim().to_uppercase().as_str() {
            "TRANSCRIPT" => Ok(ReportType::Transcript),
            "CERTIFICATE" => Ok(ReportType::Certificate),
            "RECEIPT" => Ok(ReportType::Receipt),
            "ATTENDANCE" => Ok(ReportType::Attendance),
            _ => Err(UnknownReportType {
                given: raw.trim().to_string(),
            }),
        }
    }
}

/// Wire shape of a report-generation request. `report_type` stays raw until
/// validation so rejections can echo what the caller sent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportJob {
    pub report_type: String,
    pub member_ids: Vec<Uuid>,
    #[serde(default)]
    pub template_data: Option<serde_json::Map<String, serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        assert_eq!(ReportType::parse("attendance").unwrap(), ReportType::Attendance);
        assert_eq!(ReportType::parse("  Certificate ").unwrap(), ReportType::Certificate);
        assert_eq!(ReportType::parse("RECEIPT").unwrap(), ReportType::Receipt);
    }

    #[test]
    fn parse_rejects_unknown_types_naming_the_supported_set() {
        let err = ReportType::parse("BOGUS").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("BOGUS"));
        for supported in SUPPORTED_REPORT_TYPES {
            assert!(msg.contains(supported), "missing {supported} in {msg}");
        }
    }

    #[test]
    fn only_attendance_is_aggregate() {
        assert!(ReportType::Attendance.is_aggregate());
        assert!(!ReportType::Transcript.is_aggregate());
        assert!(!ReportType::Certificate.is_aggregate());
        assert!(!ReportType::Receipt.is_aggregate());
    }
}
