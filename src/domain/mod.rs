pub mod fields;
pub mod report;
