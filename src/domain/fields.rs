use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One typed input in a workspace-authored form. A `section` field carries no
/// value; it only marks a step boundary in the multi-step renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Phone,
    Number,
    Textarea,
    Dropdown,
    Radio,
    Checkbox,
    Date,
    File,
    Section,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Number => "number",
            FieldType::Textarea => "textarea",
            FieldType::Dropdown => "dropdown",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::File => "file",
            FieldType::Section => "section",
        }
    }

    /// Checkbox is deliberately absent: a bare boolean checkbox is valid and
    /// only needs options when it offers a multi-select list.
    pub fn requires_options(&self) -> bool {
        matches!(self, FieldType::Dropdown | FieldType::Radio)
    }

    pub fn carries_value(&self) -> bool {
        !matches!(self, FieldType::Section)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("field {index} ({label:?}) has no id")]
    MissingId { index: usize, label: String },
    #[error("duplicate field id {0:?}")]
    DuplicateId(String),
    #[error("field {id:?} is a {field_type} and must declare options")]
    MissingOptions { id: String, field_type: &'static str },
}

/// Validates a descriptor list before it is persisted. Section fields may omit
/// an id (they never hold answers); every other field needs a unique one.
pub fn validate_descriptors(fields: &[FieldDescriptor]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for (index, field) in fields.iter().enumerate() {
        if !field.field_type.carries_value() {
            continue;
        }
        if field.id.trim().is_empty() {
            return Err(SchemaError::MissingId {
                index,
                label: field.label.clone(),
            });
        }
        if !seen.insert(field.id.clone()) {
            return Err(SchemaError::DuplicateId(field.id.clone()));
        }
        if field.field_type.requires_options()
            && field.options.as_ref().map_or(true, |o| o.is_empty())
        {
            return Err(SchemaError::MissingOptions {
                id: field.id.clone(),
                field_type: field.field_type.as_str(),
            });
        }
    }
    Ok(())
}

/// A submitted answer. Untagged so the wire shape stays plain JSON:
/// `true`, `3.5`, `"Jane"`, `["a","b"]`. File answers arrive as URL strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Whether the value counts as answered for required-field checks:
    /// empty strings, empty lists and `false` do not.
    pub fn is_answered(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Number(_) => true,
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::List(items) => !items.is_empty(),
        }
    }
}

pub type Responses = BTreeMap<String, FieldValue>;

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("unknown field id {0:?}")]
    UnknownField(String),
    #[error("field {0:?} is a section break and cannot hold a value")]
    SectionValue(String),
    #[error("field {id:?} expects a {expected} value")]
    TypeMismatch { id: String, expected: &'static str },
    #[error("value {value:?} is not one of the options for field {id:?}")]
    NotAnOption { id: String, value: String },
}

/// Boundary decode of a raw submission body against the form's descriptors.
/// Unknown ids, answers for section fields and shape mismatches are rejected
/// here rather than trusted downstream.
pub fn decode_responses(
    fields: &[FieldDescriptor],
    raw: &serde_json::Map<String, serde_json::Value>,
) -> Result<Responses, ResponseError> {
    let by_id: BTreeMap<&str, &FieldDescriptor> = fields
        .iter()
        .filter(|f| !f.id.is_empty())
        .map(|f| (f.id.as_str(), f))
        .collect();

    let mut out = Responses::new();
    for (key, value) in raw {
        let field = by_id
            .get(key.as_str())
            .ok_or_else(|| ResponseError::UnknownField(key.clone()))?;
        if !field.field_type.carries_value() {
            return Err(ResponseError::SectionValue(key.clone()));
        }
        if value.is_null() {
            continue;
        }
        let decoded = decode_value(field, value)?;
        out.insert(key.clone(), decoded);
    }
    Ok(out)
}

fn decode_value(
    field: &FieldDescriptor,
    value: &serde_json::Value,
) -> Result<FieldValue, ResponseError> {
    use serde_json::Value;
    let mismatch = |expected: &'static str| ResponseError::TypeMismatch {
        id: field.id.clone(),
        expected,
    };
    match field.field_type {
        FieldType::Text
        | FieldType::Email
        | FieldType::Phone
        | FieldType::Textarea
        | FieldType::Date
        | FieldType::File => match value {
            Value::String(s) => Ok(FieldValue::Text(s.clone())),
            _ => Err(mismatch("string")),
        },
        FieldType::Number => match value {
            Value::Number(n) => Ok(FieldValue::Number(
                n.as_f64().ok_or_else(|| mismatch("number"))?,
            )),
            _ => Err(mismatch("number")),
        },
        FieldType::Dropdown | FieldType::Radio => match value {
            Value::String(s) => {
                let known = field
                    .options
                    .as_ref()
                    .map_or(false, |opts| opts.iter().any(|o| o == s));
                if known || s.is_empty() {
                    Ok(FieldValue::Text(s.clone()))
                } else {
                    Err(ResponseError::NotAnOption {
                        id: field.id.clone(),
                        value: s.clone(),
                    })
                }
            }
            _ => Err(mismatch("string")),
        },
        FieldType::Checkbox => match value {
            Value::Bool(b) => Ok(FieldValue::Bool(*b)),
            Value::Array(items) => {
                let mut picked = Vec::with_capacity(items.len());
                for item in items {
                    let Value::String(s) = item else {
                        return Err(mismatch("string array"));
                    };
                    let known = field
                        .options
                        .as_ref()
                        .map_or(false, |opts| opts.iter().any(|o| o == s));
                    if !known {
                        return Err(ResponseError::NotAnOption {
                            id: field.id.clone(),
                            value: s.clone(),
                        });
                    }
                    picked.push(s.clone());
                }
                Ok(FieldValue::List(picked))
            }
            _ => Err(mismatch("bool or string array")),
        },
        FieldType::Section => Err(ResponseError::SectionValue(field.id.clone())),
    }
}

/// A maximal run of non-section fields, titled by the section that opened it.
/// Derived on every render, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct FormStep {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

impl FormStep {
    fn empty() -> Self {
        FormStep {
            title: None,
            description: None,
            fields: Vec::new(),
        }
    }

    fn is_blank(&self) -> bool {
        self.fields.is_empty() && self.title.is_none()
    }
}

/// Splits the flat field list into wizard steps at every `section` field.
/// The first step is untitled; each section titles the step it opens. Steps
/// with no fields and no title are dropped, but a form with nothing left
/// still yields exactly one empty step.
pub fn build_steps(fields: &[FieldDescriptor]) -> Vec<FormStep> {
    let mut steps = Vec::new();
    let mut current = FormStep::empty();

    for field in fields {
        if field.field_type == FieldType::Section {
            if !current.is_blank() {
                steps.push(current);
            }
            current = FormStep::empty();
            if !field.label.is_empty() {
                current.title = Some(field.label.clone());
            }
            current.description = field.placeholder.clone();
        } else {
            current.fields.push(field.clone());
        }
    }
    if !current.is_blank() {
        steps.push(current);
    }

    if steps.is_empty() {
        steps.push(FormStep::empty());
    }
    steps
}

/// Required-field check for one step. Returns the ids of every required field
/// whose answer is missing or empty; an empty result means the step passes.
pub fn validate_step(step_fields: &[FieldDescriptor], values: &Responses) -> Vec<String> {
    step_fields
        .iter()
        .filter(|f| f.required && f.field_type.carries_value())
        .filter(|f| values.get(&f.id).map_or(true, |v| !v.is_answered()))
        .map(|f| f.id.clone())
        .collect()
}

#[derive(Debug, PartialEq, Eq)]
pub enum Advance {
    Moved(usize),
    Completed,
}

/// Wizard navigation over the derived steps. `advance` gates on the current
/// step's required fields; `back` never validates; no transition skips steps.
pub struct Stepper {
    steps: Vec<FormStep>,
    current: usize,
}

impl Stepper {
    pub fn new(fields: &[FieldDescriptor]) -> Self {
        Stepper {
            steps: build_steps(fields),
            current: 0,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> &FormStep {
        &self.steps[self.current]
    }

    pub fn steps(&self) -> &[FormStep] {
        &self.steps
    }

    pub fn advance(&mut self, values: &Responses) -> Result<Advance, Vec<String>> {
        let missing = validate_step(&self.steps[self.current].fields, values);
        if !missing.is_empty() {
            return Err(missing);
        }
        if self.current + 1 < self.steps.len() {
            self.current += 1;
            Ok(Advance::Moved(self.current))
        } else {
            Ok(Advance::Completed)
        }
    }

    pub fn back(&mut self) -> usize {
        self.current = self.current.saturating_sub(1);
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(id: &str, required: bool) -> FieldDescriptor {
        FieldDescriptor {
            id: id.to_string(),
            field_type: FieldType::Text,
            label: id.to_string(),
            required,
            placeholder: None,
            options: None,
        }
    }

    fn section(label: &str) -> FieldDescriptor {
        FieldDescriptor {
            id: String::new(),
            field_type: FieldType::Section,
            label: label.to_string(),
            required: false,
            placeholder: None,
            options: None,
        }
    }

    #[test]
    fn no_sections_yields_one_step() {
        let fields = vec![text("a", false), text("b", true), text("c", false)];
        let steps = build_steps(&fields);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].fields.len(), 3);
        assert!(steps[0].title.is_none());
    }

    #[test]
    fn steps_concatenate_to_original_field_list() {
        let fields = vec![
            text("a", false),
            section("One"),
            text("b", false),
            text("c", false),
            section("Two"),
            text("d", false),
        ];
        let steps = build_steps(&fields);
        let flattened: Vec<&str> = steps
            .iter()
            .flat_map(|s| s.fields.iter().map(|f| f.id.as_str()))
            .collect();
        assert_eq!(flattened, vec!["a", "b", "c", "d"]);
        assert_eq!(steps[1].title.as_deref(), Some("One"));
        assert_eq!(steps[2].title.as_deref(), Some("Two"));
    }

    #[test]
    fn empty_form_yields_exactly_one_empty_step() {
        let steps = build_steps(&[]);
        assert_eq!(steps.len(), 1);
        assert!(steps[0].fields.is_empty());
    }

    #[test]
    fn leading_section_titles_the_first_step() {
        let fields = vec![section("Intro"), text("a", false)];
        let steps = build_steps(&fields);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].title.as_deref(), Some("Intro"));
    }

    #[test]
    fn titled_section_with_no_fields_is_kept() {
        let fields = vec![text("a", false), section("Notes")];
        let steps = build_steps(&fields);
        assert_eq!(steps.len(), 2);
        assert!(steps[1].fields.is_empty());
        assert_eq!(steps[1].title.as_deref(), Some("Notes"));
    }

    #[test]
    fn validate_step_ignores_optional_fields() {
        let fields = vec![text("a", false)];
        assert!(validate_step(&fields, &Responses::new()).is_empty());
    }

    #[test]
    fn validate_step_rejects_empty_answers() {
        let mut fields = vec![text("a", true)];
        fields.push(FieldDescriptor {
            id: "agree".into(),
            field_type: FieldType::Checkbox,
            label: "Agree".into(),
            required: true,
            placeholder: None,
            options: None,
        });

        let mut values = Responses::new();
        values.insert("a".into(), FieldValue::Text(String::new()));
        values.insert("agree".into(), FieldValue::Bool(false));
        let missing = validate_step(&fields, &values);
        assert_eq!(missing, vec!["a".to_string(), "agree".to_string()]);

        values.insert("a".into(), FieldValue::Text("ok".into()));
        values.insert("agree".into(), FieldValue::Bool(true));
        assert!(validate_step(&fields, &values).is_empty());
    }

    #[test]
    fn stepper_walks_a_two_step_form() {
        let fields = vec![text("name", true), section("Contact"), {
            let mut f = text("email", true);
            f.field_type = FieldType::Email;
            f
        }];
        let mut stepper = Stepper::new(&fields);
        assert_eq!(stepper.steps().len(), 2);

        // Empty answers fail on the first step, naming the field.
        let err = stepper.advance(&Responses::new()).unwrap_err();
        assert_eq!(err, vec!["name".to_string()]);
        assert_eq!(stepper.current_index(), 0);

        let mut values = Responses::new();
        values.insert("name".into(), FieldValue::Text("Jane".into()));
        assert_eq!(stepper.advance(&values).unwrap(), Advance::Moved(1));

        // Back never validates.
        assert_eq!(stepper.back(), 0);
        assert_eq!(stepper.advance(&values).unwrap(), Advance::Moved(1));

        values.insert("email".into(), FieldValue::Text("jane@example.com".into()));
        assert_eq!(stepper.advance(&values).unwrap(), Advance::Completed);
    }

    #[test]
    fn decode_rejects_unknown_ids_and_type_mismatches() {
        let fields = vec![text("name", true), {
            let mut f = text("age", false);
            f.field_type = FieldType::Number;
            f
        }];
        let raw: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(r#"{"name":"Jane","age":21}"#).unwrap();
        let decoded = decode_responses(&fields, &raw).unwrap();
        assert_eq!(decoded.get("age"), Some(&FieldValue::Number(21.0)));

        let raw: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(r#"{"ghost":"x"}"#).unwrap();
        assert!(matches!(
            decode_responses(&fields, &raw),
            Err(ResponseError::UnknownField(_))
        ));

        let raw: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(r#"{"age":"old"}"#).unwrap();
        assert!(matches!(
            decode_responses(&fields, &raw),
            Err(ResponseError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn decode_checks_choice_membership() {
        let fields = vec![FieldDescriptor {
            id: "color".into(),
            field_type: FieldType::Dropdown,
            label: "Color".into(),
            required: false,
            placeholder: None,
            options: Some(vec!["red".into(), "blue".into()]),
        }];
        let raw: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(r#"{"color":"green"}"#).unwrap();
        assert!(matches!(
            decode_responses(&fields, &raw),
            Err(ResponseError::NotAnOption { .. })
        ));
    }

    #[test]
    fn descriptor_validation_catches_duplicates_and_missing_options() {
        let fields = vec![text("a", false), text("a", false)];
        assert!(matches!(
            validate_descriptors(&fields),
            Err(SchemaError::DuplicateId(_))
        ));

        let fields = vec![FieldDescriptor {
            id: "pick".into(),
            field_type: FieldType::Radio,
            label: "Pick".into(),
            required: false,
            placeholder: None,
            options: None,
        }];
        assert!(matches!(
            validate_descriptors(&fields),
            Err(SchemaError::MissingOptions { .. })
        ));

        // Sections never need an id.
        assert!(validate_descriptors(&[section("Part")]).is_ok());
    }

    #[test]
    fn boolean_checkbox_needs_no_options() {
        let fields = vec![FieldDescriptor {
            id: "consent".into(),
            field_type: FieldType::Checkbox,
            label: "I agree".into(),
            required: true,
            placeholder: None,
            options: None,
        }];
        validate_descriptors(&fields).unwrap();

        // The same descriptor accepts a plain boolean answer.
        let raw: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(r#"{"consent":true}"#).unwrap();
        let decoded = decode_responses(&fields, &raw).unwrap();
        assert_eq!(decoded.get("consent"), Some(&FieldValue::Bool(true)));
    }
}
