//! Structural validation of a decoded reply against the question-paper contract.
//!
//! Every field is checked for presence, JSON type and (for `question_type`)
//! enum membership before a value is built. The first violation aborts with a
//! [`SchemaViolation`] naming the offending path, e.g.
//! `questions[3].marks: expected a number, found string`. Nothing partially
//! populated ever escapes.
//!
//! Optional fields may be missing or `null`; both mean "use the default".
//! Keys outside the contract are ignored.

use crate::schema::{QuestionDetail, QuestionPaper, QuestionType};
use serde_json::{Map, Value};
use std::fmt;

/// The first point where a reply departs from the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON path, e.g. `questions[0].question_type`. Empty for the root.
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for SchemaViolation {}

/// Validate a decoded reply and build the [`QuestionPaper`].
pub fn validate_paper(value: &Value) -> Result<QuestionPaper, SchemaViolation> {
    let root = as_object(value, "")?;

    let questions = match root.get("questions") {
        None => return Err(SchemaViolation::new("questions", "missing required field")),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| validate_question(item, &format!("questions[{i}]")))
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(SchemaViolation::new(
                "questions",
                format!("expected an array, found {}", kind(other)),
            ))
        }
    };

    let total_max_marks = required_marks(root, "", "total_max_marks")?;

    Ok(QuestionPaper {
        questions,
        total_max_marks,
    })
}

/// Validate one entry of `questions`.
pub fn validate_question(value: &Value, path: &str) -> Result<QuestionDetail, SchemaViolation> {
    let obj = as_object(value, path)?;

    let question_number = required_str(obj, path, "question_number")?;

    let type_str = required_str(obj, path, "question_type")?;
    let question_type = QuestionType::from_wire(&type_str).ok_or_else(|| {
        SchemaViolation::new(
            join(path, "question_type"),
            format!(
                "expected one of {}, found {:?}",
                QuestionType::ALL.map(QuestionType::as_str).join("/"),
                type_str
            ),
        )
    })?;

    Ok(QuestionDetail {
        question_number,
        question_type,
        question_text: required_str(obj, path, "question_text")?,
        marks: required_marks(obj, path, "marks")?,
        is_choice_question: optional_bool(obj, path, "is_choice_question")?,
        choice_instruction: optional_str(obj, path, "choice_instruction")?,
        diagram_description: optional_str(obj, path, "diagram_description")?,
        sub_parts_mapping: optional_str(obj, path, "sub_parts_mapping")?,
    })
}

// ── Field helpers ────────────────────────────────────────────────────────────

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaViolation> {
    value.as_object().ok_or_else(|| {
        SchemaViolation::new(path, format!("expected an object, found {}", kind(value)))
    })
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    path: &str,
    field: &str,
) -> Result<&'a Value, SchemaViolation> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(SchemaViolation::new(
            join(path, field),
            "missing required field",
        )),
        Some(v) => Ok(v),
    }
}

fn type_error(path: &str, field: &str, expected: &str, found: &Value) -> SchemaViolation {
    SchemaViolation::new(
        join(path, field),
        format!("expected {expected}, found {}", kind(found)),
    )
}

fn required_str(obj: &Map<String, Value>, path: &str, field: &str) -> Result<String, SchemaViolation> {
    match required(obj, path, field)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(type_error(path, field, "a string", other)),
    }
}

fn required_marks(obj: &Map<String, Value>, path: &str, field: &str) -> Result<f64, SchemaViolation> {
    let value = required(obj, path, field)?;
    let n = value
        .as_f64()
        .ok_or_else(|| type_error(path, field, "a number", value))?;
    if !n.is_finite() || n < 0.0 {
        return Err(SchemaViolation::new(
            join(path, field),
            format!("must be a non-negative number, found {n}"),
        ));
    }
    Ok(n)
}

fn optional_bool(obj: &Map<String, Value>, path: &str, field: &str) -> Result<bool, SchemaViolation> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(type_error(path, field, "a boolean", other)),
    }
}

fn optional_str(obj: &Map<String, Value>, path: &str, field: &str) -> Result<String, SchemaViolation> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(type_error(path, field, "a string", other)),
    }
}
