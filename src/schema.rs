//! The question-paper data contract.
//!
//! [`QuestionPaper`] and [`QuestionDetail`] are what an extraction produces.
//! [`response_schema`] is the same shape expressed as the schema declaration
//! sent to the model, so the model is asked for exactly what
//! [`crate::pipeline::validate`] accepts.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Whether a question is answered by picking an option or by writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "MCQ")]
    Mcq,
    Subjective,
}

impl QuestionType {
    pub const ALL: [QuestionType; 2] = [QuestionType::Mcq, QuestionType::Subjective];

    /// Wire name used in the JSON contract.
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Mcq => "MCQ",
            QuestionType::Subjective => "Subjective",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted question. Sub-parts sharing a base number are merged into a
/// single value whose `marks` is the sum of the parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDetail {
    /// Identifier as printed, e.g. "1", "2a", "10".
    pub question_number: String,
    pub question_type: QuestionType,
    /// Full text with `$…$` inline and `$$…$$` display math.
    pub question_text: String,
    pub marks: f64,
    #[serde(default)]
    pub is_choice_question: bool,
    /// Verbatim choice instruction, empty when not a choice question.
    #[serde(default)]
    pub choice_instruction: String,
    /// Empty when the question has no figure.
    #[serde(default)]
    pub diagram_description: String,
    /// Part/mark breakdown, empty for single-part questions.
    #[serde(default)]
    pub sub_parts_mapping: String,
}

impl QuestionDetail {
    /// A single-part question with no optional fields set.
    pub fn new(
        question_number: impl Into<String>,
        question_type: QuestionType,
        question_text: impl Into<String>,
        marks: f64,
    ) -> Self {
        Self {
            question_number: question_number.into(),
            question_type,
            question_text: question_text.into(),
            marks,
            is_choice_question: false,
            choice_instruction: String::new(),
            diagram_description: String::new(),
            sub_parts_mapping: String::new(),
        }
    }

    pub fn has_diagram(&self) -> bool {
        !self.diagram_description.trim().is_empty()
    }

    pub fn has_sub_parts(&self) -> bool {
        !self.sub_parts_mapping.trim().is_empty()
    }
}

/// The full extraction result, questions in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionPaper {
    pub questions: Vec<QuestionDetail>,
    /// Maximum attainable score as reported by the model. Approximate for
    /// papers with choice questions; see [`crate::audit`].
    pub total_max_marks: f64,
}

impl QuestionPaper {
    /// Sum of `marks` over every question, alternatives included.
    pub fn marks_sum(&self) -> f64 {
        self.questions.iter().map(|q| q.marks).sum()
    }

    pub fn find(&self, question_number: &str) -> Option<&QuestionDetail> {
        self.questions
            .iter()
            .find(|q| q.question_number == question_number)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Field names of [`QuestionDetail`] in declaration order.
pub const QUESTION_FIELDS: [&str; 8] = [
    "question_number",
    "question_type",
    "question_text",
    "marks",
    "is_choice_question",
    "choice_instruction",
    "diagram_description",
    "sub_parts_mapping",
];

/// Schema declaration sent with the request (`responseSchema`).
///
/// Uses the OpenAPI subset the generateContent API accepts. Optional fields
/// are `nullable` and left out of `required` because the service cannot
/// express defaults.
pub fn response_schema() -> Value {
    let question = json!({
        "type": "OBJECT",
        "properties": {
            "question_number": {
                "type": "STRING",
                "description": "Question identifier as printed (e.g. '1', '2a', '10'). Parts such as 10A and 10B share one entry numbered '10'."
            },
            "question_type": {
                "type": "STRING",
                "enum": QuestionType::ALL.map(QuestionType::as_str),
                "description": "'MCQ' when labelled options (A)/(B)/(C)/(D) are present, otherwise 'Subjective'."
            },
            "question_text": {
                "type": "STRING",
                "description": "Complete question text in KaTeX LaTeX: $...$ inline, $$...$$ display. Includes every sub-part of the question number."
            },
            "marks": {
                "type": "NUMBER",
                "description": "Total marks for the question; the sum of all sub-part marks."
            },
            "is_choice_question": {
                "type": "BOOLEAN",
                "nullable": true,
                "description": "True for choice questions such as 'Answer any 2 out of 3'."
            },
            "choice_instruction": {
                "type": "STRING",
                "nullable": true,
                "description": "The choice instruction copied verbatim; empty string if not a choice question."
            },
            "diagram_description": {
                "type": "STRING",
                "nullable": true,
                "description": "Description of any diagram, figure, graph or table the question uses; empty string if none."
            },
            "sub_parts_mapping": {
                "type": "STRING",
                "nullable": true,
                "description": "Part structure with marks, e.g. 'Part A: 5 marks, Part B: 5 marks'; empty string for single-part questions."
            }
        },
        "required": ["question_number", "question_type", "question_text", "marks"],
        "propertyOrdering": QUESTION_FIELDS,
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "questions": {
                "type": "ARRAY",
                "items": question,
                "description": "Every question on the paper in document order. Sub-parts of one question number form a single entry."
            },
            "total_max_marks": {
                "type": "NUMBER",
                "description": "Maximum attainable score for the paper, counting choice groups only for the parts a candidate must answer."
            }
        },
        "required": ["questions", "total_max_marks"],
        "propertyOrdering": ["questions", "total_max_marks"],
    })
}
