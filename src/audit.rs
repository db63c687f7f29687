//! Marks audit and light content checks on an extracted paper.
//!
//! The audit is advisory: it reports, it never edits the paper. Totals for
//! papers with internal choice ("attempt any two of Q5–Q7") are approximate
//! by nature, so a mismatch between the declared total and the summed marks
//! is surfaced as data rather than treated as an error.

use crate::schema::QuestionPaper;
use serde::Serialize;
use std::fmt;

const MARKS_EPSILON: f64 = 1e-6;

/// Summary of how a paper's marks add up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarksAudit {
    /// `total_max_marks` as reported by the model.
    pub declared_total: f64,
    /// Sum of `marks` over every question.
    pub marks_sum: f64,
    /// Sum of `marks` over questions not flagged as choice questions.
    pub mandatory_sum: f64,
    pub choice_questions: usize,
    /// `declared_total` equals `marks_sum` (within 1e-6).
    pub totals_match: bool,
    pub warnings: Vec<AuditWarning>,
}

impl MarksAudit {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditWarning {
    /// More marks declared than the questions carry in total.
    DeclaredExceedsSum { declared: f64, sum: f64 },
    /// Fewer marks declared than the questions a candidate must answer.
    DeclaredBelowMandatory { declared: f64, mandatory: f64 },
    UnbalancedMath { question_number: String },
    MissingChoiceInstruction { question_number: String },
}

impl fmt::Display for AuditWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeclaredExceedsSum { declared, sum } => write!(
                f,
                "declared total {declared} exceeds the sum of all question marks ({sum})"
            ),
            Self::DeclaredBelowMandatory {
                declared,
                mandatory,
            } => write!(
                f,
                "declared total {declared} is below the marks of non-choice questions ({mandatory})"
            ),
            Self::UnbalancedMath { question_number } => {
                write!(f, "question {question_number}: unbalanced $ math delimiters")
            }
            Self::MissingChoiceInstruction { question_number } => write!(
                f,
                "question {question_number}: marked as a choice question but has no choice instruction"
            ),
        }
    }
}

/// Audit `paper`.
pub fn audit(paper: &QuestionPaper) -> MarksAudit {
    let marks_sum = paper.marks_sum();
    let mandatory_sum: f64 = paper
        .questions
        .iter()
        .filter(|q| !q.is_choice_question)
        .map(|q| q.marks)
        .sum();
    let choice_questions = paper
        .questions
        .iter()
        .filter(|q| q.is_choice_question)
        .count();
    let declared = paper.total_max_marks;

    let mut warnings = Vec::new();
    if declared > marks_sum + MARKS_EPSILON {
        warnings.push(AuditWarning::DeclaredExceedsSum {
            declared,
            sum: marks_sum,
        });
    }
    if declared + MARKS_EPSILON < mandatory_sum {
        warnings.push(AuditWarning::DeclaredBelowMandatory {
            declared,
            mandatory: mandatory_sum,
        });
    }
    for q in &paper.questions {
        if !math_delimiters_balanced(&q.question_text) {
            warnings.push(AuditWarning::UnbalancedMath {
                question_number: q.question_number.clone(),
            });
        }
        if q.is_choice_question && q.choice_instruction.trim().is_empty() {
            warnings.push(AuditWarning::MissingChoiceInstruction {
                question_number: q.question_number.clone(),
            });
        }
    }

    MarksAudit {
        declared_total: declared,
        marks_sum,
        mandatory_sum,
        choice_questions,
        totals_match: (declared - marks_sum).abs() <= MARKS_EPSILON,
        warnings,
    }
}

/// `true` when both inline `$…$` and display `$$…$$` delimiters pair up.
///
/// `$$` is read greedily left to right; `\$` is a literal dollar sign.
pub fn math_delimiters_balanced(text: &str) -> bool {
    let bytes = text.as_bytes();
    let (mut single, mut double) = (0usize, 0usize);
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' if bytes.get(i + 1) == Some(&b'$') => {
                double += 1;
                i += 2;
            }
            b'$' => {
                single += 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    single % 2 == 0 && double % 2 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{QuestionDetail, QuestionType};

    fn q(num: &str, marks: f64) -> QuestionDetail {
        QuestionDetail::new(num, QuestionType::Subjective, "Explain.", marks)
    }

    fn choice(num: &str, marks: f64) -> QuestionDetail {
        let mut d = q(num, marks);
        d.is_choice_question = true;
        d.choice_instruction = "Attempt any one".into();
        d
    }

    #[test]
    fn exact_total_is_clean() {
        let paper = QuestionPaper {
            questions: vec![q("1", 2.0), q("2", 3.5)],
            total_max_marks: 5.5,
        };
        let a = audit(&paper);
        assert!(a.totals_match);
        assert!(a.is_clean());
        assert_eq!(a.mandatory_sum, 5.5);
    }

    #[test]
    fn choice_paper_total_is_approximate_not_an_error() {
        // Q1 mandatory, answer one of Q2/Q3.
        let paper = QuestionPaper {
            questions: vec![q("1", 10.0), choice("2", 5.0), choice("3", 5.0)],
            total_max_marks: 15.0,
        };
        let a = audit(&paper);
        assert!(!a.totals_match);
        assert_eq!(a.choice_questions, 2);
        assert_eq!(a.marks_sum, 20.0);
        assert_eq!(a.mandatory_sum, 10.0);
        assert!(a.is_clean(), "unexpected: {:?}", a.warnings);
    }

    #[test]
    fn declared_total_out_of_range_warns() {
        let paper = QuestionPaper {
            questions: vec![q("1", 10.0), choice("2", 5.0)],
            total_max_marks: 20.0,
        };
        assert_eq!(
            audit(&paper).warnings,
            vec![AuditWarning::DeclaredExceedsSum {
                declared: 20.0,
                sum: 15.0
            }]
        );

        let paper = QuestionPaper {
            questions: vec![q("1", 10.0)],
            total_max_marks: 8.0,
        };
        assert!(matches!(
            audit(&paper).warnings[0],
            AuditWarning::DeclaredBelowMandatory { .. }
        ));
    }

    #[test]
    fn per_question_warnings() {
        let mut bad_math = q("4", 1.0);
        bad_math.question_text = "Solve $x^2 = 4".into();
        let mut no_instr = choice("5", 1.0);
        no_instr.choice_instruction.clear();
        let paper = QuestionPaper {
            questions: vec![bad_math, no_instr],
            total_max_marks: 2.0,
        };
        let w = audit(&paper).warnings;
        assert_eq!(w.len(), 2);
        assert_eq!(w[0].to_string(), "question 4: unbalanced $ math delimiters");
        assert!(matches!(w[1], AuditWarning::MissingChoiceInstruction { .. }));
    }

    #[test]
    fn delimiter_balance() {
        assert!(math_delimiters_balanced("no math"));
        assert!(math_delimiters_balanced("$a$ and $$\\int f$$"));
        assert!(math_delimiters_balanced("costs \\$5 and $x$"));
        assert!(!math_delimiters_balanced("$a"));
        assert!(!math_delimiters_balanced("$$a$"));
        assert!(!math_delimiters_balanced("$$ a"));
    }
}
