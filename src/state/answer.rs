//! Local answer values

use serde::{Deserialize, Serialize};

use super::question::QuestionType;

/// Boolean answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            _ => None,
        }
    }
}

/// Reference to a document attached to an upload answer.
///
/// `persisted` distinguishes a stored Document from a staged TempUpload;
/// the two id spaces may overlap so the marker is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: String,
    #[serde(default)]
    pub persisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl DocumentRef {
    pub fn temp(id: &str) -> Self {
        Self {
            id: id.to_string(),
            persisted: false,
            filename: None,
        }
    }

    pub fn persisted(id: &str) -> Self {
        Self {
            id: id.to_string(),
            persisted: true,
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = Some(filename.to_string());
        self
    }
}

/// A per-question local answer; the variant must match the question's type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum AnswerValue {
    Boolean(Option<YesNo>),
    Text(Option<String>),
    Choice(Option<String>),
    ChoiceWithText {
        choice_id: Option<String>,
        text: Option<String>,
    },
    MultiChoice(Vec<String>),
    MultiChoiceWithText {
        choice_ids: Vec<String>,
        text: Option<String>,
    },
    Documents(Vec<DocumentRef>),
}

impl AnswerValue {
    /// The empty answer for a question type
    pub fn empty_for(question_type: QuestionType) -> Self {
        match question_type {
            QuestionType::Boolean => Self::Boolean(None),
            QuestionType::FreeText => Self::Text(None),
            QuestionType::SingleChoice => Self::Choice(None),
            QuestionType::SingleChoiceWithText => Self::ChoiceWithText {
                choice_id: None,
                text: None,
            },
            QuestionType::MultiChoice => Self::MultiChoice(Vec::new()),
            QuestionType::MultiChoiceWithText => Self::MultiChoiceWithText {
                choice_ids: Vec::new(),
                text: None,
            },
            QuestionType::DocumentUpload { .. } => Self::Documents(Vec::new()),
        }
    }

    /// Whether this value's shape is allowed for the question type
    pub fn matches(&self, question_type: QuestionType) -> bool {
        matches!(
            (self, question_type),
            (Self::Boolean(_), QuestionType::Boolean)
                | (Self::Text(_), QuestionType::FreeText)
                | (Self::Choice(_), QuestionType::SingleChoice)
                | (Self::ChoiceWithText { .. }, QuestionType::SingleChoiceWithText)
                | (Self::MultiChoice(_), QuestionType::MultiChoice)
                | (Self::MultiChoiceWithText { .. }, QuestionType::MultiChoiceWithText)
                | (Self::Documents(_), QuestionType::DocumentUpload { .. })
        )
    }

    /// Document references held by an upload answer
    pub fn documents(&self) -> &[DocumentRef] {
        match self {
            Self::Documents(docs) => docs,
            _ => &[],
        }
    }
}

/// Trimmed text, or `None` when empty or whitespace-only
pub fn present_text(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

/// Removes repeated ids, keeping the first occurrence's position
pub fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| !id.is_empty() && seen.insert(id.as_str()))
        .cloned()
        .collect()
}
