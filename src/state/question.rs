//! Question definitions and the closed set of question types

use serde::{Deserialize, Serialize};

/// The seven question types a form can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum QuestionType {
    Boolean,
    FreeText,
    SingleChoice,
    SingleChoiceWithText,
    MultiChoice,
    MultiChoiceWithText,
    DocumentUpload {
        /// Whether more than one document may be attached
        #[serde(default)]
        allow_multiple: bool,
    },
}

impl QuestionType {
    /// Whether answers of this type reference choices
    pub fn has_choices(&self) -> bool {
        matches!(
            self,
            Self::SingleChoice
                | Self::SingleChoiceWithText
                | Self::MultiChoice
                | Self::MultiChoiceWithText
        )
    }

    /// Upload questions that hold exactly one document reference
    pub fn is_single_upload(&self) -> bool {
        matches!(
            self,
            Self::DocumentUpload {
                allow_multiple: false
            }
        )
    }
}

/// A selectable choice under a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceDefinition {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub order_sequence: u32,
}

/// A question as defined by the form; immutable for the duration of an edit session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub order_sequence: u32,
    #[serde(default)]
    pub choices: Vec<ChoiceDefinition>,
}

impl QuestionDefinition {
    pub fn new(id: &str, title: &str, question_type: QuestionType) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            question_type,
            mandatory: false,
            section_id: None,
            order_sequence: 0,
            choices: Vec::new(),
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn with_choices(mut self, ids: &[&str]) -> Self {
        self.choices = ids
            .iter()
            .enumerate()
            .map(|(i, id)| ChoiceDefinition {
                id: id.to_string(),
                label: id.to_string(),
                order_sequence: i as u32 + 1,
            })
            .collect();
        self
    }

    /// Choices sorted for display
    pub fn choices_in_order(&self) -> Vec<&ChoiceDefinition> {
        let mut choices: Vec<_> = self.choices.iter().collect();
        choices.sort_by_key(|c| c.order_sequence);
        choices
    }
}
