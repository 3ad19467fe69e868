//! Draft snapshot and the command-driven update function

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::answer::{AnswerValue, DocumentRef, YesNo};
use super::question::QuestionType;

/// The entire in-progress answer set for one identity, keyed by question id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormDraftSnapshot {
    answers: BTreeMap<String, AnswerValue>,
}

/// An edit to one question's answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerCommand {
    /// Replace the whole value
    Set {
        question_id: String,
        value: AnswerValue,
    },
    SetBoolean {
        question_id: String,
        value: Option<YesNo>,
    },
    SetText {
        question_id: String,
        text: String,
    },
    /// Pick a single choice; clears any free text on choice-with-text questions
    SelectChoice {
        question_id: String,
        choice_id: Option<String>,
    },
    /// Free text of a choice-with-text question
    SetChoiceText {
        question_id: String,
        text: String,
    },
    ToggleChoice {
        question_id: String,
        choice_id: String,
    },
    /// The extra text entry of a multi-choice-with-text question
    SetOtherText {
        question_id: String,
        text: String,
    },
    AttachDocument {
        question_id: String,
        document: DocumentRef,
    },
    DetachDocument {
        question_id: String,
        document_id: String,
    },
    Clear {
        question_id: String,
    },
}

impl AnswerCommand {
    pub fn question_id(&self) -> &str {
        match self {
            Self::Set { question_id, .. }
            | Self::SetBoolean { question_id, .. }
            | Self::SetText { question_id, .. }
            | Self::SelectChoice { question_id, .. }
            | Self::SetChoiceText { question_id, .. }
            | Self::ToggleChoice { question_id, .. }
            | Self::SetOtherText { question_id, .. }
            | Self::AttachDocument { question_id, .. }
            | Self::DetachDocument { question_id, .. }
            | Self::Clear { question_id } => question_id,
        }
    }
}

impl FormDraftSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    pub fn insert(&mut self, question_id: &str, value: AnswerValue) {
        self.answers.insert(question_id.to_string(), value);
    }

    pub fn remove(&mut self, question_id: &str) -> Option<AnswerValue> {
        self.answers.remove(question_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.answers.iter()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Overlay `other` onto this snapshot; entries in `other` win whole
    pub fn merge_from(&mut self, other: FormDraftSnapshot) {
        self.answers.extend(other.answers);
    }

    /// Apply a command, returning the new snapshot. `question_type` is the
    /// type of the question the command targets; an existing value of the
    /// wrong shape is discarded first.
    pub fn apply(&self, question_type: QuestionType, command: &AnswerCommand) -> Self {
        let mut next = self.clone();
        let question_id = command.question_id();

        let current = self
            .answers
            .get(question_id)
            .filter(|value| value.matches(question_type))
            .cloned()
            .unwrap_or_else(|| AnswerValue::empty_for(question_type));

        match update_value(current, question_type, command) {
            Some(value) => next.insert(question_id, value),
            None => {
                next.remove(question_id);
            }
        }
        next
    }
}

/// `None` means the entry is removed
fn update_value(
    current: AnswerValue,
    question_type: QuestionType,
    command: &AnswerCommand,
) -> Option<AnswerValue> {
    let value = match (current, command) {
        (_, AnswerCommand::Clear { .. }) => return None,
        (_, AnswerCommand::Set { value, .. }) => {
            if value.matches(question_type) {
                value.clone()
            } else {
                tracing::debug!(?question_type, "Ignoring value of mismatched shape");
                AnswerValue::empty_for(question_type)
            }
        }
        (AnswerValue::Boolean(_), AnswerCommand::SetBoolean { value, .. }) => {
            AnswerValue::Boolean(*value)
        }
        (AnswerValue::Text(_), AnswerCommand::SetText { text, .. }) => {
            AnswerValue::Text(Some(text.clone()))
        }
        (AnswerValue::Choice(_), AnswerCommand::SelectChoice { choice_id, .. }) => {
            AnswerValue::Choice(choice_id.clone())
        }
        (AnswerValue::ChoiceWithText { text, .. }, AnswerCommand::SelectChoice { choice_id, .. }) => {
            AnswerValue::ChoiceWithText {
                choice_id: choice_id.clone(),
                text: if choice_id.is_some() { None } else { text },
            }
        }
        (
            AnswerValue::ChoiceWithText { choice_id, .. },
            AnswerCommand::SetChoiceText { text, .. },
        ) => {
            let typed = !text.trim().is_empty();
            AnswerValue::ChoiceWithText {
                choice_id: if typed { None } else { choice_id },
                text: Some(text.clone()),
            }
        }
        (AnswerValue::MultiChoice(ids), AnswerCommand::ToggleChoice { choice_id, .. }) => {
            AnswerValue::MultiChoice(toggle(ids, choice_id))
        }
        (
            AnswerValue::MultiChoiceWithText { choice_ids, text },
            AnswerCommand::ToggleChoice { choice_id, .. },
        ) => AnswerValue::MultiChoiceWithText {
            choice_ids: toggle(choice_ids, choice_id),
            text,
        },
        (
            AnswerValue::MultiChoiceWithText { choice_ids, .. },
            AnswerCommand::SetOtherText { text, .. },
        ) => AnswerValue::MultiChoiceWithText {
            choice_ids,
            text: Some(text.clone()),
        },
        (AnswerValue::Documents(mut docs), AnswerCommand::AttachDocument { document, .. }) => {
            if question_type.is_single_upload() {
                docs = vec![document.clone()];
            } else if !docs.contains(document) {
                docs.push(document.clone());
            }
            AnswerValue::Documents(docs)
        }
        (AnswerValue::Documents(mut docs), AnswerCommand::DetachDocument { document_id, .. }) => {
            docs.retain(|d| &d.id != document_id);
            AnswerValue::Documents(docs)
        }
        (current, command) => {
            tracing::debug!(
                ?question_type,
                question_id = command.question_id(),
                "Command does not apply to this question type"
            );
            current
        }
    };
    Some(value)
}

fn toggle(mut ids: Vec<String>, choice_id: &str) -> Vec<String> {
    if let Some(pos) = ids.iter().position(|id| id == choice_id) {
        ids.remove(pos);
    } else {
        ids.push(choice_id.to_string());
    }
    ids
}
