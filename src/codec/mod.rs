//! Answer codec: local answer values to and from the wire representation
//!
//! Encoding is total. Decoding tolerates missing, null and malformed fields
//! and falls back to the question type's empty default. For every type,
//! `decode(ty, &encode(ty, v)) == normalize(ty, v)`.

mod wire;

pub use wire::{AnswerPayload, WireAnswer, WireChoice, WireDocument};

use crate::state::{
    dedup_ids, present_text, AnswerValue, DocumentRef, FormDraftSnapshot, QuestionDefinition,
    QuestionType, YesNo,
};
use std::collections::HashMap;

/// Encode a local value for the given question type
pub fn encode(question_type: QuestionType, value: &AnswerValue) -> WireAnswer {
    if !value.matches(question_type) {
        tracing::debug!(?question_type, "Encoding value of mismatched shape as empty");
        return WireAnswer::default();
    }

    match normalize(question_type, value) {
        AnswerValue::Boolean(answer) => {
            WireAnswer::with_value(answer.map(|a| a.as_str()).unwrap_or_default())
        }
        AnswerValue::Text(text) => WireAnswer::with_value(text.as_deref().unwrap_or_default()),
        AnswerValue::Choice(choice_id) => WireAnswer {
            choices: choice_id.into_iter().map(WireChoice::Id).collect(),
            ..Default::default()
        },
        AnswerValue::ChoiceWithText { choice_id, text } => match (text, choice_id) {
            (Some(text), _) => WireAnswer {
                choices: vec![WireChoice::text(&text)],
                value: text,
                documents: Vec::new(),
            },
            (None, Some(choice_id)) => WireAnswer {
                choices: vec![WireChoice::Entry {
                    choice_id: Some(choice_id),
                    value: String::new(),
                }],
                ..Default::default()
            },
            (None, None) => WireAnswer::default(),
        },
        AnswerValue::MultiChoice(choice_ids) => WireAnswer {
            choices: choice_ids.into_iter().map(WireChoice::Id).collect(),
            ..Default::default()
        },
        AnswerValue::MultiChoiceWithText { choice_ids, text } => {
            let mut choices: Vec<WireChoice> = choice_ids.into_iter().map(WireChoice::Id).collect();
            if let Some(text) = text {
                choices.push(WireChoice::text(&text));
            }
            WireAnswer {
                choices,
                ..Default::default()
            }
        }
        AnswerValue::Documents(docs) => WireAnswer {
            documents: docs
                .into_iter()
                .map(|d| WireDocument {
                    id: d.id,
                    persisted: d.persisted,
                    filename: d.filename,
                })
                .collect(),
            ..Default::default()
        },
    }
}

/// Decode a wire answer; never fails
pub fn decode(question_type: QuestionType, wire: &WireAnswer) -> AnswerValue {
    let decoded = match question_type {
        QuestionType::Boolean => AnswerValue::Boolean(YesNo::parse(&wire.value)),
        QuestionType::FreeText => {
            AnswerValue::Text(Some(wire.value.clone()).filter(|v| !v.is_empty()))
        }
        QuestionType::SingleChoice => {
            AnswerValue::Choice(wire.choices.iter().find_map(|c| c.choice_id()).map(str::to_string))
        }
        QuestionType::SingleChoiceWithText => {
            let text = wire
                .choices
                .iter()
                .filter_map(|c| c.free_text())
                .find_map(|t| present_text(Some(t)))
                .or_else(|| present_text(Some(wire.value.as_str())));
            match text {
                Some(text) => AnswerValue::ChoiceWithText {
                    choice_id: None,
                    text: Some(text.to_string()),
                },
                None => AnswerValue::ChoiceWithText {
                    choice_id: wire
                        .choices
                        .iter()
                        .find_map(|c| c.choice_id())
                        .map(str::to_string),
                    text: None,
                },
            }
        }
        QuestionType::MultiChoice => AnswerValue::MultiChoice(choice_ids(wire)),
        QuestionType::MultiChoiceWithText => AnswerValue::MultiChoiceWithText {
            choice_ids: choice_ids(wire),
            text: wire
                .choices
                .iter()
                .filter_map(|c| c.free_text())
                .find_map(|t| present_text(Some(t)))
                .map(str::to_string),
        },
        QuestionType::DocumentUpload { .. } => AnswerValue::Documents(
            wire.documents
                .iter()
                .map(|d| DocumentRef {
                    id: d.id.clone(),
                    persisted: d.persisted,
                    filename: d.filename.clone(),
                })
                .collect(),
        ),
    };
    normalize(question_type, &decoded)
}

/// Decode an arbitrary JSON payload, treating anything malformed as empty
pub fn decode_json(question_type: QuestionType, json: &serde_json::Value) -> AnswerValue {
    match serde_json::from_value::<WireAnswer>(json.clone()) {
        Ok(wire) => decode(question_type, &wire),
        Err(e) => {
            tracing::debug!(?question_type, error = %e, "Malformed wire answer, using empty default");
            AnswerValue::empty_for(question_type)
        }
    }
}

/// Canonical form of a local value: whitespace-only text is absent, choice
/// ids are de-duplicated, a single-valued upload holds at most one reference.
pub fn normalize(question_type: QuestionType, value: &AnswerValue) -> AnswerValue {
    if !value.matches(question_type) {
        return AnswerValue::empty_for(question_type);
    }

    match value {
        AnswerValue::Boolean(answer) => AnswerValue::Boolean(*answer),
        AnswerValue::Text(text) => AnswerValue::Text(text.clone().filter(|t| !t.is_empty())),
        AnswerValue::Choice(choice_id) => {
            AnswerValue::Choice(choice_id.clone().filter(|id| !id.is_empty()))
        }
        AnswerValue::ChoiceWithText { choice_id, text } => {
            match present_text(text.as_deref()) {
                Some(text) => AnswerValue::ChoiceWithText {
                    choice_id: None,
                    text: Some(text.to_string()),
                },
                None => AnswerValue::ChoiceWithText {
                    choice_id: choice_id.clone().filter(|id| !id.is_empty()),
                    text: None,
                },
            }
        }
        AnswerValue::MultiChoice(ids) => AnswerValue::MultiChoice(dedup_ids(ids)),
        AnswerValue::MultiChoiceWithText { choice_ids, text } => {
            AnswerValue::MultiChoiceWithText {
                choice_ids: dedup_ids(choice_ids),
                text: present_text(text.as_deref()).map(str::to_string),
            }
        }
        AnswerValue::Documents(docs) => {
            AnswerValue::Documents(normalize_documents(question_type, docs))
        }
    }
}

fn normalize_documents(question_type: QuestionType, docs: &[DocumentRef]) -> Vec<DocumentRef> {
    let mut unique: Vec<DocumentRef> = Vec::new();
    for doc in docs.iter().filter(|d| !d.id.is_empty()) {
        if !unique
            .iter()
            .any(|u| u.id == doc.id && u.persisted == doc.persisted)
        {
            unique.push(doc.clone());
        }
    }

    if !question_type.is_single_upload() || unique.len() <= 1 {
        return unique;
    }

    // Single-valued: the newest staged upload wins over anything persisted
    let chosen = unique
        .iter()
        .rev()
        .find(|d| !d.persisted)
        .or_else(|| unique.last())
        .cloned();
    chosen.into_iter().collect()
}

fn choice_ids(wire: &WireAnswer) -> Vec<String> {
    let ids: Vec<String> = wire
        .choices
        .iter()
        .filter_map(|c| c.choice_id())
        .map(str::to_string)
        .collect();
    dedup_ids(&ids)
}

/// Translate a whole snapshot into per-question payloads, in question order.
/// Answers for unknown questions are skipped.
pub fn encode_snapshot(
    questions: &[QuestionDefinition],
    snapshot: &FormDraftSnapshot,
) -> Vec<AnswerPayload> {
    questions
        .iter()
        .filter_map(|q| {
            snapshot.get(&q.id).map(|value| AnswerPayload {
                question_id: q.id.clone(),
                answer: encode(q.question_type, value),
            })
        })
        .collect()
}

/// Build a snapshot from wire answers keyed by question id
pub fn decode_snapshot(
    questions: &[QuestionDefinition],
    answers: &HashMap<String, serde_json::Value>,
) -> FormDraftSnapshot {
    let mut snapshot = FormDraftSnapshot::new();
    for question in questions {
        if let Some(json) = answers.get(&question.id) {
            snapshot.insert(&question.id, decode_json(question.question_type, json));
        }
    }
    snapshot
}
