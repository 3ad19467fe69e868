//! Wire representation exchanged with the form server

use serde::{Deserialize, Deserializer, Serialize};

/// One entry of an answer's `choices` array: either a bare choice id, or an
/// object carrying an optional choice id and a text value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireChoice {
    Id(String),
    #[serde(rename_all = "camelCase")]
    Entry {
        #[serde(default)]
        choice_id: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        value: String,
    },
}

impl WireChoice {
    pub fn text(value: &str) -> Self {
        Self::Entry {
            choice_id: None,
            value: value.to_string(),
        }
    }

    /// The referenced choice id, if any
    pub fn choice_id(&self) -> Option<&str> {
        let id = match self {
            Self::Id(id) => Some(id.as_str()),
            Self::Entry { choice_id, .. } => choice_id.as_deref(),
        };
        id.filter(|id| !id.is_empty())
    }

    /// Text of a free-text entry (one without a choice id)
    pub fn free_text(&self) -> Option<&str> {
        match self {
            Self::Entry {
                choice_id: None,
                value,
            } => Some(value.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDocument {
    pub id: String,
    #[serde(default)]
    pub persisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Normalized answer body for one question
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAnswer {
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<WireChoice>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub documents: Vec<WireDocument>,
}

impl WireAnswer {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            ..Default::default()
        }
    }

    /// No text, no choices and no documents
    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty() && self.choices.is_empty() && self.documents.is_empty()
    }
}

/// A translated answer addressed to one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPayload {
    pub question_id: String,
    pub answer: WireAnswer,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
