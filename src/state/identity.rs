//! Identity and scoping types passed explicitly into every component

use serde::{Deserialize, Serialize};
use std::fmt;

/// The (respondent, form) pair that scopes one in-progress submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub respondent_id: String,
    pub form_id: String,
}

impl Identity {
    pub fn new(respondent_id: &str, form_id: &str) -> Self {
        Self {
            respondent_id: respondent_id.to_string(),
            form_id: form_id.to_string(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.form_id, self.respondent_id)
    }
}

/// Browser-session-like scope that owns staged uploads
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// A fresh random session id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Where a staged file belongs: (session, form, question)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadScope {
    pub session_id: SessionId,
    pub form_id: String,
    pub question_id: String,
}

impl UploadScope {
    pub fn new(session_id: &SessionId, form_id: &str, question_id: &str) -> Self {
        Self {
            session_id: session_id.clone(),
            form_id: form_id.to_string(),
            question_id: question_id.to_string(),
        }
    }
}
