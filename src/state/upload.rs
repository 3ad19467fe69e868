//! Staged upload records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::answer::DocumentRef;
use super::identity::SessionId;

/// A file staged against a (session, form, question) scope, not yet a Document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempUpload {
    pub id: String,
    pub session_id: SessionId,
    pub form_id: String,
    pub question_id: String,
    pub filename: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl TempUpload {
    pub fn is_for(&self, form_id: &str, question_id: &str) -> bool {
        self.form_id == form_id && self.question_id == question_id
    }

    /// Reference used in answer payloads
    pub fn as_document_ref(&self) -> DocumentRef {
        DocumentRef::temp(&self.id).with_filename(&self.filename)
    }
}

/// File contents handed to the upload endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: &str, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: None,
            bytes,
        }
    }
}
