//! Trait abstraction for the form server to enable mocking in tests

use crate::codec::AnswerPayload;
use crate::state::{FormDraftSnapshot, Identity, SessionId, SiblingSet, TempUpload, UploadFile, UploadScope};
use anyhow::Result;
use async_trait::async_trait;

/// Remote operations consumed by the sync engine.
///
/// Every call is idempotent at its identity/element granularity except
/// `submit_answers`, which is issued at most once per finalize attempt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FormRemote: Send + Sync {
    /// Fetch the last stored draft, if any
    async fn fetch_draft(&self, identity: &Identity) -> Result<Option<FormDraftSnapshot>>;

    /// Replace the stored draft with a whole snapshot
    async fn write_draft(&self, identity: &Identity, snapshot: &FormDraftSnapshot) -> Result<()>;

    /// Delete the stored draft
    async fn delete_draft(&self, identity: &Identity) -> Result<()>;

    /// Create a submission from translated answers
    async fn submit_answers(&self, identity: &Identity, payloads: &[AnswerPayload]) -> Result<()>;

    /// Overwrite one previously submitted answer
    async fn update_answer(&self, answer_id: &str, payload: &AnswerPayload) -> Result<()>;

    /// Set an element's 1-based position within its sibling set
    async fn reorder_element(
        &self,
        parent: &SiblingSet,
        element_id: &str,
        new_sequence: u32,
    ) -> Result<()>;

    /// Stage a file
    async fn upload_temp(&self, scope: &UploadScope, file: UploadFile) -> Result<TempUpload>;

    /// All staged files of a session
    async fn list_temp_uploads(&self, session_id: &SessionId) -> Result<Vec<TempUpload>>;

    /// Delete one staged file
    async fn delete_temp_upload(&self, id: &str) -> Result<()>;
}
