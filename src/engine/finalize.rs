//! Submission finalizer
//!
//! Runs translate and validate, refreshes the session's staged uploads
//! (translating and validating again when the listing succeeds) and writes.
//! After a successful write the draft synchronizer is closed, staged uploads
//! of the form are swept and the remote draft is deleted. Only validation and the
//! answer write can fail the operation.

use super::draft::DraftSynchronizer;
use super::uploads::{SweepReport, TempUploadManager};
use crate::codec::{encode_snapshot, AnswerPayload};
use crate::error::{ConsistencyError, FinalizeError, ValidationError};
use crate::remote::FormRemote;
use crate::state::{AnswerValue, FormDraftSnapshot, Identity, QuestionDefinition, QuestionType};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How answers are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeMode {
    /// One batched submission
    Create,
    /// One update per answer, addressed by the previously submitted answer id
    Edit {
        /// question id -> answer id
        existing: HashMap<String, String>,
    },
}

impl FinalizeMode {
    pub fn is_edit(&self) -> bool {
        matches!(self, Self::Edit { .. })
    }
}

/// Result of a successful finalize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOutcome {
    pub mode: FinalizeMode,
    pub answers_written: usize,
    /// Cleanup of staged uploads; informational only
    pub sweep: SweepReport,
    /// Whether the remote draft was deleted; informational only
    pub draft_deleted: bool,
}

pub struct SubmissionFinalizer {
    questions: Vec<QuestionDefinition>,
    remote: Arc<dyn FormRemote>,
}

impl SubmissionFinalizer {
    pub fn new(questions: Vec<QuestionDefinition>, remote: Arc<dyn FormRemote>) -> Self {
        Self { questions, remote }
    }

    pub fn questions(&self) -> &[QuestionDefinition] {
        &self.questions
    }

    /// Finalize the draft held by `drafts`
    pub async fn finalize(
        &self,
        drafts: &mut DraftSynchronizer,
        uploads: &mut TempUploadManager,
        mode: FinalizeMode,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        let identity = drafts.identity().clone();
        let snapshot = drafts.snapshot();

        let mut payloads = self.translate(&identity, uploads, &snapshot, &mode);
        self.validate(&payloads)?;

        // Uploads staged by another client of the session since the last listing
        match uploads.refresh().await {
            Ok(_) => {
                payloads = self.translate(&identity, uploads, &snapshot, &mode);
                self.validate(&payloads)?;
            }
            Err(e) => warn!(%identity, error = %e, "Could not refresh staged uploads, using known ones"),
        }

        let answers_written = match &mode {
            FinalizeMode::Create => self.submit(&identity, &payloads).await?,
            FinalizeMode::Edit { existing } => self.update(&payloads, existing).await?,
        };
        info!(%identity, answers = answers_written, edit = mode.is_edit(), "Answers written");

        drafts.close().await;
        let sweep = uploads.sweep(&identity.form_id).await;
        let draft_deleted = drafts.delete_remote().await;

        Ok(FinalizeOutcome {
            mode,
            answers_written,
            sweep,
            draft_deleted,
        })
    }

    /// Reconcile uploads and encode. In edit mode a question that has an
    /// existing answer but no local value is sent as an empty answer, so a
    /// cleared answer is cleared on the server too.
    fn translate(
        &self,
        identity: &Identity,
        uploads: &TempUploadManager,
        snapshot: &FormDraftSnapshot,
        mode: &FinalizeMode,
    ) -> Vec<AnswerPayload> {
        let mut snapshot = self.reconcile_uploads(identity, uploads, snapshot.clone());
        if let FinalizeMode::Edit { existing } = mode {
            for question in &self.questions {
                if existing.contains_key(&question.id) && snapshot.get(&question.id).is_none() {
                    snapshot.insert(&question.id, AnswerValue::empty_for(question.question_type));
                }
            }
        }
        encode_snapshot(&self.questions, &snapshot)
    }

    /// Substitute staged uploads into upload answers
    fn reconcile_uploads(
        &self,
        identity: &Identity,
        uploads: &TempUploadManager,
        mut snapshot: FormDraftSnapshot,
    ) -> FormDraftSnapshot {
        for question in self
            .questions
            .iter()
            .filter(|q| matches!(q.question_type, QuestionType::DocumentUpload { .. }))
        {
            let persisted = snapshot
                .get(&question.id)
                .map(|value| value.documents().to_vec())
                .unwrap_or_default();
            let resolved = uploads.resolve_documents(&identity.form_id, question, &persisted);
            if resolved != persisted {
                debug!(question_id = %question.id, documents = resolved.len(), "Using staged uploads");
                snapshot.insert(&question.id, AnswerValue::Documents(resolved));
            }
        }
        snapshot
    }

    fn validate(&self, payloads: &[AnswerPayload]) -> Result<(), ValidationError> {
        let answered: HashMap<&str, &AnswerPayload> = payloads
            .iter()
            .map(|p| (p.question_id.as_str(), p))
            .collect();

        let missing: Vec<String> = self
            .questions
            .iter()
            .filter(|q| q.mandatory)
            .filter(|q| {
                answered
                    .get(q.id.as_str())
                    .map_or(true, |p| p.answer.is_empty())
            })
            .map(|q| q.id.clone())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            debug!(missing = ?missing, "Finalize rejected");
            Err(ValidationError { missing })
        }
    }

    async fn submit(
        &self,
        identity: &Identity,
        payloads: &[AnswerPayload],
    ) -> Result<usize, FinalizeError> {
        self.remote
            .submit_answers(identity, payloads)
            .await
            .map_err(FinalizeError::Network)?;
        Ok(payloads.len())
    }

    /// Every answer id is checked before the first update is issued
    async fn update(
        &self,
        payloads: &[AnswerPayload],
        existing: &HashMap<String, String>,
    ) -> Result<usize, FinalizeError> {
        let unmatched: Vec<String> = payloads
            .iter()
            .filter(|p| !existing.contains_key(&p.question_id))
            .map(|p| p.question_id.clone())
            .collect();
        if !unmatched.is_empty() {
            return Err(ConsistencyError {
                questions: unmatched,
            }
            .into());
        }

        for payload in payloads {
            let Some(answer_id) = existing.get(&payload.question_id) else {
                continue;
            };
            self.remote
                .update_answer(answer_id, payload)
                .await
                .map_err(FinalizeError::Network)?;
            debug!(answer_id = %answer_id, question_id = %payload.question_id, "Answer updated");
        }
        Ok(payloads.len())
    }
}
