//! Temporary upload manager
//!
//! Files are staged per (session, form, question) before a submission
//! exists. Staged files always take precedence over documents persisted by
//! an earlier submission of the same question.

use crate::remote::FormRemote;
use crate::state::{DocumentRef, QuestionDefinition, SessionId, TempUpload, UploadFile, UploadScope};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a best-effort cleanup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    /// Ids that could not be deleted
    pub failed: Vec<String>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct TempUploadManager {
    session_id: SessionId,
    remote: Arc<dyn FormRemote>,
    /// Known staged files of this session, oldest first
    staged: Vec<TempUpload>,
}

impl TempUploadManager {
    pub fn new(session_id: SessionId, remote: Arc<dyn FormRemote>) -> Self {
        Self {
            session_id,
            remote,
            staged: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn scope(&self, form_id: &str, question_id: &str) -> UploadScope {
        UploadScope::new(&self.session_id, form_id, question_id)
    }

    /// Stage a file; it supersedes earlier uploads of the same scope
    pub async fn upload(
        &mut self,
        form_id: &str,
        question_id: &str,
        file: UploadFile,
    ) -> Result<TempUpload> {
        let scope = self.scope(form_id, question_id);
        let filename = file.filename.clone();
        let upload = self.remote.upload_temp(&scope, file).await?;
        info!(
            form_id,
            question_id,
            upload_id = %upload.id,
            filename = %filename,
            "Staged upload"
        );
        self.staged.push(upload.clone());
        Ok(upload)
    }

    /// Reload the staged files of this session from the server
    pub async fn refresh(&mut self) -> Result<&[TempUpload]> {
        let mut uploads = self.remote.list_temp_uploads(&self.session_id).await?;
        uploads.retain(|u| u.session_id == self.session_id);
        uploads.sort_by_key(|u| u.created_at);
        debug!(session = %self.session_id, count = uploads.len(), "Refreshed staged uploads");
        self.staged = uploads;
        Ok(&self.staged)
    }

    /// All known staged files of the session
    pub fn list(&self) -> &[TempUpload] {
        &self.staged
    }

    /// Staged files of one scope, oldest first
    pub fn for_scope(&self, form_id: &str, question_id: &str) -> Vec<&TempUpload> {
        self.staged
            .iter()
            .filter(|u| u.is_for(form_id, question_id))
            .collect()
    }

    /// The most recent staged file of a scope
    pub fn active_for(&self, form_id: &str, question_id: &str) -> Option<&TempUpload> {
        self.staged
            .iter()
            .filter(|u| u.is_for(form_id, question_id))
            .max_by_key(|u| u.created_at)
    }

    /// Delete one staged file
    pub async fn remove(&mut self, id: &str) -> Result<()> {
        self.remote.delete_temp_upload(id).await?;
        self.staged.retain(|u| u.id != id);
        debug!(upload_id = id, "Removed staged upload");
        Ok(())
    }

    /// Document references for an upload question. Staged files win over
    /// `persisted`; a single-valued question gets only the newest one.
    pub fn resolve_documents(
        &self,
        form_id: &str,
        question: &QuestionDefinition,
        persisted: &[DocumentRef],
    ) -> Vec<DocumentRef> {
        if question.question_type.is_single_upload() {
            if let Some(active) = self.active_for(form_id, &question.id) {
                return vec![active.as_document_ref()];
            }
        } else {
            let staged = self.for_scope(form_id, &question.id);
            if !staged.is_empty() {
                return staged.iter().map(|u| u.as_document_ref()).collect();
            }
        }
        persisted.to_vec()
    }

    /// Delete every staged file of a form in this session. Never fails:
    /// errors are logged and reported.
    pub async fn sweep(&mut self, form_id: &str) -> SweepReport {
        if let Err(e) = self.refresh().await {
            warn!(session = %self.session_id, error = %e, "Could not list staged uploads, sweeping known ones");
        }

        let targets: Vec<String> = self
            .staged
            .iter()
            .filter(|u| u.form_id == form_id)
            .map(|u| u.id.clone())
            .collect();

        let mut report = SweepReport::default();
        for id in targets {
            match self.remote.delete_temp_upload(&id).await {
                Ok(()) => {
                    self.staged.retain(|u| u.id != id);
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!(upload_id = %id, error = %e, "Failed to delete staged upload");
                    report.failed.push(id);
                }
            }
        }

        info!(
            session = %self.session_id,
            form_id,
            deleted = report.deleted,
            failed = report.failed.len(),
            "Swept staged uploads"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockFormRemote;
    use crate::state::QuestionType;
    use anyhow::anyhow;
    use chrono::{Duration, TimeZone, Utc};

    fn staged(id: &str, form: &str, question: &str, minute: i64) -> TempUpload {
        TempUpload {
            id: id.to_string(),
            session_id: SessionId::from("s1"),
            form_id: form.to_string(),
            question_id: question.to_string(),
            filename: format!("{id}.pdf"),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::minutes(minute),
        }
    }

    fn manager_with(mock: MockFormRemote, uploads: Vec<TempUpload>) -> TempUploadManager {
        let mut manager = TempUploadManager::new(SessionId::from("s1"), Arc::new(mock));
        manager.staged = uploads;
        manager
    }

    fn single_upload_question() -> QuestionDefinition {
        QuestionDefinition::new(
            "cv",
            "CV",
            QuestionType::DocumentUpload {
                allow_multiple: false,
            },
        )
    }

    mod staging {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_upload_uses_session_scope() {
            let mut mock = MockFormRemote::new();
            mock.expect_upload_temp()
                .withf(|scope, file| {
                    scope.session_id.as_str() == "s1"
                        && scope.form_id == "f1"
                        && scope.question_id == "cv"
                        && file.filename == "cv.pdf"
                })
                .times(1)
                .returning(|_, _| Ok(staged("t1", "f1", "cv", 0)));

            let mut manager = manager_with(mock, vec![]);
            let upload = manager
                .upload("f1", "cv", UploadFile::new("cv.pdf", vec![1, 2, 3]))
                .await
                .unwrap();

            assert_eq!(upload.id, "t1");
            assert_eq!(manager.list().len(), 1);
        }

        #[tokio::test]
        async fn test_failed_upload_is_not_cached() {
            let mut mock = MockFormRemote::new();
            mock.expect_upload_temp()
                .returning(|_, _| Err(anyhow!("too large")));

            let mut manager = manager_with(mock, vec![]);
            let result = manager
                .upload("f1", "cv", UploadFile::new("cv.pdf", vec![]))
                .await;
            assert!(result.is_err());
            assert!(manager.list().is_empty());
        }

        #[test]
        fn test_newest_upload_is_active() {
            let manager = manager_with(
                MockFormRemote::new(),
                vec![
                    staged("old", "f1", "cv", 0),
                    staged("new", "f1", "cv", 5),
                    staged("other", "f1", "photo", 9),
                ],
            );
            assert_eq!(manager.active_for("f1", "cv").map(|u| u.id.as_str()), Some("new"));
            assert_eq!(manager.for_scope("f1", "cv").len(), 2);
            assert!(manager.active_for("f2", "cv").is_none());
        }

        #[tokio::test]
        async fn test_refresh_replaces_cache_sorted() {
            let mut mock = MockFormRemote::new();
            mock.expect_list_temp_uploads()
                .withf(|session| session.as_str() == "s1")
                .returning(|_| Ok(vec![staged("b", "f1", "q", 3), staged("a", "f1", "q", 1)]));

            let mut manager = manager_with(mock, vec![staged("stale", "f1", "q", 0)]);
            let ids: Vec<_> = manager
                .refresh()
                .await
                .unwrap()
                .iter()
                .map(|u| u.id.clone())
                .collect();
            assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        }

        #[tokio::test]
        async fn test_remove_drops_from_cache() {
            let mut mock = MockFormRemote::new();
            mock.expect_delete_temp_upload()
                .withf(|id| id == "t1")
                .times(1)
                .returning(|_| Ok(()));

            let mut manager = manager_with(mock, vec![staged("t1", "f1", "cv", 0)]);
            manager.remove("t1").await.unwrap();
            assert!(manager.list().is_empty());
        }
    }

    mod reconciliation {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_staged_upload_replaces_persisted_document() {
            let manager = manager_with(MockFormRemote::new(), vec![staged("t9", "f1", "cv", 0)]);
            let resolved = manager.resolve_documents(
                "f1",
                &single_upload_question(),
                &[DocumentRef::persisted("d1")],
            );
            assert_eq!(resolved.len(), 1);
            assert_eq!(resolved[0].id, "t9");
            assert!(!resolved[0].persisted);
        }

        #[test]
        fn test_persisted_used_without_staged_upload() {
            let manager = manager_with(MockFormRemote::new(), vec![staged("t9", "f1", "other", 0)]);
            let resolved = manager.resolve_documents(
                "f1",
                &single_upload_question(),
                &[DocumentRef::persisted("d1")],
            );
            assert_eq!(resolved, vec![DocumentRef::persisted("d1")]);
        }

        #[test]
        fn test_multi_upload_uses_all_staged_files() {
            let question = QuestionDefinition::new(
                "docs",
                "Documents",
                QuestionType::DocumentUpload {
                    allow_multiple: true,
                },
            );
            let manager = manager_with(
                MockFormRemote::new(),
                vec![staged("t1", "f1", "docs", 0), staged("t2", "f1", "docs", 1)],
            );
            let resolved =
                manager.resolve_documents("f1", &question, &[DocumentRef::persisted("d1")]);
            let ids: Vec<_> = resolved.iter().map(|d| d.id.as_str()).collect();
            assert_eq!(ids, vec!["t1", "t2"]);
        }
    }

    mod sweeping {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_sweep_deletes_only_the_form() {
            let mut mock = MockFormRemote::new();
            mock.expect_list_temp_uploads().returning(|_| {
                Ok(vec![
                    staged("a", "f1", "q1", 0),
                    staged("b", "f1", "q2", 1),
                    staged("c", "f2", "q1", 2),
                ])
            });
            mock.expect_delete_temp_upload()
                .withf(|id| id != "c")
                .times(2)
                .returning(|_| Ok(()));

            let mut manager = manager_with(mock, vec![]);
            let report = manager.sweep("f1").await;

            assert_eq!(report.deleted, 2);
            assert!(report.is_clean());
            let remaining: Vec<_> = manager.list().iter().map(|u| u.id.as_str()).collect();
            assert_eq!(remaining, vec!["c"]);
        }

        #[tokio::test]
        async fn test_sweep_continues_past_failures() {
            let mut mock = MockFormRemote::new();
            mock.expect_list_temp_uploads()
                .returning(|_| Ok(vec![staged("a", "f1", "q", 0), staged("b", "f1", "q", 1)]));
            mock.expect_delete_temp_upload().returning(|id| {
                if id == "a" {
                    Err(anyhow!("locked"))
                } else {
                    Ok(())
                }
            });

            let mut manager = manager_with(mock, vec![]);
            let report = manager.sweep("f1").await;

            assert_eq!(report.deleted, 1);
            assert_eq!(report.failed, vec!["a".to_string()]);
        }

        #[tokio::test]
        async fn test_sweep_falls_back_to_known_uploads_when_listing_fails() {
            let mut mock = MockFormRemote::new();
            mock.expect_list_temp_uploads()
                .returning(|_| Err(anyhow!("offline")));
            mock.expect_delete_temp_upload()
                .withf(|id| id == "known")
                .times(1)
                .returning(|_| Ok(()));

            let mut manager = manager_with(mock, vec![staged("known", "f1", "q", 0)]);
            let report = manager.sweep("f1").await;
            assert_eq!(report.deleted, 1);
        }
    }
}
