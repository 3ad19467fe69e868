//! Draft synchronizer
//!
//! Keeps a remote mirror of the local draft snapshot for one identity.
//! Edits update local state synchronously and fill a single pending slot;
//! a writer task issues the write once edits have been quiet for the
//! debounce window. Writes are strictly serialized: an edit made while a
//! write is in flight only replaces the pending slot, and the next write
//! starts after the current one resolves.
//!
//! ```text
//! Idle --edit--> PendingWrite --quiet && no write in flight--> Writing --> Idle
//! ```

use crate::config::DraftSettings;
use crate::remote::FormRemote;
use crate::state::{AnswerCommand, FormDraftSnapshot, Identity, QuestionDefinition, QuestionType};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Where the synchronizer is in its write cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    PendingWrite,
    Writing,
}

#[derive(Default)]
struct Slot {
    /// Current local answers
    snapshot: FormDraftSnapshot,
    /// Latest snapshot not yet written; a newer edit overwrites it
    pending: Option<FormDraftSnapshot>,
    last_edit: Option<Instant>,
    writing: bool,
    closed: bool,
    /// Bumped by a reset; a failed write from an older generation is dropped
    generation: u64,
}

impl Slot {
    fn phase(&self) -> SyncPhase {
        if self.writing {
            SyncPhase::Writing
        } else if self.pending.is_some() {
            SyncPhase::PendingWrite
        } else {
            SyncPhase::Idle
        }
    }
}

struct Shared {
    slot: Mutex<Slot>,
    edited: Notify,
    phase: watch::Sender<SyncPhase>,
    /// Completed write attempts, successful or not
    attempts: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, slot: &Slot) {
        self.phase.send_replace(slot.phase());
    }
}

pub struct DraftSynchronizer {
    identity: Identity,
    remote: Arc<dyn FormRemote>,
    settings: DraftSettings,
    question_types: HashMap<String, QuestionType>,
    shared: Arc<Shared>,
    writer: Option<JoinHandle<()>>,
}

impl DraftSynchronizer {
    /// Start a fresh submission: the last remote draft is fetched and merged
    /// over an empty snapshot. A failed fetch starts empty.
    pub async fn start_fresh(
        identity: Identity,
        questions: &[QuestionDefinition],
        remote: Arc<dyn FormRemote>,
        settings: DraftSettings,
    ) -> Self {
        let question_types = types_by_id(questions);
        let mut snapshot = FormDraftSnapshot::new();

        match remote.fetch_draft(&identity).await {
            Ok(Some(remote_draft)) => {
                let restored = retain_known(remote_draft, &question_types);
                info!(%identity, answers = restored.len(), "Restored remote draft");
                snapshot.merge_from(restored);
            }
            Ok(None) => debug!(%identity, "No remote draft"),
            Err(e) => warn!(%identity, error = %e, "Failed to fetch draft, starting empty"),
        }

        Self::spawn(identity, question_types, remote, settings, snapshot)
    }

    /// Enter edit mode for an already-submitted response. The remote draft
    /// is never consulted.
    pub fn from_existing(
        identity: Identity,
        questions: &[QuestionDefinition],
        remote: Arc<dyn FormRemote>,
        settings: DraftSettings,
        existing: FormDraftSnapshot,
    ) -> Self {
        let question_types = types_by_id(questions);
        let snapshot = retain_known(existing, &question_types);
        Self::spawn(identity, question_types, remote, settings, snapshot)
    }

    fn spawn(
        identity: Identity,
        question_types: HashMap<String, QuestionType>,
        remote: Arc<dyn FormRemote>,
        settings: DraftSettings,
        snapshot: FormDraftSnapshot,
    ) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        let (attempts, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                snapshot,
                ..Default::default()
            }),
            edited: Notify::new(),
            phase,
            attempts,
        });

        let writer = tokio::spawn(run_writer(
            shared.clone(),
            remote.clone(),
            identity.clone(),
            settings.debounce,
        ));

        Self {
            identity,
            remote,
            settings,
            question_types,
            shared,
            writer: Some(writer),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Current local answers
    pub fn snapshot(&self) -> FormDraftSnapshot {
        self.shared.lock().snapshot.clone()
    }

    pub fn phase(&self) -> SyncPhase {
        *self.shared.phase.borrow()
    }

    /// Apply an edit locally and schedule a debounced write. Never suspends.
    pub fn apply(&self, command: AnswerCommand) -> FormDraftSnapshot {
        let mut slot = self.shared.lock();

        let Some(question_type) = self.question_types.get(command.question_id()).copied() else {
            warn!(question_id = command.question_id(), "Edit for unknown question ignored");
            return slot.snapshot.clone();
        };

        let next = slot.snapshot.apply(question_type, &command);
        slot.snapshot = next.clone();

        if slot.closed {
            debug!(identity = %self.identity, "Synchronizer closed, edit kept local only");
            return next;
        }

        slot.pending = Some(next.clone());
        slot.last_edit = Some(Instant::now());
        self.shared.publish(&slot);
        drop(slot);

        self.shared.edited.notify_one();
        next
    }

    /// Wait until no write is in flight
    pub async fn wait_for_write(&self) {
        let mut phase = self.shared.phase.subscribe();
        let _ = phase.wait_for(|p| *p != SyncPhase::Writing).await;
    }

    /// Write any pending snapshot now and wait for that write attempt to resolve
    pub async fn flush(&self) {
        let mut attempts = self.shared.attempts.subscribe();
        let (has_pending, target) = {
            let mut slot = self.shared.lock();
            if slot.pending.is_some() {
                // Backdate the last edit so the debounce window has already elapsed
                let now = Instant::now();
                slot.last_edit = Some(now.checked_sub(self.settings.debounce).unwrap_or(now));
            }
            // An in-flight write resolves first, then ours
            let ahead = if slot.writing { 2 } else { 1 };
            (slot.pending.is_some(), *attempts.borrow_and_update() + ahead)
        };
        if !has_pending {
            self.wait_for_write().await;
            return;
        }
        self.shared.edited.notify_one();

        let _ = attempts.wait_for(|n| *n >= target).await;
    }

    /// Stop writing: the pending snapshot is discarded, an in-flight write is
    /// awaited and the writer task ends. Local edits are still accepted.
    pub async fn close(&mut self) {
        {
            let mut slot = self.shared.lock();
            slot.closed = true;
            slot.pending = None;
            self.shared.publish(&slot);
        }
        self.shared.edited.notify_one();
        self.wait_for_write().await;

        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.await {
                debug!(error = %e, "Draft writer ended abnormally");
            }
        }
    }

    /// Delete the remote draft with linear backoff. Exhausting the attempts
    /// leaves an orphaned draft and returns `false`.
    pub async fn delete_remote(&self) -> bool {
        delete_with_retry(self.remote.as_ref(), &self.identity, &self.settings).await
    }

    /// Discard every local answer and the remote draft
    pub async fn reset(&self) -> bool {
        {
            let mut slot = self.shared.lock();
            slot.snapshot = FormDraftSnapshot::new();
            slot.pending = None;
            slot.generation += 1;
            self.shared.publish(&slot);
        }
        self.wait_for_write().await;
        info!(identity = %self.identity, "Draft reset");
        self.delete_remote().await
    }
}

impl Drop for DraftSynchronizer {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
    }
}

async fn run_writer(
    shared: Arc<Shared>,
    remote: Arc<dyn FormRemote>,
    identity: Identity,
    debounce: Duration,
) {
    loop {
        let due = {
            let slot = shared.lock();
            if slot.closed {
                break;
            }
            slot.pending
                .as_ref()
                .map(|_| slot.last_edit.unwrap_or_else(Instant::now) + debounce)
        };

        let Some(due) = due else {
            shared.edited.notified().await;
            continue;
        };

        if Instant::now() < due {
            // A new edit moves the deadline, so re-evaluate after either
            tokio::select! {
                _ = tokio::time::sleep_until(due) => {}
                _ = shared.edited.notified() => {}
            }
            continue;
        }

        let (snapshot, generation) = {
            let mut slot = shared.lock();
            match slot.pending.take() {
                Some(snapshot) => {
                    slot.writing = true;
                    shared.publish(&slot);
                    (snapshot, slot.generation)
                }
                None => continue,
            }
        };

        debug!(%identity, answers = snapshot.len(), "Writing draft");
        let result = remote.write_draft(&identity, &snapshot).await;

        {
            let mut slot = shared.lock();
            slot.writing = false;
            match result {
                Ok(()) => debug!(%identity, "Draft written"),
                Err(e) => {
                    warn!(%identity, error = %e, "Draft write failed, will retry");
                    if slot.pending.is_none() && !slot.closed && slot.generation == generation {
                        slot.pending = Some(snapshot);
                        slot.last_edit = Some(Instant::now());
                    }
                }
            }
            shared.publish(&slot);
            shared.attempts.send_modify(|n| *n += 1);
        }
    }
    debug!(%identity, "Draft writer stopped");
}

/// Delete a draft. A failed first attempt is retried up to
/// `delete_retries` times with linear backoff (`attempt * retry_backoff`).
pub async fn delete_with_retry(
    remote: &dyn FormRemote,
    identity: &Identity,
    settings: &DraftSettings,
) -> bool {
    let attempts = settings.delete_retries.saturating_add(1);
    for attempt in 1..=attempts {
        match remote.delete_draft(identity).await {
            Ok(()) => {
                debug!(%identity, attempt, "Draft deleted");
                return true;
            }
            Err(e) if attempt < attempts => {
                debug!(%identity, attempt, error = %e, "Draft delete failed, retrying");
                tokio::time::sleep(settings.retry_backoff * attempt).await;
            }
            Err(e) => {
                warn!(%identity, attempts, error = %e, "Giving up on draft delete, draft left orphaned");
            }
        }
    }
    false
}

fn types_by_id(questions: &[QuestionDefinition]) -> HashMap<String, QuestionType> {
    questions
        .iter()
        .map(|q| (q.id.clone(), q.question_type))
        .collect()
}

/// Drops answers for unknown questions or of the wrong shape
fn retain_known(
    snapshot: FormDraftSnapshot,
    question_types: &HashMap<String, QuestionType>,
) -> FormDraftSnapshot {
    let mut kept = FormDraftSnapshot::new();
    for (question_id, value) in snapshot.iter() {
        match question_types.get(question_id) {
            Some(ty) if value.matches(*ty) => kept.insert(question_id, value.clone()),
            _ => debug!(question_id = %question_id, "Dropping draft answer that no longer fits the form"),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::AnswerPayload;
    use crate::remote::MockFormRemote;
    use crate::state::{
        AnswerValue, SessionId, SiblingSet, TempUpload, UploadFile, UploadScope,
    };
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;
    use tokio::time::sleep;

    /// Records draft writes; can hold writes open and fail the first ones
    #[derive(Default)]
    struct RecordingRemote {
        writes: Mutex<Vec<FormDraftSnapshot>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        failures_left: AtomicUsize,
        gate: Option<Semaphore>,
    }

    impl RecordingRemote {
        fn gated() -> Self {
            Self {
                gate: Some(Semaphore::new(0)),
                ..Default::default()
            }
        }

        fn failing(times: usize) -> Self {
            Self {
                failures_left: AtomicUsize::new(times),
                ..Default::default()
            }
        }

        fn release(&self) {
            if let Some(gate) = &self.gate {
                gate.add_permits(1);
            }
        }

        fn writes(&self) -> Vec<FormDraftSnapshot> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FormRemote for RecordingRemote {
        async fn fetch_draft(&self, _: &Identity) -> Result<Option<FormDraftSnapshot>> {
            Ok(None)
        }

        async fn write_draft(&self, _: &Identity, snapshot: &FormDraftSnapshot) -> Result<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            self.writes.lock().unwrap().push(snapshot.clone());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let failed = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failed {
                Err(anyhow!("server unavailable"))
            } else {
                Ok(())
            }
        }

        async fn delete_draft(&self, _: &Identity) -> Result<()> {
            Ok(())
        }

        async fn submit_answers(&self, _: &Identity, _: &[AnswerPayload]) -> Result<()> {
            unimplemented!()
        }

        async fn update_answer(&self, _: &str, _: &AnswerPayload) -> Result<()> {
            unimplemented!()
        }

        async fn reorder_element(&self, _: &SiblingSet, _: &str, _: u32) -> Result<()> {
            unimplemented!()
        }

        async fn upload_temp(&self, _: &UploadScope, _: UploadFile) -> Result<TempUpload> {
            unimplemented!()
        }

        async fn list_temp_uploads(&self, _: &SessionId) -> Result<Vec<TempUpload>> {
            unimplemented!()
        }

        async fn delete_temp_upload(&self, _: &str) -> Result<()> {
            unimplemented!()
        }
    }

    fn questions() -> Vec<QuestionDefinition> {
        vec![QuestionDefinition::new("name", "Name", QuestionType::FreeText)]
    }

    fn settings() -> DraftSettings {
        DraftSettings {
            debounce: Duration::from_secs(3),
            delete_retries: 3,
            retry_backoff: Duration::from_secs(1),
        }
    }

    fn set_name(text: &str) -> AnswerCommand {
        AnswerCommand::SetText {
            question_id: "name".to_string(),
            text: text.to_string(),
        }
    }

    fn name_of(snapshot: &FormDraftSnapshot) -> Option<String> {
        match snapshot.get("name") {
            Some(AnswerValue::Text(text)) => text.clone(),
            _ => None,
        }
    }

    fn synchronizer(remote: Arc<RecordingRemote>) -> DraftSynchronizer {
        DraftSynchronizer::from_existing(
            Identity::new("alice", "form-1"),
            &questions(),
            remote,
            settings(),
            FormDraftSnapshot::new(),
        )
    }

    mod debounce {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test(start_paused = true)]
        async fn test_edits_within_window_coalesce_into_one_write() {
            let remote = Arc::new(RecordingRemote::default());
            let sync = synchronizer(remote.clone());

            for text in ["a", "ab", "abc", "abcd", "abcde"] {
                sync.apply(set_name(text));
                sleep(Duration::from_secs(1)).await;
            }
            assert_eq!(sync.phase(), SyncPhase::PendingWrite);
            assert!(remote.writes().is_empty());

            sleep(Duration::from_secs(3)).await;

            let writes = remote.writes();
            assert_eq!(writes.len(), 1);
            assert_eq!(name_of(&writes[0]), Some("abcde".to_string()));
            assert_eq!(sync.phase(), SyncPhase::Idle);
        }

        #[tokio::test(start_paused = true)]
        async fn test_local_state_updates_immediately() {
            let remote = Arc::new(RecordingRemote::default());
            let sync = synchronizer(remote.clone());

            let returned = sync.apply(set_name("now"));
            assert_eq!(name_of(&returned), Some("now".to_string()));
            assert_eq!(name_of(&sync.snapshot()), Some("now".to_string()));
            assert!(remote.writes().is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_no_edits_no_writes() {
            let remote = Arc::new(RecordingRemote::default());
            let sync = synchronizer(remote.clone());
            sleep(Duration::from_secs(30)).await;
            assert!(remote.writes().is_empty());
            assert_eq!(sync.phase(), SyncPhase::Idle);
        }

        #[tokio::test(start_paused = true)]
        async fn test_unknown_question_is_ignored() {
            let remote = Arc::new(RecordingRemote::default());
            let sync = synchronizer(remote.clone());
            sync.apply(AnswerCommand::SetText {
                question_id: "ghost".to_string(),
                text: "boo".to_string(),
            });
            assert!(sync.snapshot().is_empty());
            assert_eq!(sync.phase(), SyncPhase::Idle);
        }
    }

    mod serialization {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test(start_paused = true)]
        async fn test_edits_during_write_keep_only_latest() {
            let remote = Arc::new(RecordingRemote::gated());
            let sync = synchronizer(remote.clone());

            sync.apply(set_name("first"));
            sleep(Duration::from_secs(4)).await;
            assert_eq!(sync.phase(), SyncPhase::Writing);

            sync.apply(set_name("second"));
            sync.apply(set_name("third"));
            assert_eq!(sync.phase(), SyncPhase::Writing);

            // Long past the debounce window, but the first write still holds
            sleep(Duration::from_secs(10)).await;
            assert_eq!(remote.in_flight.load(Ordering::SeqCst), 1);

            remote.release();
            remote.release();
            sleep(Duration::from_secs(4)).await;

            let writes: Vec<_> = remote.writes().iter().map(name_of).collect();
            assert_eq!(
                writes,
                vec![Some("first".to_string()), Some("third".to_string())]
            );
            assert_eq!(remote.max_in_flight.load(Ordering::SeqCst), 1);
            assert_eq!(sync.phase(), SyncPhase::Idle);
        }

        #[tokio::test(start_paused = true)]
        async fn test_failed_write_stays_pending_and_retries() {
            let remote = Arc::new(RecordingRemote::failing(1));
            let sync = synchronizer(remote.clone());

            sync.apply(set_name("keep me"));
            sleep(Duration::from_secs(4)).await;
            assert_eq!(remote.writes().len(), 1);
            assert_eq!(sync.phase(), SyncPhase::PendingWrite);

            sleep(Duration::from_secs(4)).await;
            let writes = remote.writes();
            assert_eq!(writes.len(), 2);
            assert_eq!(name_of(&writes[1]), Some("keep me".to_string()));
            assert_eq!(sync.phase(), SyncPhase::Idle);
        }

        #[tokio::test(start_paused = true)]
        async fn test_flush_writes_without_waiting_for_debounce() {
            let remote = Arc::new(RecordingRemote::default());
            let sync = synchronizer(remote.clone());

            sync.apply(set_name("quick"));
            sync.flush().await;

            assert_eq!(remote.writes().len(), 1);
            assert_eq!(sync.phase(), SyncPhase::Idle);
        }
    }

    mod lifecycle {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test(start_paused = true)]
        async fn test_close_discards_pending_write() {
            let remote = Arc::new(RecordingRemote::default());
            let mut sync = synchronizer(remote.clone());

            sync.apply(set_name("never sent"));
            sync.close().await;
            sleep(Duration::from_secs(10)).await;

            assert!(remote.writes().is_empty());
            assert_eq!(sync.phase(), SyncPhase::Idle);
        }

        #[tokio::test(start_paused = true)]
        async fn test_close_awaits_in_flight_write() {
            let remote = Arc::new(RecordingRemote::gated());
            let mut sync = synchronizer(remote.clone());

            sync.apply(set_name("in flight"));
            sleep(Duration::from_secs(4)).await;
            assert_eq!(sync.phase(), SyncPhase::Writing);

            let releaser = {
                let remote = remote.clone();
                tokio::spawn(async move {
                    sleep(Duration::from_secs(1)).await;
                    remote.release();
                })
            };
            sync.close().await;
            releaser.await.unwrap();

            assert_eq!(remote.writes().len(), 1);
            assert_eq!(remote.in_flight.load(Ordering::SeqCst), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_reset_drops_failed_in_flight_write() {
            let remote = Arc::new(RecordingRemote {
                gate: Some(Semaphore::new(0)),
                failures_left: AtomicUsize::new(1),
                ..Default::default()
            });
            let sync = synchronizer(remote.clone());

            sync.apply(set_name("old"));
            sleep(Duration::from_secs(4)).await;
            assert_eq!(sync.phase(), SyncPhase::Writing);

            let releaser = {
                let remote = remote.clone();
                tokio::spawn(async move {
                    sleep(Duration::from_secs(1)).await;
                    remote.release();
                })
            };
            assert!(sync.reset().await);
            releaser.await.unwrap();
            sleep(Duration::from_secs(10)).await;

            // Only the failed write; the cleared slot stays cleared
            assert_eq!(remote.writes().len(), 1);
            assert!(sync.snapshot().is_empty());
            assert_eq!(sync.phase(), SyncPhase::Idle);
        }

        #[tokio::test]
        async fn test_from_existing_never_fetches() {
            let mut mock = MockFormRemote::new();
            mock.expect_fetch_draft().never();

            let mut existing = FormDraftSnapshot::new();
            existing.insert("name", AnswerValue::Text(Some("submitted".to_string())));
            let sync = DraftSynchronizer::from_existing(
                Identity::new("alice", "form-1"),
                &questions(),
                Arc::new(mock),
                settings(),
                existing,
            );
            assert_eq!(name_of(&sync.snapshot()), Some("submitted".to_string()));
        }

        #[tokio::test]
        async fn test_start_fresh_restores_remote_draft() {
            let mut mock = MockFormRemote::new();
            mock.expect_fetch_draft().times(1).returning(|_| {
                let mut draft = FormDraftSnapshot::new();
                draft.insert("name", AnswerValue::Text(Some("restored".to_string())));
                draft.insert("removed", AnswerValue::Text(Some("stale".to_string())));
                Ok(Some(draft))
            });

            let sync = DraftSynchronizer::start_fresh(
                Identity::new("alice", "form-1"),
                &questions(),
                Arc::new(mock),
                settings(),
            )
            .await;

            let snapshot = sync.snapshot();
            assert_eq!(name_of(&snapshot), Some("restored".to_string()));
            assert!(snapshot.get("removed").is_none());
            assert_eq!(sync.phase(), SyncPhase::Idle);
        }

        #[tokio::test]
        async fn test_start_fresh_survives_fetch_failure() {
            let mut mock = MockFormRemote::new();
            mock.expect_fetch_draft()
                .times(1)
                .returning(|_| Err(anyhow!("timeout")));

            let sync = DraftSynchronizer::start_fresh(
                Identity::new("alice", "form-1"),
                &questions(),
                Arc::new(mock),
                settings(),
            )
            .await;
            assert!(sync.snapshot().is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_reset_clears_local_and_deletes_remote() {
            let mut mock = MockFormRemote::new();
            mock.expect_write_draft().never();
            mock.expect_delete_draft().times(1).returning(|_| Ok(()));

            let sync = DraftSynchronizer::from_existing(
                Identity::new("alice", "form-1"),
                &questions(),
                Arc::new(mock),
                settings(),
                FormDraftSnapshot::new(),
            );
            sync.apply(set_name("gone"));
            assert!(sync.reset().await);
            assert!(sync.snapshot().is_empty());
            assert_eq!(sync.phase(), SyncPhase::Idle);
        }
    }

    mod deletion {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test(start_paused = true)]
        async fn test_delete_retries_with_linear_backoff() {
            let calls = Arc::new(AtomicUsize::new(0));
            let mut mock = MockFormRemote::new();
            let counter = calls.clone();
            mock.expect_delete_draft().times(3).returning(move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(anyhow!("busy"))
                } else {
                    Ok(())
                }
            });

            let started = Instant::now();
            let deleted =
                delete_with_retry(&mock, &Identity::new("alice", "form-1"), &settings()).await;

            assert!(deleted);
            assert_eq!(calls.load(Ordering::SeqCst), 3);
            // 1s after the first failure, 2s after the second
            assert_eq!(started.elapsed(), Duration::from_secs(3));
        }

        #[tokio::test(start_paused = true)]
        async fn test_zero_retries_makes_one_attempt() {
            let mut mock = MockFormRemote::new();
            mock.expect_delete_draft()
                .times(1)
                .returning(|_| Err(anyhow!("busy")));
            let settings = DraftSettings {
                delete_retries: 0,
                ..settings()
            };

            let deleted =
                delete_with_retry(&mock, &Identity::new("alice", "form-1"), &settings).await;
            assert!(!deleted);
        }

        #[tokio::test(start_paused = true)]
        async fn test_delete_exhaustion_is_not_fatal() {
            // One attempt plus three retries
            let mut mock = MockFormRemote::new();
            mock.expect_delete_draft()
                .times(4)
                .returning(|_| Err(anyhow!("gone away")));

            let deleted =
                delete_with_retry(&mock, &Identity::new("alice", "form-1"), &settings()).await;
            assert!(!deleted);
        }
    }
}
