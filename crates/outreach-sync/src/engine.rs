//! Owner of the in-memory campaign working copy.
//!
//! Three write paths with different urgency: debounced (annotation-grade
//! edits, coalesced behind a timer), immediate (stage changes and sends,
//! written through right away), and exit flush (best-effort delivery of
//! whatever is pending when the session tears down).
//!
//! There is no lock anywhere. The engine runs on one task and the
//! [`SyncStatus`] enum, checked synchronously at each decision point, is
//! the sole concurrency-control mechanism: it is set before an async write
//! starts and moved on only in that write's continuation, which is what
//! keeps a racing remote read from observing an in-flight write as "no
//! local changes".

use crate::error::{Result, SyncError};
use crate::remote::RemoteStore;
use chrono::Utc;
use outreach_core::{
    reconcile, BackupStore, Campaign, CampaignPatch, EmailDraft, EmailType, FollowUpOffsets,
    OutreachError, ReconcilePolicy, ResponseType,
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Quiet period before a debounced edit is written remotely.
    pub debounce: Duration,
    pub offsets: FollowUpOffsets,
    pub policy: ReconcilePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            offsets: FollowUpOffsets::default(),
            policy: ReconcilePolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncStatus
// ---------------------------------------------------------------------------

/// Write-path state, modeled as one enum so illegal flag combinations
/// (e.g. "syncing" and "just synced" at once) are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Replicas agree as far as this engine knows.
    Idle,
    /// Local edits not yet acknowledged by the remote store. Set by every
    /// edit and by failed writes; a remote read must not clobber these.
    PendingLocal,
    /// A remote write is in flight.
    Writing,
    /// A remote write just completed; the next remote read raced it and is
    /// known stale. Read once, then cleared.
    JustSynced,
}

// ---------------------------------------------------------------------------
// CampaignOp
// ---------------------------------------------------------------------------

/// State-machine mutations carried through the immediate write path.
#[derive(Debug, Clone)]
pub enum CampaignOp {
    GenerateSequence(Vec<EmailDraft>),
    AddEmail(EmailDraft),
    SendEmail(EmailType),
    MarkFollowUpDue,
    Pause,
    Resume,
    RecordReply(ResponseType),
    MarkResponded,
    Book,
    Close,
    MarkEmailOpened(EmailType),
    MarkEmailReplied(EmailType),
}

impl CampaignOp {
    fn apply(self, campaign: &mut Campaign, offsets: &FollowUpOffsets) -> outreach_core::Result<()> {
        let now = Utc::now();
        match self {
            CampaignOp::GenerateSequence(drafts) => campaign.generate_sequence(drafts),
            CampaignOp::AddEmail(draft) => campaign.add_email(draft),
            CampaignOp::SendEmail(email_type) => campaign.send_email(email_type, offsets, now),
            CampaignOp::MarkFollowUpDue => campaign.mark_follow_up_due(),
            CampaignOp::Pause => campaign.pause(),
            CampaignOp::Resume => campaign.resume(offsets, now),
            CampaignOp::RecordReply(response_type) => {
                campaign.record_reply(response_type);
                Ok(())
            }
            CampaignOp::MarkResponded => {
                campaign.mark_responded();
                Ok(())
            }
            CampaignOp::Book => campaign.book(),
            CampaignOp::Close => {
                campaign.close();
                Ok(())
            }
            CampaignOp::MarkEmailOpened(email_type) => campaign.mark_email_opened(email_type, now),
            CampaignOp::MarkEmailReplied(email_type) => {
                campaign.mark_email_replied(email_type, now)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SyncEngine
// ---------------------------------------------------------------------------

pub struct SyncEngine<B, R> {
    campaigns: Vec<Campaign>,
    backup: B,
    remote: R,
    config: SyncConfig,
    status: SyncStatus,
    /// When the debounce timer fires; rewritten on every debounced edit so
    /// rapid edits coalesce into one write of the latest value.
    deadline: Option<Instant>,
}

impl<B: BackupStore, R: RemoteStore> SyncEngine<B, R> {
    pub fn new(backup: B, remote: R, config: SyncConfig) -> Self {
        Self {
            campaigns: Vec::new(),
            backup,
            remote,
            config,
            status: SyncStatus::Idle,
            deadline: None,
        }
    }

    /// Seed the working copy from the local backup, e.g. on startup before
    /// the first remote read lands. Returns whether a backup existed.
    pub fn restore_from_backup(&mut self) -> bool {
        match self.backup.load() {
            Some(snapshot) => {
                self.campaigns = snapshot.campaigns;
                true
            }
            None => false,
        }
    }

    pub fn campaigns(&self) -> &[Campaign] {
        &self.campaigns
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub(crate) fn debounce_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn campaign_mut(&mut self, id: &str) -> Result<&mut Campaign> {
        self.campaigns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| OutreachError::CampaignNotFound(id.to_string()).into())
    }

    // ---------------------------------------------------------------------------
    // Debounced path
    // ---------------------------------------------------------------------------

    /// Low-urgency edit: backup immediately, remote write after the quiet
    /// period. Repeated calls within the window coalesce to the latest
    /// working copy, not the value at schedule time.
    pub fn update(&mut self, id: &str, patch: CampaignPatch) -> Result<()> {
        self.campaign_mut(id)?.apply_patch(patch);
        self.backup.save(&self.campaigns);
        self.status = SyncStatus::PendingLocal;
        self.deadline = Some(Instant::now() + self.config.debounce);
        Ok(())
    }

    /// Issue the deferred remote write. Called by the driver when the
    /// debounce deadline fires uninterrupted; a no-op if an immediate
    /// write already carried the pending value.
    pub async fn flush_debounced(&mut self) -> Result<()> {
        self.deadline = None;
        if self.status != SyncStatus::PendingLocal {
            return Ok(());
        }
        self.status = SyncStatus::Writing;
        match self.remote.put(&self.campaigns).await {
            Ok(()) => {
                self.status = SyncStatus::Idle;
                Ok(())
            }
            Err(e) => {
                // Optimistic local edit stands; only remote is behind now
                self.status = SyncStatus::PendingLocal;
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------------------
    // Immediate path
    // ---------------------------------------------------------------------------

    /// High-value mutation: state-machine op, then write through now.
    pub async fn apply(&mut self, id: &str, op: CampaignOp) -> Result<()> {
        let offsets = self.config.offsets;
        let campaign = self.campaign_mut(id)?;
        op.apply(campaign, &offsets)?;
        self.write_through().await
    }

    /// Replace the working copy wholesale (bulk import flows).
    pub async fn replace_all(&mut self, campaigns: Vec<Campaign>) -> Result<()> {
        self.campaigns = campaigns;
        self.write_through().await
    }

    /// Drop a campaign from the working copy; replicated like any other
    /// mutation.
    pub async fn remove_campaign(&mut self, id: &str) -> Result<()> {
        if !self.campaigns.iter().any(|c| c.id == id) {
            return Err(OutreachError::CampaignNotFound(id.to_string()).into());
        }
        self.campaigns.retain(|c| c.id != id);
        self.write_through().await
    }

    /// User-triggered retry of a failed write, carrying the latest value.
    pub async fn retry_pending(&mut self) -> Result<()> {
        if self.status != SyncStatus::PendingLocal {
            return Ok(());
        }
        self.write_through().await
    }

    async fn write_through(&mut self) -> Result<()> {
        self.backup.save(&self.campaigns);
        // An immediate write supersedes any pending debounce
        self.deadline = None;
        self.status = SyncStatus::Writing;
        match self.remote.put(&self.campaigns).await {
            Ok(()) => {
                self.status = SyncStatus::JustSynced;
                Ok(())
            }
            Err(e) => {
                self.status = SyncStatus::PendingLocal;
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------------------
    // Remote reads
    // ---------------------------------------------------------------------------

    pub async fn refresh(&mut self) -> Result<()> {
        let remote = self.remote.fetch().await?;
        self.on_remote_fetch(remote).await
    }

    /// Arbitrate a completed remote read against local state.
    pub async fn on_remote_fetch(&mut self, remote: Vec<Campaign>) -> Result<()> {
        match self.status {
            // Rule 1: local edits in flight always win over a stale read
            SyncStatus::PendingLocal | SyncStatus::Writing => {
                debug!("remote read discarded: local edits pending");
                return Ok(());
            }
            // Rule 2: this read raced a write we just completed
            SyncStatus::JustSynced => {
                self.status = SyncStatus::Idle;
                debug!("remote read discarded: raced a just-completed write");
                return Ok(());
            }
            SyncStatus::Idle => {}
        }

        let backup = self.backup.load();
        let outcome = reconcile(remote, backup.as_ref(), &self.config.policy, Utc::now());
        debug!(decision = ?outcome.decision, push = outcome.push_to_remote, "reconciled remote read");
        self.campaigns = outcome.campaigns;
        self.backup.save(&self.campaigns);
        if outcome.push_to_remote {
            self.write_through().await?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Exit flush
    // ---------------------------------------------------------------------------

    /// Session is tearing down: if anything is pending, hand the entire
    /// working copy to the fire-and-forget transport so a closing session
    /// does not silently lose its last edit.
    pub fn flush_on_exit(&self) {
        if matches!(self.status, SyncStatus::PendingLocal | SyncStatus::Writing) {
            self.remote.send_best_effort(self.campaigns.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use outreach_core::{
        BackupSnapshot, EmailStatus, MemoryBackup, Stage, Tier,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    // ---------------------------------------------------------------------------
    // Mock remote
    // ---------------------------------------------------------------------------

    #[derive(Default)]
    struct MockRemote {
        puts: Mutex<Vec<Vec<Campaign>>>,
        best_effort: Mutex<Vec<Vec<Campaign>>>,
        fetch_result: Mutex<Vec<Campaign>>,
        failures_remaining: AtomicU32,
    }

    impl MockRemote {
        fn put_count(&self) -> usize {
            self.puts.lock().unwrap().len()
        }

        fn last_put(&self) -> Vec<Campaign> {
            self.puts.lock().unwrap().last().cloned().unwrap()
        }

        fn fail_next(&self, n: u32) {
            self.failures_remaining.store(n, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl RemoteStore for Arc<MockRemote> {
        async fn fetch(&self) -> Result<Vec<Campaign>> {
            Ok(self.fetch_result.lock().unwrap().clone())
        }

        async fn put(&self, campaigns: &[Campaign]) -> Result<()> {
            if self.failures_remaining.load(Ordering::SeqCst) > 0 {
                self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
                return Err(SyncError::RemoteStatus(500));
            }
            self.puts.lock().unwrap().push(campaigns.to_vec());
            Ok(())
        }

        fn send_best_effort(&self, campaigns: Vec<Campaign>) {
            self.best_effort.lock().unwrap().push(campaigns);
        }
    }

    // ---------------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------------

    fn campaign(id: &str) -> Campaign {
        let mut c = Campaign::new(id, format!("Show {id}"), "Host", Tier::B);
        c.generate_sequence(vec![
            EmailDraft::new(EmailType::Initial, "Hello", "body"),
            EmailDraft::new(EmailType::FollowUp1, "Follow up", "body"),
        ])
        .unwrap();
        c
    }

    async fn engine_with(
        campaigns: Vec<Campaign>,
    ) -> (SyncEngine<MemoryBackup, Arc<MockRemote>>, Arc<MockRemote>) {
        let remote = Arc::new(MockRemote::default());
        let mut engine = SyncEngine::new(MemoryBackup::new(), remote.clone(), SyncConfig::default());
        if !campaigns.is_empty() {
            engine.replace_all(campaigns).await.unwrap();
            // Consume the seeding write's flag
            engine.on_remote_fetch(Vec::new()).await.unwrap();
            remote.puts.lock().unwrap().clear();
        }
        (engine, remote)
    }

    // ---------------------------------------------------------------------------
    // Debounced path
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn update_saves_backup_and_defers_remote_write() {
        let (mut engine, remote) = engine_with(vec![campaign("c1")]).await;
        engine
            .update(
                "c1",
                CampaignPatch {
                    show_name: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(engine.status(), SyncStatus::PendingLocal);
        assert!(engine.debounce_deadline().is_some());
        assert_eq!(remote.put_count(), 0, "no remote write before the timer");
        // Backup carries the edit already
        let snapshot = engine.backup.load().unwrap();
        assert_eq!(snapshot.campaigns[0].show_name, "Renamed");
    }

    #[tokio::test]
    async fn flush_debounced_writes_latest_value_once() {
        let (mut engine, remote) = engine_with(vec![campaign("c1")]).await;
        for name in ["first", "second", "third"] {
            engine
                .update(
                    "c1",
                    CampaignPatch {
                        show_name: Some(name.into()),
                        ..Default::default()
                    },
                )
                .unwrap();
        }

        engine.flush_debounced().await.unwrap();
        assert_eq!(remote.put_count(), 1);
        assert_eq!(remote.last_put()[0].show_name, "third");
        assert_eq!(engine.status(), SyncStatus::Idle);
        assert!(engine.debounce_deadline().is_none());
    }

    #[tokio::test]
    async fn failed_debounced_write_stays_pending() {
        let (mut engine, remote) = engine_with(vec![campaign("c1")]).await;
        engine
            .update(
                "c1",
                CampaignPatch {
                    show_name: Some("edited".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        remote.fail_next(1);
        assert!(engine.flush_debounced().await.is_err());
        assert_eq!(engine.status(), SyncStatus::PendingLocal);
        // Working copy keeps the optimistic edit
        assert_eq!(engine.campaigns()[0].show_name, "edited");

        // Manual retry carries the latest value
        engine.retry_pending().await.unwrap();
        assert_eq!(remote.put_count(), 1);
        assert_eq!(engine.status(), SyncStatus::JustSynced);
    }

    #[tokio::test]
    async fn unknown_campaign_rejected() {
        let (mut engine, _remote) = engine_with(vec![campaign("c1")]).await;
        let err = engine.update("nope", CampaignPatch::default()).unwrap_err();
        assert!(matches!(
            err,
            SyncError::Domain(OutreachError::CampaignNotFound(_))
        ));
    }

    // ---------------------------------------------------------------------------
    // Immediate path
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn apply_writes_through_immediately() {
        let (mut engine, remote) = engine_with(vec![campaign("c1")]).await;
        engine
            .apply("c1", CampaignOp::SendEmail(EmailType::Initial))
            .await
            .unwrap();

        assert_eq!(engine.status(), SyncStatus::JustSynced);
        assert_eq!(remote.put_count(), 1);
        let written = remote.last_put();
        assert_eq!(written[0].stage, Stage::ReadyToSend);
        assert_eq!(
            written[0].email_sequence[0].status,
            EmailStatus::Sent
        );
    }

    #[tokio::test]
    async fn apply_supersedes_pending_debounce() {
        let (mut engine, remote) = engine_with(vec![campaign("c1")]).await;
        engine
            .update(
                "c1",
                CampaignPatch {
                    show_name: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        engine
            .apply("c1", CampaignOp::SendEmail(EmailType::Initial))
            .await
            .unwrap();

        // The immediate write carried the debounced edit too
        assert!(engine.debounce_deadline().is_none());
        assert_eq!(remote.put_count(), 1);
        assert_eq!(remote.last_put()[0].show_name, "Renamed");

        engine.flush_debounced().await.unwrap();
        assert_eq!(remote.put_count(), 1, "nothing left to flush");
    }

    #[tokio::test]
    async fn invalid_transition_does_not_write() {
        let (mut engine, remote) = engine_with(vec![campaign("c1")]).await;
        let err = engine.apply("c1", CampaignOp::Resume).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Domain(OutreachError::InvalidTransition { .. })
        ));
        assert_eq!(remote.put_count(), 0);
        assert_eq!(engine.campaigns()[0].stage, Stage::Drafting);
    }

    #[tokio::test]
    async fn failed_immediate_write_keeps_local_edit() {
        let (mut engine, remote) = engine_with(vec![campaign("c1")]).await;
        remote.fail_next(1);

        let err = engine
            .apply("c1", CampaignOp::SendEmail(EmailType::Initial))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::RemoteStatus(500)));
        assert_eq!(engine.status(), SyncStatus::PendingLocal);
        // No rollback of working copy or backup
        assert_eq!(engine.campaigns()[0].stage, Stage::ReadyToSend);
        let snapshot = engine.backup.load().unwrap();
        assert_eq!(snapshot.campaigns[0].stage, Stage::ReadyToSend);
    }

    #[tokio::test]
    async fn remove_campaign_replicates() {
        let (mut engine, remote) = engine_with(vec![campaign("c1"), campaign("c2")]).await;
        engine.remove_campaign("c1").await.unwrap();
        assert_eq!(engine.campaigns().len(), 1);
        assert_eq!(remote.last_put().len(), 1);
        assert!(engine.remove_campaign("c1").await.is_err());
    }

    // ---------------------------------------------------------------------------
    // Remote reads
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn pending_edits_win_over_any_remote_payload() {
        let (mut engine, _remote) = engine_with(vec![campaign("c1")]).await;
        engine
            .update(
                "c1",
                CampaignPatch {
                    show_name: Some("local edit".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let before = engine.campaigns().to_vec();
        engine
            .on_remote_fetch(vec![campaign("x"), campaign("y"), campaign("z")])
            .await
            .unwrap();
        assert_eq!(engine.campaigns(), before.as_slice());
        assert_eq!(engine.status(), SyncStatus::PendingLocal);
    }

    #[tokio::test]
    async fn just_synced_discards_one_stale_read() {
        let (mut engine, _remote) = engine_with(vec![campaign("c1")]).await;
        engine
            .apply("c1", CampaignOp::SendEmail(EmailType::Initial))
            .await
            .unwrap();
        assert_eq!(engine.status(), SyncStatus::JustSynced);

        // The read that raced our write is discarded and clears the flag
        let stale = vec![campaign("c1")];
        engine.on_remote_fetch(stale).await.unwrap();
        assert_eq!(engine.status(), SyncStatus::Idle);
        assert_eq!(engine.campaigns()[0].stage, Stage::ReadyToSend);
    }

    #[tokio::test]
    async fn idle_engine_adopts_remote_growth() {
        let (mut engine, _remote) = engine_with(vec![campaign("c1")]).await;
        engine
            .on_remote_fetch(vec![campaign("c1"), campaign("c2")])
            .await
            .unwrap();
        assert_eq!(engine.campaigns().len(), 2);
        // Adoption re-saved the backup
        assert_eq!(engine.backup.load().unwrap().campaigns.len(), 2);
    }

    #[tokio::test]
    async fn richer_fresh_backup_is_pushed_back() {
        let remote = Arc::new(MockRemote::default());
        let rich = vec![campaign("c1"), campaign("c2")];
        let backup = MemoryBackup::with_snapshot(BackupSnapshot::new(rich.clone(), Utc::now()));
        let mut engine = SyncEngine::new(backup, remote.clone(), SyncConfig::default());
        engine.restore_from_backup();

        // Remote returns the same campaigns with poorer sequences
        let mut poor = rich.clone();
        for c in &mut poor {
            c.email_sequence.truncate(1);
        }
        engine.on_remote_fetch(poor).await.unwrap();

        assert_eq!(remote.put_count(), 1, "merged result pushed to remote");
        let pushed = remote.last_put();
        assert!(pushed.iter().all(|c| c.email_sequence.len() == 2));
        assert_eq!(engine.status(), SyncStatus::JustSynced);
    }

    #[tokio::test]
    async fn refresh_pulls_from_remote() {
        let (mut engine, remote) = engine_with(vec![]).await;
        *remote.fetch_result.lock().unwrap() = vec![campaign("c1")];
        engine.refresh().await.unwrap();
        assert_eq!(engine.campaigns().len(), 1);
    }

    // ---------------------------------------------------------------------------
    // Exit flush
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn exit_flush_sends_pending_working_copy() {
        let (mut engine, remote) = engine_with(vec![campaign("c1")]).await;
        engine.flush_on_exit();
        assert!(remote.best_effort.lock().unwrap().is_empty(), "idle: nothing to flush");

        engine
            .update(
                "c1",
                CampaignPatch {
                    show_name: Some("last edit".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        engine.flush_on_exit();

        let sent = remote.best_effort.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0][0].show_name, "last edit");
    }

    #[tokio::test]
    async fn restore_from_backup_seeds_working_copy() {
        let backup = MemoryBackup::with_snapshot(BackupSnapshot::new(
            vec![campaign("c1")],
            Utc::now(),
        ));
        let remote = Arc::new(MockRemote::default());
        let mut engine = SyncEngine::new(backup, remote, SyncConfig::default());
        assert!(engine.restore_from_backup());
        assert_eq!(engine.campaigns().len(), 1);
    }
}
