//! Command-loop driver for embedding the engine in an application.
//!
//! The engine itself is a plain struct with `&mut self` methods; this
//! module gives it the single task it is meant to run on. Commands arrive
//! over an mpsc channel and the debounce deadline is raced against them
//! with `select!`, so a quiet period after the last edit is exactly what
//! fires the deferred write.

use crate::engine::{CampaignOp, SyncEngine};
use crate::error::{Result, SyncError};
use crate::remote::RemoteStore;
use outreach_core::{BackupStore, Campaign, CampaignPatch};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::warn;

/// Park duration while no debounce is pending; the select arm is disabled
/// then, this just keeps the sleep constructible.
const IDLE_PARK: Duration = Duration::from_secs(3600);

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum Command {
    Update {
        id: String,
        patch: CampaignPatch,
    },
    Apply {
        id: String,
        op: CampaignOp,
        reply: oneshot::Sender<Result<()>>,
    },
    ReplaceAll {
        campaigns: Vec<Campaign>,
        reply: oneshot::Sender<Result<()>>,
    },
    Remove {
        id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Refresh,
    RetryPending,
    Snapshot {
        reply: oneshot::Sender<Vec<Campaign>>,
    },
    FlushExit,
    Shutdown,
}

// ---------------------------------------------------------------------------
// SyncHandle
// ---------------------------------------------------------------------------

/// Cheap-to-clone sender half used by UI code. All campaign mutations go
/// through here; nothing else may touch the backup or remote store.
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<Command>,
}

impl SyncHandle {
    async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SyncError::EngineStopped)
    }

    /// Debounced descriptive-field edit.
    pub async fn update(&self, id: impl Into<String>, patch: CampaignPatch) -> Result<()> {
        self.send(Command::Update {
            id: id.into(),
            patch,
        })
        .await
    }

    /// Immediate state-machine mutation; resolves once the remote write
    /// finished (or failed).
    pub async fn apply(&self, id: impl Into<String>, op: CampaignOp) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Apply {
            id: id.into(),
            op,
            reply,
        })
        .await?;
        rx.await.map_err(|_| SyncError::EngineStopped)?
    }

    pub async fn replace_all(&self, campaigns: Vec<Campaign>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ReplaceAll { campaigns, reply }).await?;
        rx.await.map_err(|_| SyncError::EngineStopped)?
    }

    pub async fn remove(&self, id: impl Into<String>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Remove {
            id: id.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| SyncError::EngineStopped)?
    }

    /// Trigger a remote read; reconciliation runs when it completes.
    pub async fn refresh(&self) -> Result<()> {
        self.send(Command::Refresh).await
    }

    /// Manual retry after a surfaced write failure.
    pub async fn retry_pending(&self) -> Result<()> {
        self.send(Command::RetryPending).await
    }

    pub async fn snapshot(&self) -> Result<Vec<Campaign>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| SyncError::EngineStopped)
    }

    /// Page-hide/unload path: best-effort flush of pending state.
    pub async fn flush_exit(&self) -> Result<()> {
        self.send(Command::FlushExit).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Spawn the engine on its own task and return the handle to it.
pub fn spawn<B, R>(engine: SyncEngine<B, R>) -> (SyncHandle, JoinHandle<()>)
where
    B: BackupStore + Send + 'static,
    R: RemoteStore + 'static,
{
    let (tx, rx) = mpsc::channel(32);
    let task = tokio::spawn(run(engine, rx));
    (SyncHandle { tx }, task)
}

/// Drive the engine until shutdown or until every handle is dropped.
pub async fn run<B, R>(mut engine: SyncEngine<B, R>, mut rx: mpsc::Receiver<Command>)
where
    B: BackupStore + Send,
    R: RemoteStore,
{
    loop {
        let wake = engine
            .debounce_deadline()
            .unwrap_or_else(|| Instant::now() + IDLE_PARK);
        tokio::select! {
            command = rx.recv() => {
                let Some(command) = command else {
                    // All handles dropped; don't strand a pending edit
                    engine.flush_on_exit();
                    break;
                };
                match command {
                    Command::Update { id, patch } => {
                        if let Err(e) = engine.update(&id, patch) {
                            warn!(campaign = %id, error = %e, "debounced update rejected");
                        }
                    }
                    Command::Apply { id, op, reply } => {
                        let _ = reply.send(engine.apply(&id, op).await);
                    }
                    Command::ReplaceAll { campaigns, reply } => {
                        let _ = reply.send(engine.replace_all(campaigns).await);
                    }
                    Command::Remove { id, reply } => {
                        let _ = reply.send(engine.remove_campaign(&id).await);
                    }
                    Command::Refresh => {
                        if let Err(e) = engine.refresh().await {
                            warn!(error = %e, "remote refresh failed");
                        }
                    }
                    Command::RetryPending => {
                        if let Err(e) = engine.retry_pending().await {
                            warn!(error = %e, "manual retry failed");
                        }
                    }
                    Command::Snapshot { reply } => {
                        let _ = reply.send(engine.campaigns().to_vec());
                    }
                    Command::FlushExit => engine.flush_on_exit(),
                    Command::Shutdown => {
                        engine.flush_on_exit();
                        break;
                    }
                }
            }
            _ = tokio::time::sleep_until(wake), if engine.debounce_deadline().is_some() => {
                if let Err(e) = engine.flush_debounced().await {
                    warn!(error = %e, "debounced write failed; edits remain pending");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SyncConfig;
    use crate::remote::RemoteStore;
    use async_trait::async_trait;
    use outreach_core::{Campaign, EmailDraft, EmailType, MemoryBackup, Tier};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingRemote {
        puts: Mutex<Vec<Vec<Campaign>>>,
        best_effort: Mutex<Vec<Vec<Campaign>>>,
    }

    #[async_trait]
    impl RemoteStore for Arc<RecordingRemote> {
        async fn fetch(&self) -> Result<Vec<Campaign>> {
            Ok(Vec::new())
        }

        async fn put(&self, campaigns: &[Campaign]) -> Result<()> {
            self.puts.lock().unwrap().push(campaigns.to_vec());
            Ok(())
        }

        fn send_best_effort(&self, campaigns: Vec<Campaign>) {
            self.best_effort.lock().unwrap().push(campaigns);
        }
    }

    fn campaign(id: &str) -> Campaign {
        let mut c = Campaign::new(id, "Show", "Host", Tier::A);
        c.generate_sequence(vec![EmailDraft::new(EmailType::Initial, "Hi", "body")])
            .unwrap();
        c
    }

    async fn spawn_with(
        campaigns: Vec<Campaign>,
    ) -> (SyncHandle, JoinHandle<()>, Arc<RecordingRemote>) {
        let remote = Arc::new(RecordingRemote::default());
        let engine = SyncEngine::new(MemoryBackup::new(), remote.clone(), SyncConfig::default());
        let (handle, task) = spawn(engine);
        if !campaigns.is_empty() {
            handle.replace_all(campaigns).await.unwrap();
            remote.puts.lock().unwrap().clear();
        }
        (handle, task, remote)
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_coalesces_to_one_write_of_final_value() {
        let (handle, task, remote) = spawn_with(vec![campaign("c1")]).await;

        for name in ["first", "second", "third"] {
            handle
                .update(
                    "c1",
                    CampaignPatch {
                        show_name: Some(name.into()),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            // Stay inside the debounce window between edits
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        // Let the final 500ms window elapse uninterrupted
        tokio::time::sleep(Duration::from_millis(600)).await;

        let puts = remote.puts.lock().unwrap().clone();
        assert_eq!(puts.len(), 1, "coalesced into exactly one write");
        assert_eq!(puts[0][0].show_name, "third");

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_timer_restarts_on_each_edit() {
        let (handle, task, remote) = spawn_with(vec![campaign("c1")]).await;

        handle
            .update(
                "c1",
                CampaignPatch {
                    show_name: Some("one".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(remote.puts.lock().unwrap().is_empty(), "window not elapsed");

        handle
            .update(
                "c1",
                CampaignPatch {
                    show_name: Some("two".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        // 400ms after the restart: the original deadline has passed but the
        // restarted one has not
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(remote.puts.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(remote.puts.lock().unwrap().len(), 1);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_edit_best_effort() {
        let (handle, task, remote) = spawn_with(vec![campaign("c1")]).await;

        handle
            .update(
                "c1",
                CampaignPatch {
                    show_name: Some("unsaved".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        // Shut down inside the debounce window
        handle.shutdown().await.unwrap();
        task.await.unwrap();

        let flushed = remote.best_effort.lock().unwrap();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0][0].show_name, "unsaved");
    }

    #[tokio::test]
    async fn apply_surfaces_domain_errors_through_handle() {
        let (handle, task, _remote) = spawn_with(vec![campaign("c1")]).await;
        let err = handle.apply("c1", CampaignOp::Pause).await.unwrap_err();
        assert!(matches!(err, SyncError::Domain(_)));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_handles_stop_the_driver() {
        let (handle, task, _remote) = spawn_with(vec![]).await;
        drop(handle);
        task.await.unwrap();
    }
}
