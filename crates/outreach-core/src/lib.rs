pub mod backup;
pub mod campaign;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod reconcile;
pub mod types;

pub use backup::{BackupSnapshot, BackupStore, MemoryBackup, RedbBackup};
pub use campaign::{Campaign, CampaignPatch, Email, EmailDraft};
pub use config::{FollowUpOffsets, ReconcilePolicy};
pub use error::{OutreachError, Result};
pub use fingerprint::fingerprint;
pub use reconcile::{reconcile, ReconcileDecision, ReconcileOutcome};
pub use types::{EmailStatus, EmailType, ResponseType, Stage, Tier};
