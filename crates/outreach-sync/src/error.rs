use outreach_core::OutreachError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("remote store returned status {0}")]
    RemoteStatus(u16),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Domain(#[from] OutreachError),

    #[error("sync engine stopped")]
    EngineStopped,
}

pub type Result<T> = std::result::Result<T, SyncError>;
