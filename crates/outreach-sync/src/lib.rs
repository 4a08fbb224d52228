pub mod driver;
pub mod engine;
pub mod error;
pub mod remote;

pub use driver::{run, spawn, Command, SyncHandle};
pub use engine::{CampaignOp, SyncConfig, SyncEngine, SyncStatus};
pub use error::{Result, SyncError};
pub use remote::{CampaignsPayload, HttpRemoteStore, RemoteStore, RetryPolicy};
