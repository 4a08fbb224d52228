//! Client for the authoritative remote campaign store.
//!
//! Reads are a plain GET; writes retry with exponential backoff before
//! surfacing a failure. The best-effort path is the exit-flush transport:
//! a detached fire-and-forget POST whose outcome nobody awaits.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use outreach_core::Campaign;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Wire payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignsPayload {
    pub campaigns: Vec<Campaign>,
}

// ---------------------------------------------------------------------------
// RemoteStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the authoritative campaign list.
    async fn fetch(&self) -> Result<Vec<Campaign>>;

    /// Replace the authoritative campaign list. Implementations retry
    /// transient failures before returning an error.
    async fn put(&self, campaigns: &[Campaign]) -> Result<()>;

    /// One-way, fire-and-forget delivery that survives caller teardown.
    /// No response is awaited or required.
    fn send_best_effort(&self, campaigns: Vec<Campaign>);
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles per retry (500ms, 1s, 2s).
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, retry: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry)
    }
}

// ---------------------------------------------------------------------------
// HttpRemoteStore
// ---------------------------------------------------------------------------

pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_retry(base_url, RetryPolicy::default())
    }

    pub fn with_retry(base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    fn campaigns_url(&self) -> String {
        format!("{}/campaigns", self.base_url)
    }

    async fn put_once(&self, campaigns: &[Campaign]) -> Result<()> {
        let payload = CampaignsPayload {
            campaigns: campaigns.to_vec(),
        };
        let resp = self
            .client
            .put(self.campaigns_url())
            .json(&payload)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SyncError::RemoteStatus(resp.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch(&self) -> Result<Vec<Campaign>> {
        let resp = self.client.get(self.campaigns_url()).send().await?;
        if !resp.status().is_success() {
            return Err(SyncError::RemoteStatus(resp.status().as_u16()));
        }
        let payload: CampaignsPayload = resp.json().await?;
        Ok(payload.campaigns)
    }

    async fn put(&self, campaigns: &[Campaign]) -> Result<()> {
        let mut retry = 0u32;
        loop {
            match self.put_once(campaigns).await {
                Ok(()) => return Ok(()),
                Err(e) if retry < self.retry.max_retries => {
                    let delay = self.retry.delay(retry);
                    warn!(retry, error = %e, "campaign write failed, backing off");
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn send_best_effort(&self, campaigns: Vec<Campaign>) {
        let client = self.client.clone();
        let url = self.campaigns_url();
        tokio::spawn(async move {
            let payload = CampaignsPayload { campaigns };
            match client.post(url).json(&payload).send().await {
                Ok(resp) => debug!(status = %resp.status(), "exit flush delivered"),
                Err(e) => debug!(error = %e, "exit flush dropped"),
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
