use crate::types::EmailType;
use chrono::Duration;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FollowUpOffsets
// ---------------------------------------------------------------------------

/// Per-step follow-up delays, supplied by external configuration.
///
/// Read at the moment a send or resume transition computes a schedule, so a
/// config change takes effect on the next transition rather than rewriting
/// already-scheduled emails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpOffsets {
    #[serde(default = "default_follow_up_1")]
    pub follow_up_1_days: i64,
    #[serde(default = "default_follow_up_2")]
    pub follow_up_2_days: i64,
    #[serde(default = "default_follow_up_3")]
    pub follow_up_3_days: i64,
}

fn default_follow_up_1() -> i64 {
    5
}

fn default_follow_up_2() -> i64 {
    7
}

fn default_follow_up_3() -> i64 {
    14
}

impl Default for FollowUpOffsets {
    fn default() -> Self {
        Self {
            follow_up_1_days: default_follow_up_1(),
            follow_up_2_days: default_follow_up_2(),
            follow_up_3_days: default_follow_up_3(),
        }
    }
}

impl FollowUpOffsets {
    /// Offset from sending `step` to the next touch point.
    ///
    /// `None` means the sequence ends after `step` and `next_follow_up_at`
    /// should be cleared. Offsets chain: each is relative to the previous
    /// send, never to wall-clock "now" at scheduling time.
    pub fn after(&self, step: EmailType) -> Option<Duration> {
        match step {
            EmailType::Initial => Some(Duration::days(self.follow_up_1_days)),
            EmailType::FollowUp1 => Some(Duration::days(self.follow_up_2_days)),
            EmailType::FollowUp2 => Some(Duration::days(self.follow_up_3_days)),
            EmailType::FollowUp3 | EmailType::Nurture | EmailType::Closing => None,
        }
    }

    /// Offset used when (re)scheduling `step` itself, e.g. on resume.
    ///
    /// Nurture rides the first-follow-up delay and closing the last one;
    /// an initial email is sendable immediately.
    pub fn for_step(&self, step: EmailType) -> Duration {
        match step {
            EmailType::Initial => Duration::zero(),
            EmailType::FollowUp1 | EmailType::Nurture => Duration::days(self.follow_up_1_days),
            EmailType::FollowUp2 => Duration::days(self.follow_up_2_days),
            EmailType::FollowUp3 | EmailType::Closing => Duration::days(self.follow_up_3_days),
        }
    }
}

// ---------------------------------------------------------------------------
// ReconcilePolicy
// ---------------------------------------------------------------------------

/// Tunable heuristics for the reconciliation algorithm.
///
/// These are policy, not protocol: tests exercise boundary behavior by
/// shrinking the window instead of waiting real time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilePolicy {
    /// How long a local backup is trusted over a remote read without other
    /// corroborating evidence.
    #[serde(default = "default_freshness_minutes")]
    pub freshness_window_minutes: i64,
}

fn default_freshness_minutes() -> i64 {
    30
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            freshness_window_minutes: default_freshness_minutes(),
        }
    }
}

impl ReconcilePolicy {
    pub fn freshness_window(&self) -> Duration {
        Duration::minutes(self.freshness_window_minutes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
