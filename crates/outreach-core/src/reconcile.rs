//! Arbitration between a just-fetched remote campaign list and the local
//! durable backup.
//!
//! The sync engine short-circuits the two flag-driven rules (pending local
//! edits and just-synced staleness) before calling in here; this module
//! owns the data-shape heuristics. Priority order: never shrink the
//! campaign set, never lose generated email content, but always let
//! contact-email (and response-type) edits made elsewhere propagate.

use crate::backup::BackupSnapshot;
use crate::campaign::Campaign;
use crate::config::ReconcilePolicy;
use crate::fingerprint::fingerprint;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileDecision {
    /// No backup, identical fingerprints, or remote simply wins.
    AdoptRemote,
    /// Remote grew; adopted with richer backup sequences grafted in.
    RemoteGrew,
    /// Backup was richer or fresh; adopted and pushed back to remote.
    BackupWins,
    /// Backup adopted with remote contact fields merged in, no push.
    ContactMerge,
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub campaigns: Vec<Campaign>,
    /// The merged result diverges from what remote holds and must be
    /// written back immediately.
    pub push_to_remote: bool,
    pub decision: ReconcileDecision,
}

impl ReconcileOutcome {
    fn adopt(campaigns: Vec<Campaign>, decision: ReconcileDecision) -> Self {
        Self {
            campaigns,
            push_to_remote: false,
            decision,
        }
    }
}

// ---------------------------------------------------------------------------
// Algorithm
// ---------------------------------------------------------------------------

/// Decide whose data wins after a remote read completes.
///
/// Rule order (first match wins), continuing the engine's rules 1–2:
/// 3. no backup → adopt remote;
/// 4. remote has more campaigns → adopt remote, keeping the backup's
///    email sequence per campaign when strictly richer;
/// 5. fingerprints equal → adopt remote; otherwise the backup wins when
///    richer in total emails or saved within the freshness window (pushed
///    back to remote), else contact-field drift merges, else remote wins.
pub fn reconcile(
    remote: Vec<Campaign>,
    backup: Option<&BackupSnapshot>,
    policy: &ReconcilePolicy,
    now: DateTime<Utc>,
) -> ReconcileOutcome {
    let Some(backup) = backup else {
        return ReconcileOutcome::adopt(remote, ReconcileDecision::AdoptRemote);
    };

    // Rule 4: new campaigns win structurally, richer drafts are kept.
    if remote.len() > backup.campaigns.len() {
        let backup_by_id: HashMap<&str, &Campaign> = backup
            .campaigns
            .iter()
            .map(|c| (c.id.as_str(), c))
            .collect();
        let merged = remote
            .into_iter()
            .map(|mut c| {
                if let Some(b) = backup_by_id.get(c.id.as_str()) {
                    if b.email_sequence.len() > c.email_sequence.len() {
                        c.email_sequence = b.email_sequence.clone();
                    }
                }
                c
            })
            .collect();
        return ReconcileOutcome::adopt(merged, ReconcileDecision::RemoteGrew);
    }

    // Rule 5: no structural change, compare content.
    if fingerprint(&remote) == fingerprint(&backup.campaigns) {
        return ReconcileOutcome::adopt(remote, ReconcileDecision::AdoptRemote);
    }

    let remote_by_id: HashMap<&str, &Campaign> =
        remote.iter().map(|c| (c.id.as_str(), c)).collect();

    let remote_total: usize = remote.iter().map(|c| c.email_sequence.len()).sum();
    let backup_richer = backup.total_emails() > remote_total;
    let backup_fresh = now - backup.saved_at <= policy.freshness_window();

    // Rule 5a: trust the backup, but contact edits made elsewhere always
    // propagate, and the merged result is pushed so remote catches up.
    if backup_richer || backup_fresh {
        let merged = merge_remote_contact_fields(&backup.campaigns, &remote_by_id);
        return ReconcileOutcome {
            campaigns: merged,
            push_to_remote: true,
            decision: ReconcileDecision::BackupWins,
        };
    }

    // Rule 5b: stale, not richer — but remote carries contact-field edits
    // for campaigns where the backup has nothing extra to protect.
    let contact_drift = backup.campaigns.iter().any(|b| {
        remote_by_id.get(b.id.as_str()).is_some_and(|r| {
            (r.contact_email != b.contact_email || r.response_type != b.response_type)
                && r.email_sequence.len() >= b.email_sequence.len()
        })
    });
    if contact_drift {
        let merged = merge_remote_contact_fields(&backup.campaigns, &remote_by_id);
        return ReconcileOutcome::adopt(merged, ReconcileDecision::ContactMerge);
    }

    // Rule 5c
    ReconcileOutcome::adopt(remote, ReconcileDecision::AdoptRemote)
}

/// Backup content with remote's contact email and response type overriding
/// per campaign. Response type gets the same always-propagate treatment as
/// contact email so a reply classified elsewhere is not silently dropped
/// by the freshness-window path.
fn merge_remote_contact_fields(
    backup: &[Campaign],
    remote_by_id: &HashMap<&str, &Campaign>,
) -> Vec<Campaign> {
    backup
        .iter()
        .cloned()
        .map(|mut c| {
            if let Some(r) = remote_by_id.get(c.id.as_str()) {
                if r.contact_email != c.contact_email {
                    c.contact_email = r.contact_email.clone();
                }
                if r.response_type != c.response_type {
                    c.response_type = r.response_type;
                }
            }
            c
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
