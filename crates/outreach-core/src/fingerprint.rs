//! Change-detection digest over the campaign fields that matter for sync.
//!
//! Not a cryptographic hash: replicas only need a low accidental-collision
//! probability to tell "same data" from "diverged", so a 64-bit FNV-1a fold
//! is plenty and keeps the digest cheap enough to compute on every save.

use crate::campaign::Campaign;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// How much of each subject participates in the digest. Enough to catch a
/// regenerated draft without hashing whole email bodies.
pub const SUBJECT_PREFIX_CHARS: usize = 16;

fn fold(hash: &mut u64, bytes: &[u8]) {
    for &b in bytes {
        *hash ^= u64::from(b);
        *hash = hash.wrapping_mul(FNV_PRIME);
    }
    // Field separator so adjacent fields can't run together
    *hash ^= 0x1f;
    *hash = hash.wrapping_mul(FNV_PRIME);
}

/// Stable digest of a campaign list.
///
/// Campaigns are sorted by id before folding, so reordering the working
/// copy never produces a spurious mismatch. Two lists with equal digests
/// are treated as semantically identical by reconciliation.
pub fn fingerprint(campaigns: &[Campaign]) -> String {
    let mut sorted: Vec<&Campaign> = campaigns.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut hash = FNV_OFFSET_BASIS;
    for c in sorted {
        fold(&mut hash, c.id.as_bytes());
        fold(&mut hash, c.stage.as_str().as_bytes());
        fold(
            &mut hash,
            c.response_type.map_or("-", |r| r.as_str()).as_bytes(),
        );
        fold(&mut hash, c.contact_email.as_deref().unwrap_or("-").as_bytes());
        fold(&mut hash, &(c.email_sequence.len() as u64).to_be_bytes());
        for email in &c.email_sequence {
            fold(&mut hash, email.email_type.as_str().as_bytes());
            fold(&mut hash, email.status.as_str().as_bytes());
            let prefix: String = email.subject.chars().take(SUBJECT_PREFIX_CHARS).collect();
            fold(&mut hash, prefix.as_bytes());
        }
    }
    format!("{hash:016x}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
