//! Determinism digest over a clearing outcome.
//!
//! Re-running clearing on the same revealed-bid set must give the same
//! outcome. The `outcome_root` is a SHA-256 digest over every field of
//! the outcome, so a retried finalization (or an independent verifier)
//! can compare 32 bytes instead of full allocation vectors.

use sealbid_types::PoolId;
use sha2::{Digest, Sha256};

use crate::ClearingOutcome;

/// Compute the digest of a pool's clearing outcome.
///
/// Commits to the pool id, clearing price, totals, marginal index and
/// every fill in clearing order.
#[must_use]
pub fn outcome_root(pool_id: PoolId, outcome: &ClearingOutcome) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"sealbid:outcome_root:v1:");
    hasher.update(pool_id.0.to_le_bytes());
    hasher.update(outcome.clearing_price.to_le_bytes());
    hasher.update(outcome.total_allocated.to_le_bytes());
    hasher.update(outcome.total_demand.to_le_bytes());
    match outcome.marginal {
        Some(idx) => {
            hasher.update([1u8]);
            hasher.update(u64::try_from(idx).unwrap_or(u64::MAX).to_le_bytes());
        }
        None => hasher.update([0u8]),
    }
    hasher.update(u64::try_from(outcome.fills.len()).unwrap_or(u64::MAX).to_le_bytes());

    for fill in &outcome.fills {
        hasher.update(fill.bidder.as_bytes());
        hasher.update(fill.quantity.to_le_bytes());
        hasher.update(fill.price.to_le_bytes());
        hasher.update(fill.reveal_seq.to_le_bytes());
        hasher.update(fill.filled.to_le_bytes());
    }

    let result = hasher.finalize();
    let mut root = [0u8; 32];
    root.copy_from_slice(&result);
    root
}

/// Recompute the digest and compare with `expected_root`.
#[must_use]
pub fn verify_outcome_root(
    pool_id: PoolId,
    outcome: &ClearingOutcome,
    expected_root: &[u8; 32],
) -> bool {
    outcome_root(pool_id, outcome) == *expected_root
}
