//! Finalization scheduler: drives a batch of pools from FINALIZE_READY to
//! SETTLED.
//!
//! Every named pool is processed independently. A failure on one pool
//! (already settled, not ready, transfer refused) never aborts the others.
//! Pools share no state, so the batch is spread across scoped worker
//! threads.

use std::{collections::BTreeSet, fmt, num::NonZeroUsize, thread};

use chrono::{DateTime, Utc};
use sealbid_types::{AuctionError, BatchId, PoolId, Result};

use crate::SettlementRecord;

/// Per-pool result category reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinalizeStatus {
    /// Settled by this request.
    Settled,
    /// Settled by an earlier request; nothing changed.
    AlreadySettled,
    /// Reveal window still open.
    NotReady,
    /// Unknown pool, transfer failure, or another error.
    Rejected,
}

impl FinalizeStatus {
    #[must_use]
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::Settled,
            Err(AuctionError::AlreadySettled(_)) => Self::AlreadySettled,
            Err(AuctionError::NotFinalizable(_)) => Self::NotReady,
            Err(_) => Self::Rejected,
        }
    }
}

impl fmt::Display for FinalizeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Settled => write!(f, "SETTLED"),
            Self::AlreadySettled => write!(f, "ALREADY_SETTLED"),
            Self::NotReady => write!(f, "NOT_READY"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Result for one pool in a finalize request.
#[derive(Debug)]
pub struct PoolFinalization {
    pub pool_id: PoolId,
    pub result: Result<SettlementRecord>,
}

impl PoolFinalization {
    #[must_use]
    pub fn status(&self) -> FinalizeStatus {
        FinalizeStatus::of(&self.result)
    }
}

/// Outcome of one finalize request, ordered by pool id.
#[derive(Debug)]
pub struct FinalizeReport {
    pub batch_id: BatchId,
    /// The single clock reading every pool in the batch was judged against.
    pub evaluated_at: DateTime<Utc>,
    pub outcomes: Vec<PoolFinalization>,
}

impl FinalizeReport {
    #[must_use]
    pub fn status(&self, pool_id: PoolId) -> Option<FinalizeStatus> {
        self.outcomes
            .iter()
            .find(|o| o.pool_id == pool_id)
            .map(PoolFinalization::status)
    }

    #[must_use]
    pub fn count(&self, status: FinalizeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status() == status).count()
    }

    /// Records of the pools this request settled.
    pub fn settled(&self) -> impl Iterator<Item = &SettlementRecord> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }
}

/// Run `finalize_one` for every distinct id in `pool_ids`, in parallel.
///
/// Results come back ordered by pool id. A panic in a worker is
/// propagated to the caller.
pub(crate) fn run_batch<T, F>(pool_ids: &[PoolId], finalize_one: F) -> Vec<(PoolId, Result<T>)>
where
    T: Send,
    F: Fn(PoolId) -> Result<T> + Sync,
{
    let ids: Vec<PoolId> = pool_ids
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if ids.len() <= 1 {
        return ids.into_iter().map(|id| (id, finalize_one(id))).collect();
    }

    let workers = thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .min(ids.len());
    let chunk_len = ids.len().div_ceil(workers);
    let finalize_one = &finalize_one;

    let mut results: Vec<(PoolId, Result<T>)> = thread::scope(|s| {
        let handles: Vec<_> = ids
            .chunks(chunk_len)
            .map(|chunk| {
                s.spawn(move || {
                    chunk
                        .iter()
                        .map(|id| (*id, finalize_one(*id)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    });
    results.sort_by_key(|(id, _)| *id);
    results
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn status_mapping() {
        let ok: Result<()> = Ok(());
        assert_eq!(FinalizeStatus::of(&ok), FinalizeStatus::Settled);
        let done: Result<()> = Err(AuctionError::AlreadySettled(PoolId(1)));
        assert_eq!(FinalizeStatus::of(&done), FinalizeStatus::AlreadySettled);
        let early: Result<()> = Err(AuctionError::NotFinalizable(PoolId(1)));
        assert_eq!(FinalizeStatus::of(&early), FinalizeStatus::NotReady);
        let missing: Result<()> = Err(AuctionError::PoolNotFound(PoolId(1)));
        assert_eq!(FinalizeStatus::of(&missing), FinalizeStatus::Rejected);
    }

    #[test]
    fn duplicates_run_once_and_results_are_ordered() {
        let calls = AtomicUsize::new(0);
        let ids = [PoolId(3), PoolId(1), PoolId(3), PoolId(2), PoolId(1)];
        let results = run_batch(&ids, |id| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(id.0 * 10)
        });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let got: Vec<(PoolId, u64)> = results
            .into_iter()
            .map(|(id, r)| (id, r.unwrap()))
            .collect();
        assert_eq!(got, vec![(PoolId(1), 10), (PoolId(2), 20), (PoolId(3), 30)]);
    }

    #[test]
    fn one_failure_does_not_abort_others() {
        let ids: Vec<PoolId> = (1..=20).map(PoolId).collect();
        let results = run_batch(&ids, |id| {
            if id.0 % 5 == 0 {
                Err(AuctionError::AlreadySettled(id))
            } else {
                Ok(())
            }
        });
        assert_eq!(results.len(), 20);
        assert_eq!(results.iter().filter(|(_, r)| r.is_err()).count(), 4);
    }

    #[test]
    fn empty_batch() {
        let results = run_batch(&[], |_| Ok(()));
        assert!(results.is_empty());
    }
}
