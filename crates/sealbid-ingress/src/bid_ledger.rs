//! Bid ledger: per-pool append-only store of commitments and reveals.
//!
//! ## Locking
//!
//! Each pool has its own book. Within a book, commitments are sharded by
//! bidder, so commit/reveal calls for the same (pool, bidder) pair are
//! serialized while different bidders proceed in parallel. Reveals also
//! hold the book's gate in shared mode; clearing takes it exclusively and
//! closes the book, so the clearing snapshot can never miss an in-flight
//! reveal or be followed by a late one.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use parking_lot::RwLock;
use sealbid_types::{
    Address, AuctionError, Commitment, CommitmentHash, Phase, Pool, PoolId, PriceScale, Result,
    RevealedBid, Salt,
};

use crate::commitment;

/// A bidder's opening of an earlier commitment, backed by a deposit.
#[derive(Debug, Clone)]
pub struct Reveal {
    pub bidder: Address,
    pub quantity: u128,
    pub price: u128,
    pub salt: Salt,
    pub deposit_paid: u128,
}

struct CommitmentEntry {
    hash: CommitmentHash,
    revealed: Option<RevealedBid>,
}

#[derive(Default)]
struct PoolBook {
    /// Shared by reveals, exclusive while clearing.
    gate: RwLock<()>,
    /// Set once clearing has read the book.
    closed: AtomicBool,
    commitments: DashMap<Address, CommitmentEntry>,
    next_reveal_seq: AtomicU64,
}

impl PoolBook {
    fn revealed_bids(&self) -> Vec<RevealedBid> {
        let mut bids: Vec<RevealedBid> = self
            .commitments
            .iter()
            .filter_map(|entry| entry.revealed.clone())
            .collect();
        bids.sort_by_key(|b| b.reveal_seq);
        bids
    }
}

/// Stores sealed bids and their openings. The only writer of bid records.
pub struct BidLedger {
    books: DashMap<PoolId, Arc<PoolBook>>,
    scale: PriceScale,
}

impl BidLedger {
    #[must_use]
    pub fn new(scale: PriceScale) -> Self {
        Self {
            books: DashMap::new(),
            scale,
        }
    }

    /// Create the empty book for a freshly registered pool. Idempotent.
    pub fn open_book(&self, pool_id: PoolId) {
        self.books.entry(pool_id).or_default();
    }

    /// Record a sealed bid.
    ///
    /// # Errors
    /// - `PhaseError` unless the pool is in COMMIT at `now`
    /// - `DuplicateCommitment` if the bidder already committed in this pool
    pub fn commit(
        &self,
        pool: &Pool,
        bidder: Address,
        hash: CommitmentHash,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let book = self.book(pool.id)?;
        let phase = pool.phase_at(now);
        if phase != Phase::Commit {
            return Err(AuctionError::PhaseError {
                pool: pool.id,
                expected: Phase::Commit,
                actual: phase,
            });
        }

        match book.commitments.entry(bidder) {
            Entry::Occupied(_) => Err(AuctionError::DuplicateCommitment {
                pool: pool.id,
                bidder,
            }),
            Entry::Vacant(slot) => {
                slot.insert(CommitmentEntry {
                    hash,
                    revealed: None,
                });
                tracing::debug!(pool = %pool.id, bidder = %bidder, hash = %hash, "Commitment accepted");
                Ok(())
            }
        }
    }

    /// Open a commitment. This is the only path that produces a [`RevealedBid`].
    ///
    /// A rejected attempt leaves the commitment untouched.
    ///
    /// # Errors
    /// In check order: `PhaseError`, `NoSuchCommitment`, `AlreadyRevealed`,
    /// `HashMismatch`, `ZeroQuantity`, `PriceTooLow`, `DepositMismatch`.
    pub fn reveal(&self, pool: &Pool, reveal: &Reveal, now: DateTime<Utc>) -> Result<RevealedBid> {
        let result = self.try_reveal(pool, reveal, now);
        match &result {
            Ok(bid) => tracing::debug!(
                pool = %pool.id,
                bidder = %bid.bidder,
                quantity = bid.quantity,
                price = bid.price,
                seq = bid.reveal_seq,
                "Reveal accepted"
            ),
            Err(err) if err.is_reveal_rejection() => tracing::warn!(
                pool = %pool.id,
                bidder = %reveal.bidder,
                error = %err,
                "Reveal rejected"
            ),
            Err(_) => {}
        }
        result
    }

    fn try_reveal(&self, pool: &Pool, reveal: &Reveal, now: DateTime<Utc>) -> Result<RevealedBid> {
        let book = self.book(pool.id)?;
        let _gate = book.gate.read();

        let phase = pool.phase_at(now);
        if phase != Phase::Reveal || book.closed.load(Ordering::Acquire) {
            return Err(AuctionError::PhaseError {
                pool: pool.id,
                expected: Phase::Reveal,
                actual: if phase == Phase::Reveal {
                    Phase::FinalizeReady
                } else {
                    phase
                },
            });
        }

        let mut entry = book
            .commitments
            .get_mut(&reveal.bidder)
            .ok_or(AuctionError::NoSuchCommitment {
                pool: pool.id,
                bidder: reveal.bidder,
            })?;
        if entry.revealed.is_some() {
            return Err(AuctionError::AlreadyRevealed {
                pool: pool.id,
                bidder: reveal.bidder,
            });
        }
        if !commitment::verify(&entry.hash, reveal.quantity, reveal.price, &reveal.salt) {
            return Err(AuctionError::HashMismatch);
        }
        if reveal.quantity == 0 {
            return Err(AuctionError::ZeroQuantity);
        }
        if reveal.price < pool.min_price {
            return Err(AuctionError::PriceTooLow {
                price: reveal.price,
                min_price: pool.min_price,
            });
        }
        let expected = self.scale.quote_amount(reveal.quantity, reveal.price)?;
        if reveal.deposit_paid != expected {
            return Err(AuctionError::DepositMismatch {
                expected,
                paid: reveal.deposit_paid,
            });
        }

        let bid = RevealedBid {
            bidder: reveal.bidder,
            quantity: reveal.quantity,
            price: reveal.price,
            deposit_paid: reveal.deposit_paid,
            reveal_seq: book.next_reveal_seq.fetch_add(1, Ordering::Relaxed),
        };
        entry.revealed = Some(bid.clone());
        Ok(bid)
    }

    /// Read-only snapshot of accepted reveals, in reveal order.
    pub fn revealed_bids_for(&self, pool_id: PoolId) -> Result<Vec<RevealedBid>> {
        let book = self.book(pool_id)?;
        let _gate = book.gate.read();
        Ok(book.revealed_bids())
    }

    /// Close the book and run `clear` over the final bid set while holding
    /// the book exclusively. No reveal is accepted for this pool afterwards.
    ///
    /// # Errors
    /// `NotFinalizable` if `now` is before the pool's reveal deadline.
    pub fn with_closed_book<R>(
        &self,
        pool: &Pool,
        now: DateTime<Utc>,
        clear: impl FnOnce(&[RevealedBid]) -> R,
    ) -> Result<R> {
        let book = self.book(pool.id)?;
        let _gate = book.gate.write();
        if now < pool.reveal_deadline {
            return Err(AuctionError::NotFinalizable(pool.id));
        }
        book.closed.store(true, Ordering::Release);
        let bids = book.revealed_bids();
        Ok(clear(&bids))
    }

    /// The bidder's commitment in this pool, if any.
    pub fn commitment_of(&self, pool_id: PoolId, bidder: &Address) -> Result<Option<Commitment>> {
        let book = self.book(pool_id)?;
        Ok(book.commitments.get(bidder).map(|entry| Commitment {
            hash: entry.hash,
            revealed: entry.revealed.is_some(),
        }))
    }

    pub fn commitment_count(&self, pool_id: PoolId) -> Result<usize> {
        Ok(self.book(pool_id)?.commitments.len())
    }

    pub fn revealed_count(&self, pool_id: PoolId) -> Result<usize> {
        let book = self.book(pool_id)?;
        Ok(book
            .commitments
            .iter()
            .filter(|entry| entry.revealed.is_some())
            .count())
    }

    // Clones the Arc so the map shard is released before any book lock is taken.
    fn book(&self, pool_id: PoolId) -> Result<Arc<PoolBook>> {
        self.books
            .get(&pool_id)
            .map(|b| Arc::clone(b.value()))
            .ok_or(AuctionError::PoolNotFound(pool_id))
    }
}
