//! Uniform-price clearing for one pool.
//!
//! Given every revealed bid and the fixed supply, computes the single
//! clearing price and each bid's fill:
//!
//! 1. Sort by price descending; equal prices keep reveal order
//!    (first revealed, first served)
//! 2. Walk the sorted bids accumulating quantity; the **marginal bid** is
//!    the first one at which cumulative demand reaches supply
//! 3. Clearing price = the marginal bid's price, or the reserve when
//!    demand never reaches supply
//! 4. Bids ahead of the marginal bid fill in full, the marginal bid gets
//!    the remainder, everything after it gets zero
//!
//! Pure and deterministic: finalization may be retried and must reach the
//! same outcome every time.

use std::cmp::Ordering;

use sealbid_types::{Address, RevealedBid};
use serde::{Deserialize, Serialize};

/// One bid's result, in clearing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub bidder: Address,
    pub quantity: u128,
    pub price: u128,
    pub reveal_seq: u64,
    /// Units awarded; at most `quantity`.
    pub filled: u128,
}

/// Result of clearing one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearingOutcome {
    /// Uniform price paid by every filled bid. 0 when there were no bids.
    pub clearing_price: u128,
    /// Σ filled; equals supply unless demand fell short.
    pub total_allocated: u128,
    /// Total quantity requested by all bids (saturating).
    pub total_demand: u128,
    /// Every input bid, sorted into clearing order.
    pub fills: Vec<Fill>,
    /// Index into `fills` of the bid that exhausted supply, if any.
    pub marginal: Option<usize>,
}

impl ClearingOutcome {
    /// Units awarded to `bidder` (0 if they did not bid).
    #[must_use]
    pub fn filled_for(&self, bidder: &Address) -> u128 {
        self.fills
            .iter()
            .filter(|f| f.bidder == *bidder)
            .map(|f| f.filled)
            .sum()
    }

    #[must_use]
    pub fn winners(&self) -> usize {
        self.fills.iter().filter(|f| f.filled > 0).count()
    }

    /// Whether supply ran out before every bid was served.
    #[must_use]
    pub fn is_oversubscribed(&self) -> bool {
        self.marginal.is_some()
    }
}

/// Clearing order: price descending, then reveal order. The bidder key
/// only matters for malformed input with repeated sequence numbers.
fn clearing_order(a: &RevealedBid, b: &RevealedBid) -> Ordering {
    b.price
        .cmp(&a.price)
        .then(a.reveal_seq.cmp(&b.reveal_seq))
        .then(a.bidder.cmp(&b.bidder))
}

/// Clear a pool.
///
/// # Edge cases
/// - No bids: clearing price 0, nothing allocated
/// - Demand below supply: every bid fills in full at `min_price`
#[must_use]
pub fn clear(bids: &[RevealedBid], quantity_for_sale: u128, min_price: u128) -> ClearingOutcome {
    if bids.is_empty() {
        return ClearingOutcome {
            clearing_price: 0,
            total_allocated: 0,
            total_demand: 0,
            fills: Vec::new(),
            marginal: None,
        };
    }

    let mut sorted: Vec<&RevealedBid> = bids.iter().collect();
    sorted.sort_by(|a, b| clearing_order(a, b));

    let mut cumulative: u128 = 0;
    let mut marginal: Option<usize> = None;
    let mut fills = Vec::with_capacity(sorted.len());

    for (idx, bid) in sorted.iter().enumerate() {
        let filled = if marginal.is_some() {
            0
        } else {
            let before = cumulative;
            cumulative = cumulative.saturating_add(bid.quantity);
            if cumulative >= quantity_for_sale {
                marginal = Some(idx);
                quantity_for_sale - before
            } else {
                bid.quantity
            }
        };
        fills.push(Fill {
            bidder: bid.bidder,
            quantity: bid.quantity,
            price: bid.price,
            reveal_seq: bid.reveal_seq,
            filled,
        });
    }

    let clearing_price = marginal.map_or(min_price, |idx| fills[idx].price);
    let total_allocated = fills.iter().map(|f| f.filled).sum();
    let total_demand = bids
        .iter()
        .fold(0u128, |acc, b| acc.saturating_add(b.quantity));

    tracing::debug!(
        bids = fills.len(),
        clearing_price,
        total_allocated,
        total_demand,
        marginal = ?marginal,
        "Pool cleared"
    );

    ClearingOutcome {
        clearing_price,
        total_allocated,
        total_demand,
        fills,
        marginal,
    }
}
