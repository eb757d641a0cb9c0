//! Settlement output: per-bidder allocations and the transfer plan handed
//! to the external value-transfer ledger.
//!
//! The engine only computes these amounts; it never moves value itself.

use serde::{Deserialize, Serialize};

use crate::{Address, Asset, PoolId};

/// Final outcome for one revealed bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub bidder: Address,
    pub filled_quantity: u128,
    /// Amount kept from the deposit: fill quote at the clearing price.
    pub cost: u128,
    /// `deposit_paid - cost`.
    pub refund_amount: u128,
}

impl Allocation {
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.filled_quantity > 0
    }
}

/// A single value movement instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transfer {
    /// Sold asset delivered to a winning bidder.
    AssetToBidder { bidder: Address, quantity: u128 },
    /// Unspent deposit returned to a bidder.
    RefundToBidder { bidder: Address, amount: u128 },
    /// Unsold asset returned to the seller.
    UnsoldToSeller { seller: Address, quantity: u128 },
    /// Winners' payments forwarded to the seller.
    ProceedsToSeller { seller: Address, amount: u128 },
}

impl Transfer {
    /// Recipient of this transfer.
    #[must_use]
    pub fn recipient(&self) -> Address {
        match self {
            Self::AssetToBidder { bidder, .. } | Self::RefundToBidder { bidder, .. } => *bidder,
            Self::UnsoldToSeller { seller, .. } | Self::ProceedsToSeller { seller, .. } => *seller,
        }
    }

    /// Whether the transfer moves the auctioned asset (as opposed to payment).
    #[must_use]
    pub fn is_asset(&self) -> bool {
        matches!(self, Self::AssetToBidder { .. } | Self::UnsoldToSeller { .. })
    }

    #[must_use]
    pub fn amount(&self) -> u128 {
        match self {
            Self::AssetToBidder { quantity, .. } | Self::UnsoldToSeller { quantity, .. } => {
                *quantity
            }
            Self::RefundToBidder { amount, .. } | Self::ProceedsToSeller { amount, .. } => *amount,
        }
    }
}

/// Every transfer required to settle one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPlan {
    pub pool_id: PoolId,
    /// The auctioned asset.
    pub asset: Asset,
    /// The asset deposits were paid in.
    pub payment_asset: Asset,
    pub transfers: Vec<Transfer>,
}

impl TransferPlan {
    /// Total auctioned asset moved by this plan.
    #[must_use]
    pub fn asset_out(&self) -> u128 {
        self.transfers
            .iter()
            .filter(|t| t.is_asset())
            .map(Transfer::amount)
            .sum()
    }

    /// Total payment asset moved by this plan.
    #[must_use]
    pub fn payment_out(&self) -> u128 {
        self.transfers
            .iter()
            .filter(|t| !t.is_asset())
            .map(Transfer::amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> TransferPlan {
        let seller = Address::from_byte(9);
        let a = Address::from_byte(1);
        TransferPlan {
            pool_id: PoolId(1),
            asset: "TOKEN".to_string(),
            payment_asset: "NATIVE".to_string(),
            transfers: vec![
                Transfer::AssetToBidder {
                    bidder: a,
                    quantity: 30,
                },
                Transfer::UnsoldToSeller {
                    seller,
                    quantity: 70,
                },
                Transfer::RefundToBidder { bidder: a, amount: 5 },
                Transfer::ProceedsToSeller {
                    seller,
                    amount: 30,
                },
            ],
        }
    }

    #[test]
    fn plan_totals_split_by_asset() {
        let p = plan();
        assert_eq!(p.asset_out(), 100);
        assert_eq!(p.payment_out(), 35);
    }

    #[test]
    fn transfer_recipient() {
        let p = plan();
        assert_eq!(p.transfers[0].recipient(), Address::from_byte(1));
        assert_eq!(p.transfers[1].recipient(), Address::from_byte(9));
    }

    #[test]
    fn plan_serde_roundtrip() {
        let p = plan();
        let json = serde_json::to_string(&p).unwrap();
        let back: TransferPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
