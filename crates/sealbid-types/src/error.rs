//! Error types for the Sealbid auction engine.
//!
//! All errors use the `SB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Pool errors
//! - 2xx: Commit errors
//! - 3xx: Reveal errors
//! - 4xx: Finalization / settlement errors
//! - 9xx: General / internal errors
//!
//! Every error is returned synchronously to the caller; the engine never
//! retries internally.

use thiserror::Error;

use crate::{Address, Phase, PoolId};

/// Central error enum for all Sealbid operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    // =================================================================
    // Pool Errors (1xx)
    // =================================================================
    /// Malformed pool creation input.
    #[error("SB_ERR_100: Invalid pool parameters: {reason}")]
    InvalidParameters { reason: String },

    /// No pool with this id exists.
    #[error("SB_ERR_101: Pool not found: {0}")]
    PoolNotFound(PoolId),

    /// The operation is not valid in the pool's current phase.
    #[error("SB_ERR_102: Wrong phase for {pool}: expected {expected}, got {actual}")]
    PhaseError {
        pool: PoolId,
        expected: Phase,
        actual: Phase,
    },

    // =================================================================
    // Commit Errors (2xx)
    // =================================================================
    /// The bidder already holds a commitment in this pool.
    #[error("SB_ERR_200: Duplicate commitment by {bidder} in {pool}")]
    DuplicateCommitment { pool: PoolId, bidder: Address },

    // =================================================================
    // Reveal Errors (3xx)
    // =================================================================
    /// The bidder never committed in this pool.
    #[error("SB_ERR_300: No commitment by {bidder} in {pool}")]
    NoSuchCommitment { pool: PoolId, bidder: Address },

    /// The commitment has already been opened.
    #[error("SB_ERR_301: Commitment by {bidder} in {pool} already revealed")]
    AlreadyRevealed { pool: PoolId, bidder: Address },

    /// (quantity, price, salt) does not reproduce the stored hash.
    #[error("SB_ERR_302: Reveal does not match commitment hash")]
    HashMismatch,

    /// The revealed price is below the pool's reserve.
    #[error("SB_ERR_303: Price {price} below reserve {min_price}")]
    PriceTooLow { price: u128, min_price: u128 },

    /// The deposit does not equal the bid's quote amount exactly.
    #[error("SB_ERR_304: Deposit mismatch: expected {expected}, paid {paid}")]
    DepositMismatch { expected: u128, paid: u128 },

    /// The revealed quantity is zero.
    #[error("SB_ERR_305: Revealed quantity must be positive")]
    ZeroQuantity,

    // =================================================================
    // Finalization / Settlement Errors (4xx)
    // =================================================================
    /// The pool has already been settled.
    #[error("SB_ERR_400: {0} already settled")]
    AlreadySettled(PoolId),

    /// Finalization attempted before the reveal deadline.
    #[error("SB_ERR_401: {0} not finalizable before its reveal deadline")]
    NotFinalizable(PoolId),

    /// A settlement plan does not conserve asset or payment supply.
    #[error("SB_ERR_402: Conservation violation: {reason}")]
    ConservationViolation { reason: String },

    /// The external value-transfer ledger refused the plan.
    #[error("SB_ERR_403: Transfer failed: {reason}")]
    TransferFailed { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// An amount computation overflowed `u128`.
    #[error("SB_ERR_900: Arithmetic overflow: {context}")]
    ArithmeticOverflow { context: String },

    /// Serialization / parsing error.
    #[error("SB_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, out-of-range values, etc.).
    #[error("SB_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl AuctionError {
    /// Errors that report an operation which already happened. Callers can
    /// surface these as "already done".
    #[must_use]
    pub fn is_idempotence_guard(&self) -> bool {
        matches!(
            self,
            Self::DuplicateCommitment { .. } | Self::AlreadyRevealed { .. } | Self::AlreadySettled(_)
        )
    }

    /// Errors that may resolve by retrying the same request later, without
    /// changing its input (phase windows open, transfer ledger recovers).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PhaseError { .. } | Self::NotFinalizable(_) | Self::TransferFailed { .. }
        )
    }

    /// Errors that reject a reveal attempt. The attempt produces no bid.
    #[must_use]
    pub fn is_reveal_rejection(&self) -> bool {
        matches!(
            self,
            Self::NoSuchCommitment { .. }
                | Self::HashMismatch
                | Self::PriceTooLow { .. }
                | Self::DepositMismatch { .. }
                | Self::ZeroQuantity
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, AuctionError>;

impl From<serde_json::Error> for AuctionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = AuctionError::PoolNotFound(PoolId(9));
        let msg = format!("{err}");
        assert!(msg.starts_with("SB_ERR_101"), "Got: {msg}");
        assert!(msg.contains("pool:9"));
    }

    #[test]
    fn phase_error_display() {
        let err = AuctionError::PhaseError {
            pool: PoolId(1),
            expected: Phase::Reveal,
            actual: Phase::Commit,
        };
        let msg = format!("{err}");
        assert!(msg.contains("SB_ERR_102"));
        assert!(msg.contains("REVEAL"));
        assert!(msg.contains("COMMIT"));
    }

    #[test]
    fn deposit_mismatch_display() {
        let err = AuctionError::DepositMismatch {
            expected: 120,
            paid: 100,
        };
        let msg = format!("{err}");
        assert!(msg.contains("120"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn all_errors_have_sb_err_prefix() {
        let errors = vec![
            AuctionError::HashMismatch,
            AuctionError::AlreadySettled(PoolId(1)),
            AuctionError::NotFinalizable(PoolId(1)),
            AuctionError::Configuration("bad".into()),
            AuctionError::DuplicateCommitment {
                pool: PoolId(1),
                bidder: Address::from_byte(1),
            },
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(msg.starts_with("SB_ERR_"), "Error missing SB_ERR_ prefix: {msg}");
        }
    }

    #[test]
    fn taxonomy_classification() {
        assert!(AuctionError::AlreadySettled(PoolId(1)).is_idempotence_guard());
        assert!(!AuctionError::AlreadySettled(PoolId(1)).is_retryable());
        assert!(AuctionError::NotFinalizable(PoolId(1)).is_retryable());
        assert!(AuctionError::HashMismatch.is_reveal_rejection());
        assert!(!AuctionError::HashMismatch.is_retryable());
        assert!(
            !AuctionError::InvalidParameters {
                reason: "x".into()
            }
            .is_retryable()
        );
    }
}
