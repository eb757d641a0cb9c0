//! # sealbid-ingress
//!
//! **Bid ingress**: everything that happens to a pool before clearing.
//!
//! ## Components
//!
//! 1. **commitment**: the commitment codec, `commit` / `verify` over the
//!    packed (quantity, price, salt) pre-image
//! 2. **PoolRegistry**: pool creation, the single phase derivation, and
//!    the persisted `settled` flag
//! 3. **BidLedger**: per-pool commitments and reveals, checked against
//!    the codec, closed for good when clearing reads it
//!
//! ## Bid Flow
//!
//! ```text
//! PoolRegistry.create_pool() → BidLedger.commit()   (COMMIT phase)
//!                            → BidLedger.reveal()   (REVEAL phase)
//!                            → BidLedger.with_closed_book() → clearing
//! ```

pub mod bid_ledger;
pub mod commitment;
pub mod pool_registry;

pub use bid_ledger::{BidLedger, Reveal};
pub use pool_registry::PoolRegistry;
