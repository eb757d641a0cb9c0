//! # sealbid-settlement
//!
//! **Finality Plane**: clearing-to-settlement, transfer execution, and
//! batch finalization.
//!
//! ## Architecture
//!
//! [`AuctionEngine::finalize`] takes a list of pools and, for each one
//! that is ready:
//! 1. Closes the pool's bid book (no further reveals)
//! 2. Clears the revealed bids at a uniform price
//! 3. Computes allocations, refunds and a [`TransferPlan`](sealbid_types::TransferPlan)
//! 4. Checks the plan pays out exactly what was escrowed
//! 5. Hands the plan to a [`TransferSink`]
//! 6. Marks the pool settled and stores its [`SettlementRecord`]
//!
//! A pool whose plan the sink refuses stays unsettled and can be
//! finalized again.

pub mod calculator;
pub mod conservation;
pub mod engine;
pub mod scheduler;
pub mod sink;

pub use calculator::{Settlement, settle};
pub use conservation::SupplyConservation;
pub use engine::{AuctionEngine, SettlementRecord};
pub use scheduler::{FinalizeReport, FinalizeStatus, PoolFinalization};
pub use sink::{InMemoryLedger, TransferSink};
