//! # sealbid-clearing
//!
//! **Pure deterministic clearing for sealed-bid pools.**
//!
//! Takes the closed set of revealed bids for one pool and produces the
//! uniform clearing price plus one fill per bid. It has:
//!
//! - **Zero side effects**: no ledger writes, no transfers, no clock
//! - **Deterministic output**: same bids → same outcome and same `outcome_root`
//! - **Stable tie-break**: equal prices are served in reveal order

pub mod clearing;
pub mod determinism;

pub use clearing::{ClearingOutcome, Fill, clear};
pub use determinism::{outcome_root, verify_outcome_root};
