//! # sealbid-types
//!
//! Shared types, errors, and configuration for the **Sealbid**
//! commit-reveal batch auction engine.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`PoolId`], [`Address`], [`BatchId`], [`Asset`]
//! - **Pool model**: [`Pool`], [`Phase`], [`PhaseInfo`], [`AuctionStats`]
//! - **Bid model**: [`CommitmentHash`], [`Salt`], [`Commitment`], [`RevealedBid`]
//! - **Settlement model**: [`Allocation`], [`Transfer`], [`TransferPlan`]
//! - **Configuration**: [`AuctionConfig`], [`PriceScale`]
//! - **Errors**: [`AuctionError`] with `SB_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod bid;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod pool;
pub mod settlement;

pub use bid::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use pool::*;
pub use settlement::*;

// Constants are accessed via `sealbid_types::constants::FOO`
// (not re-exported to avoid name collisions).
