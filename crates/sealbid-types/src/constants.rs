//! System-wide constants for the Sealbid auction engine.

/// Length of the reveal window that follows a pool's commit deadline (15 minutes).
pub const REVEAL_WINDOW_SECS: u64 = 15 * 60;

/// Default fixed-point precision of prices (1e18, one whole payment unit).
pub const DEFAULT_PRICE_DECIMALS: u32 = 18;

/// Largest price precision whose amounts still convert to `Decimal`.
pub const MAX_PRICE_DECIMALS: u32 = 28;

/// Default identifier of the asset bidders pay with.
pub const DEFAULT_PAYMENT_ASSET: &str = "NATIVE";

/// Width of a commitment salt in bytes.
pub const SALT_LEN: usize = 32;

/// Width of a commitment hash in bytes.
pub const COMMITMENT_HASH_LEN: usize = 32;

/// Width of each integer field in the commitment pre-image (uint256, big-endian).
pub const COMMITMENT_FIELD_WIDTH: usize = 32;

/// Width of a participant address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Sealbid";
