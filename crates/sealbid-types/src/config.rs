//! Engine configuration and the fixed-point price convention.

use std::time::Duration;

use alloy_primitives::U256;
use chrono::TimeDelta;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AuctionError, Result, constants};

/// Configuration for one auction engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionConfig {
    /// Length of the reveal window following every commit deadline.
    pub reveal_window: Duration,
    /// Fixed-point decimals of prices; `quote = quantity * price / 10^decimals`.
    pub price_decimals: u32,
    /// Asset bidders deposit and receive refunds in.
    pub payment_asset: String,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            reveal_window: Duration::from_secs(constants::REVEAL_WINDOW_SECS),
            price_decimals: constants::DEFAULT_PRICE_DECIMALS,
            payment_asset: constants::DEFAULT_PAYMENT_ASSET.to_string(),
        }
    }
}

impl AuctionConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the engine cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.reveal_window.is_zero() {
            return Err(AuctionError::Configuration(
                "reveal_window must be non-zero".to_string(),
            ));
        }
        if TimeDelta::from_std(self.reveal_window).is_err() {
            return Err(AuctionError::Configuration(
                "reveal_window out of range".to_string(),
            ));
        }
        if self.price_decimals > constants::MAX_PRICE_DECIMALS {
            return Err(AuctionError::Configuration(format!(
                "price_decimals {} exceeds {}",
                self.price_decimals,
                constants::MAX_PRICE_DECIMALS
            )));
        }
        if self.payment_asset.is_empty() {
            return Err(AuctionError::Configuration(
                "payment_asset must be set".to_string(),
            ));
        }
        Ok(())
    }

    /// Reveal window as a calendar delta. Saturates for out-of-range windows,
    /// which `validate` rejects up front.
    #[must_use]
    pub fn reveal_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.reveal_window).unwrap_or(TimeDelta::MAX)
    }

    #[must_use]
    pub fn price_scale(&self) -> PriceScale {
        PriceScale::new(self.price_decimals)
    }
}

/// Fixed-point convention shared by prices, deposits and refunds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceScale {
    decimals: u32,
}

impl PriceScale {
    #[must_use]
    pub fn new(decimals: u32) -> Self {
        Self { decimals }
    }

    #[must_use]
    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// `10^decimals`, or `None` when it does not fit in `u128`.
    #[must_use]
    pub fn unit(&self) -> Option<u128> {
        10u128.checked_pow(self.decimals)
    }

    /// Amount owed for `quantity` units at `price`: `quantity * price / unit`.
    ///
    /// The product is taken in 256 bits, so only a quotient that does not
    /// fit in `u128` is an overflow. Integer division truncates, so the
    /// result is monotone in both inputs.
    pub fn quote_amount(&self, quantity: u128, price: u128) -> Result<u128> {
        let unit = self.unit().ok_or_else(|| AuctionError::ArithmeticOverflow {
            context: format!("price unit 10^{}", self.decimals),
        })?;
        // 128 x 128 bits always fits in 256.
        let gross = U256::from(quantity) * U256::from(price);
        let net = gross / U256::from(unit);
        u128::try_from(net).map_err(|_| AuctionError::ArithmeticOverflow {
            context: format!("{quantity} * {price} / 10^{}", self.decimals),
        })
    }

    /// Render a fixed-point amount for display, e.g. `1_800_000` with six
    /// decimals as `1.8`. `None` if it exceeds `Decimal`'s range.
    #[must_use]
    pub fn to_decimal(&self, amount: u128) -> Option<Decimal> {
        let signed = i128::try_from(amount).ok()?;
        Decimal::try_from_i128_with_scale(signed, self.decimals)
            .ok()
            .map(|d| d.normalize())
    }

    /// Human-readable amount for logs and summaries. Falls back to the raw
    /// integer when `Decimal` cannot hold it.
    #[must_use]
    pub fn format(&self, amount: u128) -> String {
        self.to_decimal(amount)
            .map_or_else(|| format!("{amount}e-{}", self.decimals), |d| d.to_string())
    }
}

impl Default for PriceScale {
    fn default() -> Self {
        Self::new(constants::DEFAULT_PRICE_DECIMALS)
    }
}
