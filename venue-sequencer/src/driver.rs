//! Trade generation
//!
//! The orchestrator pulls one [`Trade`] per trading step from a
//! [`TradeSource`]. The randomness source is injected so a seeded run can be
//! replayed exactly.

use crate::error::{Error, Result};
use crate::types::{Direction, Trade};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Supplies trades to the orchestrator
pub trait TradeSource: Send + Sync {
    /// Next trade, or `None` when the source has run out
    fn next_trade(&mut self) -> Option<Trade>;
}

/// Inclusive amount range in whole units, scaled to base units on draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeBounds {
    min_units: u64,
    max_units: u64,
    unit_scale: u128,
}

impl TradeBounds {
    /// Create bounds; `min_units` must be positive and not above `max_units`
    pub fn new(min_units: u64, max_units: u64, unit_scale: u128) -> Result<Self> {
        if min_units == 0 {
            return Err(Error::Config("trade minimum must be positive".to_string()));
        }
        if min_units > max_units {
            return Err(Error::Config(format!(
                "trade minimum {} exceeds maximum {}",
                min_units, max_units
            )));
        }
        if unit_scale == 0 {
            return Err(Error::Config("unit scale must be positive".to_string()));
        }
        if u128::from(max_units).checked_mul(unit_scale).is_none() {
            return Err(Error::Config("trade maximum overflows base units".to_string()));
        }
        Ok(Self {
            min_units,
            max_units,
            unit_scale,
        })
    }

    /// Smallest amount (base units)
    pub fn min_amount(&self) -> u128 {
        u128::from(self.min_units) * self.unit_scale
    }

    /// Largest amount (base units)
    pub fn max_amount(&self) -> u128 {
        u128::from(self.max_units) * self.unit_scale
    }

    /// Whether `amount` is a possible draw
    pub fn contains(&self, amount: u128) -> bool {
        amount % self.unit_scale == 0 && (self.min_amount()..=self.max_amount()).contains(&amount)
    }
}

/// Draws uniformly random trades
#[derive(Debug)]
pub struct RandomTradeDriver<R: Rng> {
    rng: R,
    bounds: TradeBounds,
    asset_to_native_probability: f64,
}

impl<R: Rng + Send + Sync> RandomTradeDriver<R> {
    /// Create with an injected RNG; probability is clamped to `[0, 1]`
    pub fn new(rng: R, bounds: TradeBounds, asset_to_native_probability: f64) -> Self {
        let probability = if asset_to_native_probability.is_nan() {
            0.5
        } else {
            asset_to_native_probability.clamp(0.0, 1.0)
        };
        Self {
            rng,
            bounds,
            asset_to_native_probability: probability,
        }
    }

    /// Draw one trade: amount first, then direction
    pub fn draw(&mut self) -> Trade {
        let units = self
            .rng
            .gen_range(self.bounds.min_units..=self.bounds.max_units);
        let zero_for_one = self.rng.gen_bool(self.asset_to_native_probability);

        Trade {
            direction: Direction::from_zero_for_one(zero_for_one),
            amount: u128::from(units) * self.bounds.unit_scale,
        }
    }
}

impl RandomTradeDriver<StdRng> {
    /// Reproducible driver
    pub fn seeded(seed: u64, bounds: TradeBounds, asset_to_native_probability: f64) -> Self {
        Self::new(StdRng::seed_from_u64(seed), bounds, asset_to_native_probability)
    }

    /// Driver seeded from OS entropy
    pub fn from_entropy(bounds: TradeBounds, asset_to_native_probability: f64) -> Self {
        Self::new(StdRng::from_entropy(), bounds, asset_to_native_probability)
    }
}

impl<R: Rng + Send + Sync> TradeSource for RandomTradeDriver<R> {
    fn next_trade(&mut self) -> Option<Trade> {
        Some(self.draw())
    }
}

/// Replays a fixed list of trades
#[derive(Debug, Clone, Default)]
pub struct ScriptedTrades {
    trades: VecDeque<Trade>,
}

impl ScriptedTrades {
    /// Create from a list
    pub fn new(trades: impl IntoIterator<Item = Trade>) -> Self {
        Self {
            trades: trades.into_iter().collect(),
        }
    }

    /// Trades not yet handed out
    pub fn remaining(&self) -> usize {
        self.trades.len()
    }
}

impl TradeSource for ScriptedTrades {
    fn next_trade(&mut self) -> Option<Trade> {
        self.trades.pop_front()
    }
}
