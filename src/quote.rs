//! Quote engine: estimated payment for a prospective purchase
//!
//! The estimate is `base_price * (supply + quantity)`. This is a linear
//! approximation of the bonding-curve integral over
//! `[supply, supply + quantity]`; for a nonlinear on-chain curve it diverges
//! from the charged amount when `quantity > 1`. Keep it as is until the
//! on-chain formula is confirmed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requested purchase quantity, always at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quantity(u64);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    /// Clamp an integer request to `>= 1`
    pub fn new(n: i64) -> Self {
        if n < 1 {
            Self::ONE
        } else {
            Self(n as u64)
        }
    }

    /// Read user-typed text; empty, non-numeric and `< 1` input become 1
    pub fn parse_input(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Self::new(n);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() && f >= 1.0 => Self::new(f.trunc().min(i64::MAX as f64) as i64),
            _ => Self::ONE,
        }
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Quantity {
    fn from(n: u64) -> Self {
        Self(n.max(1))
    }
}

/// Estimated payment for `quantity` more units, or `None` when the quote is
/// unavailable (missing or non-finite price/supply). `None` never means zero.
pub fn compute_quote(base_price: Option<f64>, supply: Option<f64>, quantity: Quantity) -> Option<f64> {
    let price = base_price.filter(|p| p.is_finite())?;
    let supply = supply.filter(|s| s.is_finite())?;
    let payment = price * (supply + quantity.get() as f64);
    payment.is_finite().then_some(payment)
}

/// Price and supply read together in one successful round
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub base_price: f64,
    pub supply: u64,
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    pub fn new(base_price: f64, supply: u64) -> Self {
        Self {
            base_price,
            supply,
            observed_at: Utc::now(),
        }
    }

    /// Payment estimate for `quantity` against this observation
    pub fn payment_for(&self, quantity: Quantity) -> Option<f64> {
        compute_quote(Some(self.base_price), Some(self.supply as f64), quantity)
    }
}

/// Derived quote data exposed to the UI
///
/// Rebuilt from the latest applied [`Observation`] and the current quantity,
/// never patched field by field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuoteState {
    pub base_price: Option<f64>,
    pub supply: Option<u64>,
    pub estimated_payment: Option<f64>,
    pub fetching: bool,
}

impl QuoteState {
    /// All fields null; shown as placeholders
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn derive(observation: Option<&Observation>, quantity: Quantity, fetching: bool) -> Self {
        match observation {
            Some(obs) => Self {
                base_price: Some(obs.base_price),
                supply: Some(obs.supply),
                estimated_payment: obs.payment_for(quantity),
                fetching,
            },
            None => Self {
                fetching,
                ..Self::unavailable()
            },
        }
    }

    pub fn is_available(&self) -> bool {
        self.estimated_payment.is_some()
    }
}
