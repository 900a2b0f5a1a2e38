//! Order-book entries as the ledger stores them.

use crate::address::LedgerAddress;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order side: buy or sell.
///
/// Variant order matches the program's enum discriminants (Buy = 0, Sell = 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "bid" => Ok(Self::Buy),
            "sell" | "ask" => Ok(Self::Sell),
            other => Err(CoreError::InvalidSide(other.to_string())),
        }
    }
}

/// Ledger-assigned order identifier.
///
/// Monotonic per deployment; the client never invents one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl OrderId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A resting order.
///
/// `amount`, `price` and `fulfilled` are exact integers in the ledger's
/// native precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: OrderSide,
    pub owner: LedgerAddress,
    pub amount: u64,
    pub price: u64,
    /// Quantity already matched.
    pub fulfilled: u64,
}

impl Order {
    /// Quantity still open.
    pub fn remaining(&self) -> u64 {
        self.amount.saturating_sub(self.fulfilled)
    }

    pub fn is_owned_by(&self, owner: &LedgerAddress) -> bool {
        &self.owner == owner
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} @ {} (filled {})",
            self.id, self.side, self.amount, self.price, self.fulfilled
        )
    }
}

/// Check the client-side preconditions of a new order.
///
/// Only positivity is checked here. Balances and other business rules belong
/// to the ledger.
pub fn validate_order_params(amount: u64, price: u64) -> Result<()> {
    if amount == 0 {
        return Err(CoreError::InvalidAmount("amount must be positive".to_string()));
    }
    if price == 0 {
        return Err(CoreError::InvalidPrice("price must be positive".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_parse() {
        assert_eq!("Buy".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!(" sell ".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert!("hold".parse::<OrderSide>().is_err());
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_remaining() {
        let order = Order {
            id: OrderId(3),
            side: OrderSide::Sell,
            owner: LedgerAddress::default(),
            amount: 100,
            price: 10,
            fulfilled: 40,
        };
        assert_eq!(order.remaining(), 60);
        assert_eq!(order.to_string(), "#3 sell 100 @ 10 (filled 40)");
    }

    #[test]
    fn test_validate_order_params() {
        assert!(validate_order_params(100, 10).is_ok());
        assert!(matches!(
            validate_order_params(0, 10),
            Err(CoreError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_order_params(100, 0),
            Err(CoreError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_large_quantities_are_exact() {
        // Beyond 2^53, where a float would round.
        let amount = u64::MAX - 1;
        assert!(validate_order_params(amount, 1).is_ok());
        assert_eq!(amount.to_string(), "18446744073709551614");
    }
}
