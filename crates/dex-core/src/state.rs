//! Mirrored singleton state of a deployment and its published snapshot.

use crate::address::LedgerAddress;
use crate::error::{CoreError, Result};
use crate::order::{Order, OrderId, OrderSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Decoded `DexState` account.
///
/// `orders` keeps ledger insertion order, not price order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexState {
    /// Identity that initialized the deployment.
    pub authority: LedgerAddress,
    /// Next id the ledger will assign.
    pub order_count: u64,
    pub orders: Vec<Order>,
    pub initialized: bool,
}

impl DexState {
    /// Build a state from decoded ledger data.
    ///
    /// # Errors
    /// `CoreError::DuplicateOrderId` if two orders share an id.
    pub fn from_ledger(
        authority: LedgerAddress,
        order_count: u64,
        orders: Vec<Order>,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(orders.len());
        for order in &orders {
            if !seen.insert(order.id) {
                return Err(CoreError::DuplicateOrderId(order.id));
            }
        }
        Ok(Self {
            authority,
            order_count,
            orders,
            initialized: true,
        })
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub fn contains_order(&self, id: OrderId) -> bool {
        self.order(id).is_some()
    }

    pub fn orders_for(&self, owner: &LedgerAddress) -> impl Iterator<Item = &Order> + '_ {
        let owner = *owner;
        self.orders.iter().filter(move |o| o.owner == owner)
    }

    pub fn side(&self, side: OrderSide) -> impl Iterator<Item = &Order> + '_ {
        self.orders.iter().filter(move |o| o.side == side)
    }

    /// Highest bid and lowest ask, if both sides rest.
    pub fn best_bid_ask(&self) -> (Option<u64>, Option<u64>) {
        let bid = self.side(OrderSide::Buy).map(|o| o.price).max();
        let ask = self.side(OrderSide::Sell).map(|o| o.price).min();
        (bid, ask)
    }
}

/// A state as observed by one successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexSnapshot {
    pub state: DexState,
    pub fetched_at: DateTime<Utc>,
}

impl DexSnapshot {
    pub fn new(state: DexState) -> Self {
        Self {
            state,
            fetched_at: Utc::now(),
        }
    }
}

/// Observable view of the deployment.
///
/// Snapshots are shared, never mutated after publication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DexView {
    /// No fetch has completed yet. Reads as not initialized.
    #[default]
    Unknown,
    /// The state account does not exist: the deployment is not initialized.
    Uninitialized,
    /// Last successfully fetched state.
    Ready(Arc<DexSnapshot>),
}

impl DexView {
    pub fn ready(state: DexState) -> Self {
        Self::Ready(Arc::new(DexSnapshot::new(state)))
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn state(&self) -> Option<&DexState> {
        match self {
            Self::Ready(snapshot) => Some(&snapshot.state),
            _ => None,
        }
    }

    /// Orders in the snapshot; empty unless `Ready`.
    pub fn orders(&self) -> &[Order] {
        self.state().map(|s| s.orders.as_slice()).unwrap_or_default()
    }

    pub fn contains_order(&self, id: OrderId) -> bool {
        self.state().is_some_and(|s| s.contains_order(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: u64, side: OrderSide, price: u64) -> Order {
        Order {
            id: OrderId(id),
            side,
            owner: LedgerAddress::new([1; 32]),
            amount: 100,
            price,
            fulfilled: 0,
        }
    }

    #[test]
    fn test_from_ledger_rejects_duplicate_ids() {
        let orders = vec![order(1, OrderSide::Buy, 10), order(1, OrderSide::Sell, 11)];
        let err = DexState::from_ledger(LedgerAddress::default(), 2, orders).unwrap_err();
        assert_eq!(err, CoreError::DuplicateOrderId(OrderId(1)));
    }

    #[test]
    fn test_from_ledger_keeps_insertion_order() {
        let orders = vec![order(5, OrderSide::Buy, 9), order(2, OrderSide::Buy, 12)];
        let state = DexState::from_ledger(LedgerAddress::default(), 6, orders).unwrap();
        assert!(state.initialized);
        let ids: Vec<u64> = state.orders.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![5, 2]);
    }

    #[test]
    fn test_best_bid_ask() {
        let orders = vec![
            order(0, OrderSide::Buy, 9),
            order(1, OrderSide::Buy, 12),
            order(2, OrderSide::Sell, 15),
            order(3, OrderSide::Sell, 13),
        ];
        let state = DexState::from_ledger(LedgerAddress::default(), 4, orders).unwrap();
        assert_eq!(state.best_bid_ask(), (Some(12), Some(13)));
    }

    #[test]
    fn test_view_accessors() {
        assert!(!DexView::Unknown.is_initialized());
        assert!(DexView::Uninitialized.orders().is_empty());

        let state =
            DexState::from_ledger(LedgerAddress::default(), 1, vec![order(0, OrderSide::Buy, 1)])
                .unwrap();
        let view = DexView::ready(state);
        assert!(view.is_initialized());
        assert!(view.contains_order(OrderId(0)));
        assert!(!view.contains_order(OrderId(1)));
    }
}
