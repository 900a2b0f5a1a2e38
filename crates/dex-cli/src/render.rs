//! Plain-text rendering of snapshots for the terminal.

use std::fmt::Write;

use dex_client::MutationReceipt;
use dex_core::{DexView, LedgerAddress, OrderSide};

pub fn render_view(view: &DexView, me: Option<&LedgerAddress>) -> String {
    let (snapshot, state) = match view {
        DexView::Unknown => return "state: unknown (not fetched)\n".to_string(),
        DexView::Uninitialized => return "state: not initialized\n".to_string(),
        DexView::Ready(snapshot) => (snapshot, &snapshot.state),
    };

    let mut out = String::new();
    let _ = writeln!(out, "authority: {}", state.authority);
    let _ = writeln!(
        out,
        "orders: {} (next id {}), fetched {}",
        state.orders.len(),
        state.order_count,
        snapshot.fetched_at.format("%H:%M:%S")
    );
    if let Some(me) = me {
        let _ = writeln!(out, "yours: {}", state.orders_for(me).count());
    }
    let (bid, ask) = state.best_bid_ask();
    let _ = writeln!(
        out,
        "best bid/ask: {} / {}",
        bid.map_or("-".to_string(), |p| p.to_string()),
        ask.map_or("-".to_string(), |p| p.to_string())
    );

    for side in [OrderSide::Sell, OrderSide::Buy] {
        for order in state.side(side) {
            let mine = if me.is_some_and(|me| order.is_owned_by(me)) {
                " *"
            } else {
                ""
            };
            let _ = writeln!(out, "  {order}{mine}");
        }
    }
    out
}

pub fn render_receipt(receipt: &MutationReceipt) -> String {
    let mut out = format!("{} finalized: {}", receipt.method, receipt.signature());
    if let Some(slot) = receipt.confirmation.slot {
        let _ = write!(out, " (slot {slot})");
    }
    if let Some(error) = &receipt.refresh_error {
        let _ = write!(out, "\nwarning: state not refreshed: {error}");
    }
    out.push('\n');
    out
}
