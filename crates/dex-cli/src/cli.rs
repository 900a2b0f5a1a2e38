//! Command-line arguments.

use clap::{Parser, Subcommand};
use dex_core::OrderSide;

/// Client for the on-ledger order book.
#[derive(Parser, Debug)]
#[command(name = "dex", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (can also be set via DEX_CONFIG env var)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch and print the order book
    State,
    /// Create the order book; the keypair becomes its authority
    Initialize,
    /// Place an order
    Place {
        /// buy | sell
        side: OrderSide,
        amount: u64,
        price: u64,
    },
    /// Cancel one of your resting orders
    Cancel { order_id: u64 },
    /// Ask the program to cross the book
    Match,
    /// Print every new snapshot until interrupted
    Watch {
        /// Seconds between ledger reads
        #[arg(short, long, default_value_t = 5)]
        interval: u64,
    },
}
