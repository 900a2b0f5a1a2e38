//! Anchor wire format for the order-book program.
//!
//! Instruction data: `sha256("global:<method>")[..8]` followed by borsh args.
//! Account data: `sha256("account:DexState")[..8]` followed by the borsh
//! layout `authority, order_count, orders`. Accounts are allocated with a
//! fixed size, so trailing zero padding after the layout is expected.

use crate::error::{LedgerError, LedgerResult};
use crate::instruction::{DexInstruction, DexMethod};
use borsh::{BorshDeserialize, BorshSerialize};
use dex_core::{DexState, LedgerAddress, Order, OrderId, OrderSide};
use sha2::{Digest, Sha256};

/// Length of instruction and account discriminators.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Account type name of the singleton state.
pub const DEX_STATE_ACCOUNT: &str = "DexState";

/// System program "account already in use".
pub const ACCOUNT_IN_USE_CODE: u32 = 0;
/// Anchor "account did not serialize" (state account full).
pub const ACCOUNT_DID_NOT_SERIALIZE_CODE: u32 = 3004;
/// Anchor "account not initialized".
pub const ACCOUNT_NOT_INITIALIZED_CODE: u32 = 3012;
/// Program `OrderNotFound`, the first custom error code.
pub const ORDER_NOT_FOUND_CODE: u32 = 6000;

fn discriminator(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

pub fn instruction_discriminator(method: DexMethod) -> [u8; DISCRIMINATOR_LEN] {
    discriminator("global", method.name())
}

pub fn account_discriminator(account: &str) -> [u8; DISCRIMINATOR_LEN] {
    discriminator("account", account)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
enum SideWire {
    Buy,
    Sell,
}

impl From<OrderSide> for SideWire {
    fn from(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => Self::Buy,
            OrderSide::Sell => Self::Sell,
        }
    }
}

impl From<SideWire> for OrderSide {
    fn from(side: SideWire) -> Self {
        match side {
            SideWire::Buy => Self::Buy,
            SideWire::Sell => Self::Sell,
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize)]
struct PlaceOrderArgs {
    side: SideWire,
    amount: u64,
    price: u64,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct CancelOrderArgs {
    order_id: u64,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct OrderWire {
    id: u64,
    owner: [u8; 32],
    side: SideWire,
    amount: u64,
    price: u64,
    fulfilled: u64,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct DexStateWire {
    authority: [u8; 32],
    order_count: u64,
    orders: Vec<OrderWire>,
}

fn encode_err(e: std::io::Error) -> LedgerError {
    LedgerError::Decode(format!("borsh encode failed: {e}"))
}

/// Encode instruction data for `instruction`.
pub fn encode_instruction_data(instruction: &DexInstruction) -> LedgerResult<Vec<u8>> {
    let mut data = instruction_discriminator(instruction.method()).to_vec();
    match instruction {
        DexInstruction::Initialize(_) | DexInstruction::MatchOrders(_) => {}
        DexInstruction::PlaceOrder {
            side,
            amount,
            price,
            ..
        } => {
            let args = PlaceOrderArgs {
                side: (*side).into(),
                amount: *amount,
                price: *price,
            };
            args.serialize(&mut data).map_err(encode_err)?;
        }
        DexInstruction::CancelOrder { order_id, .. } => {
            let args = CancelOrderArgs {
                order_id: order_id.value(),
            };
            args.serialize(&mut data).map_err(encode_err)?;
        }
    }
    Ok(data)
}

/// Decoded instruction arguments, as the program would see them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedCall {
    Initialize,
    PlaceOrder {
        side: OrderSide,
        amount: u64,
        price: u64,
    },
    CancelOrder {
        order_id: OrderId,
    },
    MatchOrders,
}

/// Decode instruction data produced by [`encode_instruction_data`].
pub fn decode_instruction_data(data: &[u8]) -> LedgerResult<DecodedCall> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(LedgerError::Decode(format!(
            "instruction data too short: {} bytes",
            data.len()
        )));
    }
    let (head, mut args) = data.split_at(DISCRIMINATOR_LEN);
    let method = DexMethod::ALL
        .into_iter()
        .find(|m| instruction_discriminator(*m) == head)
        .ok_or_else(|| LedgerError::Decode("unknown instruction discriminator".to_string()))?;

    let decode_err = |e: std::io::Error| LedgerError::Decode(format!("{method} args: {e}"));
    let call = match method {
        DexMethod::Initialize => DecodedCall::Initialize,
        DexMethod::MatchOrders => DecodedCall::MatchOrders,
        DexMethod::PlaceOrder => {
            let a = PlaceOrderArgs::deserialize(&mut args).map_err(decode_err)?;
            DecodedCall::PlaceOrder {
                side: a.side.into(),
                amount: a.amount,
                price: a.price,
            }
        }
        DexMethod::CancelOrder => {
            let a = CancelOrderArgs::deserialize(&mut args).map_err(decode_err)?;
            DecodedCall::CancelOrder {
                order_id: OrderId(a.order_id),
            }
        }
    };
    Ok(call)
}

/// Decode a `DexState` account.
///
/// # Errors
/// `LedgerError::Decode` on a wrong discriminator, truncated layout or
/// duplicate order ids.
pub fn decode_dex_state(data: &[u8]) -> LedgerResult<DexState> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(LedgerError::Decode(format!(
            "account data too short: {} bytes",
            data.len()
        )));
    }
    let (head, mut body) = data.split_at(DISCRIMINATOR_LEN);
    if head != account_discriminator(DEX_STATE_ACCOUNT) {
        return Err(LedgerError::Decode(
            "account is not a DexState (discriminator mismatch)".to_string(),
        ));
    }

    // `deserialize` (not `try_from_slice`) tolerates the allocation padding.
    let wire = DexStateWire::deserialize(&mut body)
        .map_err(|e| LedgerError::Decode(format!("DexState layout: {e}")))?;

    let orders = wire
        .orders
        .into_iter()
        .map(|o| Order {
            id: OrderId(o.id),
            side: o.side.into(),
            owner: LedgerAddress::new(o.owner),
            amount: o.amount,
            price: o.price,
            fulfilled: o.fulfilled,
        })
        .collect();

    DexState::from_ledger(LedgerAddress::new(wire.authority), wire.order_count, orders)
        .map_err(|e| LedgerError::Decode(e.to_string()))
}

/// Encode a `DexState` account, padded to `space` bytes when larger.
pub fn encode_dex_state(state: &DexState, space: usize) -> LedgerResult<Vec<u8>> {
    let wire = DexStateWire {
        authority: state.authority.to_bytes(),
        order_count: state.order_count,
        orders: state
            .orders
            .iter()
            .map(|o| OrderWire {
                id: o.id.value(),
                owner: o.owner.to_bytes(),
                side: o.side.into(),
                amount: o.amount,
                price: o.price,
                fulfilled: o.fulfilled,
            })
            .collect(),
    };
    let mut data = account_discriminator(DEX_STATE_ACCOUNT).to_vec();
    wire.serialize(&mut data).map_err(encode_err)?;
    if data.len() < space {
        data.resize(space, 0);
    }
    Ok(data)
}
