//! Closed set of remote program methods.
//!
//! Each variant carries a typed accounts struct, so a missing or extra
//! account role is a compile error rather than a runtime lookup failure.

use crate::codec;
use crate::error::LedgerResult;
use dex_core::{LedgerAddress, OrderId, OrderSide};
use std::fmt;

/// Remote method identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DexMethod {
    Initialize,
    PlaceOrder,
    CancelOrder,
    MatchOrders,
}

impl DexMethod {
    pub const ALL: [DexMethod; 4] = [
        Self::Initialize,
        Self::PlaceOrder,
        Self::CancelOrder,
        Self::MatchOrders,
    ];

    /// Program-side name; also the discriminator preimage.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::PlaceOrder => "place_order",
            Self::CancelOrder => "cancel_order",
            Self::MatchOrders => "match_orders",
        }
    }

    /// Name as written in the interface definition document.
    pub fn idl_name(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::PlaceOrder => "placeOrder",
            Self::CancelOrder => "cancelOrder",
            Self::MatchOrders => "matchOrders",
        }
    }

    /// Account roles in the order the program expects them.
    pub fn account_roles(&self) -> &'static [&'static str] {
        match self {
            Self::Initialize => &[role::DEX_STATE, role::AUTHORITY, role::SYSTEM_PROGRAM],
            Self::PlaceOrder | Self::CancelOrder => &[
                role::DEX_STATE,
                role::USER,
                role::USER_TOKEN_ACCOUNT,
                role::DEX_TOKEN_ACCOUNT,
                role::TOKEN_PROGRAM,
            ],
            Self::MatchOrders => &[role::DEX_STATE, role::AUTHORITY],
        }
    }

    /// Argument names in wire order.
    pub fn arg_names(&self) -> &'static [&'static str] {
        match self {
            Self::Initialize | Self::MatchOrders => &[],
            Self::PlaceOrder => &["side", "amount", "price"],
            Self::CancelOrder => &["orderId"],
        }
    }
}

impl fmt::Display for DexMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Account role names as they appear in the interface definition.
pub mod role {
    pub const DEX_STATE: &str = "dexState";
    pub const AUTHORITY: &str = "authority";
    pub const SYSTEM_PROGRAM: &str = "systemProgram";
    pub const USER: &str = "user";
    pub const USER_TOKEN_ACCOUNT: &str = "userTokenAccount";
    pub const DEX_TOKEN_ACCOUNT: &str = "dexTokenAccount";
    pub const TOKEN_PROGRAM: &str = "tokenProgram";
}

/// Accounts for `initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeAccounts {
    pub dex_state: LedgerAddress,
    pub authority: LedgerAddress,
    pub system_program: LedgerAddress,
}

/// Accounts for `place_order` and `cancel_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAccounts {
    pub dex_state: LedgerAddress,
    pub user: LedgerAddress,
    pub user_token_account: LedgerAddress,
    pub dex_token_account: LedgerAddress,
    pub token_program: LedgerAddress,
}

/// Accounts for `match_orders`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchAccounts {
    pub dex_state: LedgerAddress,
    pub authority: LedgerAddress,
}

/// A fully specified call to the remote program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DexInstruction {
    Initialize(InitializeAccounts),
    PlaceOrder {
        accounts: OrderAccounts,
        side: OrderSide,
        amount: u64,
        price: u64,
    },
    CancelOrder {
        accounts: OrderAccounts,
        order_id: OrderId,
    },
    MatchOrders(MatchAccounts),
}

impl DexInstruction {
    pub fn method(&self) -> DexMethod {
        match self {
            Self::Initialize(_) => DexMethod::Initialize,
            Self::PlaceOrder { .. } => DexMethod::PlaceOrder,
            Self::CancelOrder { .. } => DexMethod::CancelOrder,
            Self::MatchOrders(_) => DexMethod::MatchOrders,
        }
    }

    /// The singleton state account this call targets.
    pub fn dex_state(&self) -> &LedgerAddress {
        match self {
            Self::Initialize(a) => &a.dex_state,
            Self::PlaceOrder { accounts, .. } | Self::CancelOrder { accounts, .. } => {
                &accounts.dex_state
            }
            Self::MatchOrders(a) => &a.dex_state,
        }
    }

    /// Account list in program order, with signer/writable flags.
    pub fn account_refs(&self) -> Vec<AccountRef> {
        match self {
            Self::Initialize(a) => vec![
                AccountRef::writable(role::DEX_STATE, a.dex_state),
                AccountRef::signer(role::AUTHORITY, a.authority),
                AccountRef::readonly(role::SYSTEM_PROGRAM, a.system_program),
            ],
            Self::PlaceOrder { accounts: a, .. } | Self::CancelOrder { accounts: a, .. } => vec![
                AccountRef::writable(role::DEX_STATE, a.dex_state),
                AccountRef::signer(role::USER, a.user),
                AccountRef::writable(role::USER_TOKEN_ACCOUNT, a.user_token_account),
                AccountRef::writable(role::DEX_TOKEN_ACCOUNT, a.dex_token_account),
                AccountRef::readonly(role::TOKEN_PROGRAM, a.token_program),
            ],
            Self::MatchOrders(a) => vec![
                AccountRef::writable(role::DEX_STATE, a.dex_state),
                AccountRef::signer(role::AUTHORITY, a.authority),
            ],
        }
    }

    /// Encode into the transport-level form.
    pub fn to_program_instruction(
        &self,
        program_id: LedgerAddress,
    ) -> LedgerResult<ProgramInstruction> {
        Ok(ProgramInstruction {
            program_id,
            method: self.method(),
            accounts: self.account_refs(),
            data: codec::encode_instruction_data(self)?,
        })
    }
}

/// One entry of an instruction's account list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRef {
    pub role: &'static str,
    pub address: LedgerAddress,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountRef {
    pub fn readonly(role: &'static str, address: LedgerAddress) -> Self {
        Self {
            role,
            address,
            is_signer: false,
            is_writable: false,
        }
    }

    pub fn writable(role: &'static str, address: LedgerAddress) -> Self {
        Self {
            is_writable: true,
            ..Self::readonly(role, address)
        }
    }

    pub fn signer(role: &'static str, address: LedgerAddress) -> Self {
        Self {
            is_signer: true,
            is_writable: true,
            ..Self::readonly(role, address)
        }
    }
}

/// Encoded instruction handed to a transport and signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInstruction {
    pub program_id: LedgerAddress,
    pub method: DexMethod,
    pub accounts: Vec<AccountRef>,
    pub data: Vec<u8>,
}

impl ProgramInstruction {
    pub fn account(&self, role: &str) -> Option<&LedgerAddress> {
        self.accounts
            .iter()
            .find(|a| a.role == role)
            .map(|a| &a.address)
    }

    pub fn signers(&self) -> impl Iterator<Item = &LedgerAddress> + '_ {
        self.accounts.iter().filter(|a| a.is_signer).map(|a| &a.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_accounts() -> OrderAccounts {
        OrderAccounts {
            dex_state: LedgerAddress::new([1; 32]),
            user: LedgerAddress::new([2; 32]),
            user_token_account: LedgerAddress::new([3; 32]),
            dex_token_account: LedgerAddress::new([4; 32]),
            token_program: LedgerAddress::new([5; 32]),
        }
    }

    #[test]
    fn test_account_refs_follow_method_roles() {
        let instructions = [
            DexInstruction::Initialize(InitializeAccounts {
                dex_state: LedgerAddress::new([1; 32]),
                authority: LedgerAddress::new([2; 32]),
                system_program: LedgerAddress::SYSTEM_PROGRAM,
            }),
            DexInstruction::PlaceOrder {
                accounts: order_accounts(),
                side: OrderSide::Buy,
                amount: 100,
                price: 10,
            },
            DexInstruction::CancelOrder {
                accounts: order_accounts(),
                order_id: OrderId(0),
            },
            DexInstruction::MatchOrders(MatchAccounts {
                dex_state: LedgerAddress::new([1; 32]),
                authority: LedgerAddress::new([2; 32]),
            }),
        ];

        for ix in &instructions {
            let roles: Vec<&str> = ix.account_refs().iter().map(|a| a.role).collect();
            assert_eq!(roles, ix.method().account_roles(), "{}", ix.method());
            assert_eq!(ix.account_refs()[0].address, *ix.dex_state());
            assert_eq!(ix.account_refs().iter().filter(|a| a.is_signer).count(), 1);
        }
    }

    #[test]
    fn test_program_instruction_lookup() {
        let ix = DexInstruction::CancelOrder {
            accounts: order_accounts(),
            order_id: OrderId(9),
        }
        .to_program_instruction(LedgerAddress::new([9; 32]))
        .unwrap();

        assert_eq!(ix.method, DexMethod::CancelOrder);
        assert_eq!(ix.account(role::USER), Some(&LedgerAddress::new([2; 32])));
        assert_eq!(ix.account(role::AUTHORITY), None);
        assert_eq!(ix.signers().count(), 1);
    }
}
