//! In-memory ledger and signer for testing.
//!
//! [`MockLedger`] emulates the remote program closely enough to drive the
//! client end to end: instructions are decoded from their wire form and
//! executed against an in-memory `DexState`, the account is served back in
//! its on-ledger encoding, and refusals carry the program's error codes.
//!
//! Mutations take effect when submitted. Finality can be held back
//! (`hold_finality`) so a test can observe a transaction that has landed but
//! whose confirmation has not yet been delivered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use dex_core::{DexState, LedgerAddress, Order, OrderId, OrderSide};
use parking_lot::Mutex;
use solana_program::hash::Hash;
use tokio::sync::{Notify, Semaphore};
use tracing::debug;

use crate::codec::{
    self, DecodedCall, ACCOUNT_DID_NOT_SERIALIZE_CODE, ACCOUNT_IN_USE_CODE,
    ACCOUNT_NOT_INITIALIZED_CODE, ORDER_NOT_FOUND_CODE,
};
use crate::error::{LedgerError, LedgerResult, Rejection};
use crate::instruction::{role, ProgramInstruction};
use crate::signer::{SignedTransaction, SignerError, TransactionSigner};
use crate::transport::{BoxFuture, Confirmation, LedgerTransport};

/// Allocation of the state account (`8 + 32 + 8 + 1000`).
pub const DEX_STATE_SPACE: usize = 1048;

/// In-memory emulation of the order-book program.
#[derive(Debug)]
pub struct MockLedger {
    accounts: Mutex<HashMap<LedgerAddress, DexState>>,
    submitted: Mutex<Vec<ProgramInstruction>>,
    next_submit_error: Mutex<Option<LedgerError>>,
    next_fetch_error: Mutex<Option<LedgerError>>,
    timeout_next: AtomicBool,
    holding: AtomicBool,
    finality_gate: Semaphore,
    submit_count: AtomicUsize,
    fetch_count: AtomicUsize,
    slot: AtomicU64,
    submit_notify: Notify,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            next_submit_error: Mutex::new(None),
            next_fetch_error: Mutex::new(None),
            timeout_next: AtomicBool::new(false),
            holding: AtomicBool::new(false),
            finality_gate: Semaphore::new(0),
            submit_count: AtomicUsize::new(0),
            fetch_count: AtomicUsize::new(0),
            slot: AtomicU64::new(100),
            submit_notify: Notify::new(),
        }
    }

    /// Fail the next submission with `error` before it reaches the program.
    pub fn fail_next_submit(&self, error: LedgerError) {
        *self.next_submit_error.lock() = Some(error);
    }

    /// Fail the next account read with `error`.
    pub fn fail_next_fetch(&self, error: LedgerError) {
        *self.next_fetch_error.lock() = Some(error);
    }

    /// Apply the next submission but report `ConfirmationTimeout`.
    pub fn timeout_next_submit(&self) {
        self.timeout_next.store(true, Ordering::SeqCst);
    }

    /// Hold confirmations until released.
    pub fn hold_finality(&self) {
        self.holding.store(true, Ordering::SeqCst);
    }

    /// Deliver `n` held confirmations.
    pub fn release_finality(&self, n: usize) {
        self.finality_gate.add_permits(n);
    }

    /// Number of submissions received.
    pub fn submit_count(&self) -> usize {
        self.submit_count.load(Ordering::SeqCst)
    }

    /// Number of account reads served.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Recorded submissions, oldest first.
    pub fn submitted(&self) -> Vec<ProgramInstruction> {
        self.submitted.lock().clone()
    }

    /// Wait until at least `count` submissions have been applied.
    pub async fn wait_for_submits(&self, count: usize) {
        loop {
            let notified = self.submit_notify.notified();
            if self.submit_count() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Current ledger-side state of `address`.
    pub fn state(&self, address: &LedgerAddress) -> Option<DexState> {
        self.accounts.lock().get(address).cloned()
    }

    /// Remove an order behind the client's back, as a concurrent match would.
    pub fn remove_order(&self, address: &LedgerAddress, id: OrderId) -> bool {
        let mut accounts = self.accounts.lock();
        match accounts.get_mut(address) {
            Some(state) => {
                let before = state.orders.len();
                state.orders.retain(|o| o.id != id);
                state.orders.len() != before
            }
            None => false,
        }
    }

    async fn process(
        &self,
        instruction: &ProgramInstruction,
        signer: &dyn TransactionSigner,
    ) -> LedgerResult<Confirmation> {
        self.submitted.lock().push(instruction.clone());

        let signed = signer
            .sign(instruction, Hash::default())
            .await
            .map_err(|e| LedgerError::Signing(e.to_string()));

        let outcome = match signed {
            Ok(signed) => match self.next_submit_error.lock().take() {
                Some(error) => Err(error),
                None => self.execute(instruction).map(|()| signed),
            },
            Err(e) => Err(e),
        };

        self.submit_count.fetch_add(1, Ordering::SeqCst);
        self.submit_notify.notify_waiters();
        let signed = outcome?;

        if self.holding.load(Ordering::SeqCst) {
            if let Ok(permit) = self.finality_gate.acquire().await {
                permit.forget();
            }
        }

        if self.timeout_next.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::ConfirmationTimeout {
                signature: signed.signature,
                waited_ms: 0,
            });
        }

        Ok(Confirmation {
            signature: signed.signature,
            slot: Some(self.slot.fetch_add(1, Ordering::SeqCst)),
        })
    }

    /// Run the program logic for one instruction.
    fn execute(&self, instruction: &ProgramInstruction) -> LedgerResult<()> {
        let call = codec::decode_instruction_data(&instruction.data)?;
        let state_address = *instruction
            .account(role::DEX_STATE)
            .ok_or_else(|| reject(None, "missing dexState account"))?;
        let mut accounts = self.accounts.lock();
        debug!(?call, "MockLedger executing instruction");

        match call {
            DecodedCall::Initialize => {
                if accounts.contains_key(&state_address) {
                    return Err(reject(
                        Some(ACCOUNT_IN_USE_CODE),
                        format!("Allocate: account {state_address} already in use"),
                    ));
                }
                let authority = *instruction
                    .account(role::AUTHORITY)
                    .ok_or_else(|| reject(None, "missing authority account"))?;
                accounts.insert(
                    state_address,
                    DexState {
                        authority,
                        order_count: 0,
                        orders: Vec::new(),
                        initialized: true,
                    },
                );
            }
            DecodedCall::PlaceOrder {
                side,
                amount,
                price,
            } => {
                let user = *instruction
                    .account(role::USER)
                    .ok_or_else(|| reject(None, "missing user account"))?;
                let state = accounts
                    .get_mut(&state_address)
                    .ok_or_else(not_initialized)?;
                let mut next = state.clone();
                next.orders.push(Order {
                    id: OrderId(next.order_count),
                    side,
                    owner: user,
                    amount,
                    price,
                    fulfilled: 0,
                });
                next.order_count += 1;
                if codec::encode_dex_state(&next, 0)?.len() > DEX_STATE_SPACE {
                    return Err(reject(
                        Some(ACCOUNT_DID_NOT_SERIALIZE_CODE),
                        "AccountDidNotSerialize: dex_state is full",
                    ));
                }
                *state = next;
            }
            DecodedCall::CancelOrder { order_id } => {
                let user = *instruction
                    .account(role::USER)
                    .ok_or_else(|| reject(None, "missing user account"))?;
                let state = accounts
                    .get_mut(&state_address)
                    .ok_or_else(not_initialized)?;
                let index = state
                    .orders
                    .iter()
                    .position(|o| o.id == order_id && o.owner == user)
                    .ok_or_else(|| {
                        reject(
                            Some(ORDER_NOT_FOUND_CODE),
                            "AnchorError occurred. Error Code: OrderNotFound.",
                        )
                    })?;
                state.orders.remove(index);
            }
            DecodedCall::MatchOrders => {
                let state = accounts
                    .get_mut(&state_address)
                    .ok_or_else(not_initialized)?;
                cross_book(&mut state.orders);
            }
        }
        Ok(())
    }

    fn read(&self, address: &LedgerAddress) -> LedgerResult<Vec<u8>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.next_fetch_error.lock().take() {
            return Err(error);
        }
        let accounts = self.accounts.lock();
        let state = accounts
            .get(address)
            .ok_or(LedgerError::AccountNotFound(*address))?;
        codec::encode_dex_state(state, DEX_STATE_SPACE)
    }
}

fn reject(code: Option<u32>, log: impl Into<String>) -> LedgerError {
    let log = format!("Program log: {}", log.into());
    let mut rejection = Rejection::new(match code {
        Some(code) => format!("custom program error: {code:#x}"),
        None => "invalid instruction".to_string(),
    })
    .with_logs(vec![log]);
    rejection.custom_code = code;
    LedgerError::SimulationRejected(rejection)
}

fn not_initialized() -> LedgerError {
    reject(
        Some(ACCOUNT_NOT_INITIALIZED_CODE),
        "AnchorError caused by account: dex_state. Error Code: AccountNotInitialized.",
    )
}

/// Cross resting orders: best bid against best ask while prices overlap,
/// then drop fully filled orders.
fn cross_book(orders: &mut Vec<Order>) {
    let mut bids: Vec<usize> = side_indices(orders, OrderSide::Buy);
    let mut asks: Vec<usize> = side_indices(orders, OrderSide::Sell);
    bids.sort_by(|a, b| orders[*b].price.cmp(&orders[*a].price));
    asks.sort_by(|a, b| orders[*a].price.cmp(&orders[*b].price));

    for &bid in &bids {
        for &ask in &asks {
            if orders[bid].price < orders[ask].price {
                break;
            }
            let quantity = orders[bid].remaining().min(orders[ask].remaining());
            orders[bid].fulfilled += quantity;
            orders[ask].fulfilled += quantity;
        }
    }

    orders.retain(|o| o.fulfilled < o.amount);
}

fn side_indices(orders: &[Order], side: OrderSide) -> Vec<usize> {
    orders
        .iter()
        .enumerate()
        .filter(|(_, o)| o.side == side)
        .map(|(i, _)| i)
        .collect()
}

impl LedgerTransport for MockLedger {
    fn submit<'a>(
        &'a self,
        instruction: &'a ProgramInstruction,
        signer: &'a dyn TransactionSigner,
    ) -> BoxFuture<'a, LedgerResult<Confirmation>> {
        Box::pin(self.process(instruction, signer))
    }

    fn get_account<'a>(
        &'a self,
        address: &'a LedgerAddress,
    ) -> BoxFuture<'a, LedgerResult<Vec<u8>>> {
        Box::pin(async move { self.read(address) })
    }
}

/// Signer with a fixed identity and no key material.
#[derive(Debug)]
pub struct MockSigner {
    identity: LedgerAddress,
    reject: AtomicBool,
    signed: AtomicUsize,
}

impl MockSigner {
    pub fn new(identity: LedgerAddress) -> Self {
        Self {
            identity,
            reject: AtomicBool::new(false),
            signed: AtomicUsize::new(0),
        }
    }

    /// Make subsequent signing requests fail as a declined wallet prompt.
    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn signed_count(&self) -> usize {
        self.signed.load(Ordering::SeqCst)
    }
}

impl TransactionSigner for MockSigner {
    fn identity(&self) -> LedgerAddress {
        self.identity
    }

    fn sign<'a>(
        &'a self,
        instruction: &'a ProgramInstruction,
        _recent_blockhash: Hash,
    ) -> BoxFuture<'a, Result<SignedTransaction, SignerError>> {
        Box::pin(async move {
            if self.reject.load(Ordering::SeqCst) {
                return Err(SignerError::Rejected("user declined".to_string()));
            }
            let n = self.signed.fetch_add(1, Ordering::SeqCst);
            Ok(SignedTransaction {
                signature: format!("mock-{}-{n}", instruction.method),
                wire: instruction.data.clone(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{DexInstruction, InitializeAccounts, MatchAccounts, OrderAccounts};

    fn state_address() -> LedgerAddress {
        LedgerAddress::new([1; 32])
    }

    fn user() -> LedgerAddress {
        LedgerAddress::new([2; 32])
    }

    fn program() -> LedgerAddress {
        LedgerAddress::new([9; 32])
    }

    fn order_accounts(user: LedgerAddress) -> OrderAccounts {
        OrderAccounts {
            dex_state: state_address(),
            user,
            user_token_account: LedgerAddress::new([3; 32]),
            dex_token_account: LedgerAddress::new([4; 32]),
            token_program: LedgerAddress::new([5; 32]),
        }
    }

    async fn run(
        ledger: &MockLedger,
        signer: &MockSigner,
        ix: DexInstruction,
    ) -> LedgerResult<Confirmation> {
        let ix = ix.to_program_instruction(program()).unwrap();
        ledger.submit(&ix, signer).await
    }

    fn initialize() -> DexInstruction {
        DexInstruction::Initialize(InitializeAccounts {
            dex_state: state_address(),
            authority: user(),
            system_program: LedgerAddress::SYSTEM_PROGRAM,
        })
    }

    fn place(side: OrderSide, amount: u64, price: u64) -> DexInstruction {
        DexInstruction::PlaceOrder {
            accounts: order_accounts(user()),
            side,
            amount,
            price,
        }
    }

    fn match_orders() -> DexInstruction {
        DexInstruction::MatchOrders(MatchAccounts {
            dex_state: state_address(),
            authority: user(),
        })
    }

    #[tokio::test]
    async fn test_initialize_twice_is_account_in_use() {
        let ledger = MockLedger::new();
        let signer = MockSigner::new(user());

        run(&ledger, &signer, initialize()).await.unwrap();
        let err = run(&ledger, &signer, initialize()).await.unwrap_err();
        match err {
            LedgerError::SimulationRejected(r) => {
                assert_eq!(r.custom_code, Some(ACCOUNT_IN_USE_CODE));
                assert!(r.logs_contain("already in use"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_place_assigns_monotonic_ids() {
        let ledger = MockLedger::new();
        let signer = MockSigner::new(user());
        run(&ledger, &signer, initialize()).await.unwrap();
        run(&ledger, &signer, place(OrderSide::Buy, 100, 10)).await.unwrap();
        run(&ledger, &signer, place(OrderSide::Sell, 50, 12)).await.unwrap();

        let state = ledger.state(&state_address()).unwrap();
        let ids: Vec<u64> = state.orders.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(state.order_count, 2);
        assert_eq!(ledger.submit_count(), 3);
    }

    #[tokio::test]
    async fn test_place_before_initialize_is_rejected() {
        let ledger = MockLedger::new();
        let signer = MockSigner::new(user());
        let err = run(&ledger, &signer, place(OrderSide::Buy, 1, 1))
            .await
            .unwrap_err();
        match err {
            LedgerError::SimulationRejected(r) => {
                assert_eq!(r.custom_code, Some(ACCOUNT_NOT_INITIALIZED_CODE))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_requires_owner() {
        let ledger = MockLedger::new();
        let signer = MockSigner::new(user());
        run(&ledger, &signer, initialize()).await.unwrap();
        run(&ledger, &signer, place(OrderSide::Buy, 100, 10)).await.unwrap();

        let stranger = LedgerAddress::new([8; 32]);
        let cancel = DexInstruction::CancelOrder {
            accounts: order_accounts(stranger),
            order_id: OrderId(0),
        };
        let err = run(&ledger, &MockSigner::new(stranger), cancel)
            .await
            .unwrap_err();
        match err {
            LedgerError::SimulationRejected(r) => {
                assert_eq!(r.custom_code, Some(ORDER_NOT_FOUND_CODE))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_state_account_fills_up() {
        let ledger = MockLedger::new();
        let signer = MockSigner::new(user());
        run(&ledger, &signer, initialize()).await.unwrap();

        let mut placed = 0;
        loop {
            match run(&ledger, &signer, place(OrderSide::Buy, 1, 1)).await {
                Ok(_) => placed += 1,
                Err(LedgerError::SimulationRejected(r)) => {
                    assert_eq!(r.custom_code, Some(ACCOUNT_DID_NOT_SERIALIZE_CODE));
                    break;
                }
                Err(other) => panic!("unexpected: {other:?}"),
            }
        }
        // (1048 - 8 - 32 - 8 - 4) / 65 bytes per order
        assert_eq!(placed, 15);
    }

    #[tokio::test]
    async fn test_match_on_unmatchable_book_is_noop() {
        let ledger = MockLedger::new();
        let signer = MockSigner::new(user());
        run(&ledger, &signer, initialize()).await.unwrap();
        run(&ledger, &signer, place(OrderSide::Buy, 100, 9)).await.unwrap();
        run(&ledger, &signer, place(OrderSide::Sell, 100, 11)).await.unwrap();

        let before = ledger.state(&state_address()).unwrap();
        run(&ledger, &signer, match_orders()).await.unwrap();
        run(&ledger, &signer, match_orders()).await.unwrap();
        assert_eq!(ledger.state(&state_address()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_served_account_decodes() {
        let ledger = MockLedger::new();
        let signer = MockSigner::new(user());
        assert!(matches!(
            ledger.get_account(&state_address()).await,
            Err(LedgerError::AccountNotFound(_))
        ));

        run(&ledger, &signer, initialize()).await.unwrap();
        let data = ledger.get_account(&state_address()).await.unwrap();
        assert_eq!(data.len(), DEX_STATE_SPACE);
        let state = codec::decode_dex_state(&data).unwrap();
        assert_eq!(state.authority, user());
        assert_eq!(ledger.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_declined_signature_applies_nothing() {
        let ledger = MockLedger::new();
        let signer = MockSigner::new(user());
        signer.set_reject(true);
        let err = run(&ledger, &signer, initialize()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Signing(_)));
        assert!(ledger.state(&state_address()).is_none());
    }

    #[test]
    fn test_cross_book_fills_overlapping_orders() {
        let owner = user();
        let order = |id, side, amount, price| Order {
            id: OrderId(id),
            side,
            owner,
            amount,
            price,
            fulfilled: 0,
        };
        let mut orders = vec![
            order(0, OrderSide::Buy, 100, 10),
            order(1, OrderSide::Sell, 40, 9),
            order(2, OrderSide::Sell, 100, 12),
        ];
        cross_book(&mut orders);

        let ids: Vec<u64> = orders.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(orders[0].fulfilled, 40);
        assert_eq!(orders[1].fulfilled, 0);
    }
}
