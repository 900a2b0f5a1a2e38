//! JSON-RPC transport over HTTP.
//!
//! Submission path: `getLatestBlockhash` → signer → `sendTransaction`
//! (preflight simulation on) → poll `getSignatureStatuses` until the
//! transaction is `finalized` or the confirmation wait expires.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use dex_core::LedgerAddress;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use solana_program::hash::Hash;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult, Rejection};
use crate::instruction::ProgramInstruction;
use crate::signer::TransactionSigner;
use crate::transport::{BoxFuture, Confirmation, LedgerTransport};

/// JSON-RPC error code the node returns when preflight simulation fails.
const PREFLIGHT_FAILURE_CODE: i64 = -32002;

/// Commitment level treated as finality.
const FINALIZED: &str = "finalized";

/// RPC transport configuration.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL.
    pub url: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Upper bound on waiting for finality after submission.
    pub confirm_timeout: Duration,
    /// Delay between signature status polls.
    pub poll_interval: Duration,
}

impl RpcConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "https://api.devnet.solana.com".to_string(),
            request_timeout: Duration::from_secs(10),
            confirm_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    context: SlotContext,
    value: T,
}

#[derive(Debug, Deserialize)]
struct SlotContext {
    slot: u64,
}

#[derive(Debug, Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    slot: u64,
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    confirmation_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountValue {
    /// `[payload, encoding]`.
    data: (String, String),
}

/// Why a JSON-RPC call produced no result.
#[derive(Debug)]
enum CallFailure {
    /// The request or its response was lost on the way.
    Transport(String),
    /// The node answered with an error object.
    Rpc(RpcErrorBody),
}

impl CallFailure {
    fn into_ledger_error(self) -> LedgerError {
        match self {
            Self::Transport(reason) => LedgerError::NetworkError(reason),
            Self::Rpc(error) => classify_rpc_error(error),
        }
    }
}

/// Map a JSON-RPC error object into the ledger taxonomy.
fn classify_rpc_error(error: RpcErrorBody) -> LedgerError {
    if error.code == PREFLIGHT_FAILURE_CODE {
        let data = error.data.unwrap_or(Value::Null);
        let logs = data
            .get("logs")
            .and_then(|l| l.as_array())
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|l| l.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let rejection = match data.get("err") {
            Some(err) if !err.is_null() => Rejection::from_ledger_err(err, logs),
            _ => Rejection::new(error.message).with_logs(logs),
        };
        return LedgerError::SimulationRejected(rejection);
    }
    LedgerError::NetworkError(format!("rpc error {}: {}", error.code, error.message))
}

/// Interpret one signature status poll.
///
/// `Ok(Some(_))` when final, `Ok(None)` to keep polling.
fn interpret_status(
    signature: &str,
    status: Option<SignatureStatus>,
) -> LedgerResult<Option<Confirmation>> {
    let Some(status) = status else {
        return Ok(None);
    };
    if let Some(err) = status.err.filter(|e| !e.is_null()) {
        return Err(LedgerError::SimulationRejected(Rejection::from_ledger_err(
            &err,
            Vec::new(),
        )));
    }
    if status.confirmation_status.as_deref() == Some(FINALIZED) {
        return Ok(Some(Confirmation {
            signature: signature.to_string(),
            slot: Some(status.slot),
        }));
    }
    Ok(None)
}

fn decode_account_payload(value: AccountValue) -> LedgerResult<Vec<u8>> {
    let (payload, encoding) = value.data;
    if encoding != "base64" {
        return Err(LedgerError::Decode(format!(
            "unexpected account encoding: {encoding}"
        )));
    }
    BASE64_STANDARD
        .decode(payload)
        .map_err(|e| LedgerError::Decode(format!("invalid base64 account data: {e}")))
}

/// Ledger transport speaking JSON-RPC over HTTP.
pub struct RpcTransport {
    client: Client,
    config: RpcConfig,
    next_id: AtomicU64,
}

impl RpcTransport {
    /// Create a new transport.
    ///
    /// # Errors
    /// `NetworkError` if the HTTP client cannot be built.
    pub fn new(config: RpcConfig) -> LedgerResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                LedgerError::NetworkError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.url
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> LedgerResult<T> {
        self.call(method, params).await.map_err(CallFailure::into_ledger_error)
    }

    /// One JSON-RPC round trip, keeping transport failures apart from
    /// errors the node answered with.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, CallFailure> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .client
            .post(&self.config.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CallFailure::Transport(format!("{method}: HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallFailure::Transport(format!(
                "{method}: HTTP {status}: {body}"
            )));
        }

        let body: RpcResponse<T> = response.json().await.map_err(|e| {
            CallFailure::Transport(format!("{method}: failed to parse response: {e}"))
        })?;

        match (body.result, body.error) {
            (_, Some(error)) => Err(CallFailure::Rpc(error)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(CallFailure::Transport(format!(
                "{method}: response carried neither result nor error"
            ))),
        }
    }

    async fn latest_blockhash(&self) -> LedgerResult<Hash> {
        let response: WithContext<BlockhashValue> = self
            .request("getLatestBlockhash", json!([{ "commitment": FINALIZED }]))
            .await?;
        response
            .value
            .blockhash
            .parse()
            .map_err(|e| LedgerError::NetworkError(format!("invalid blockhash: {e:?}")))
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, CallFailure> {
        let encoded = BASE64_STANDARD.encode(wire);
        self.call(
            "sendTransaction",
            json!([encoded, { "encoding": "base64", "preflightCommitment": "processed" }]),
        )
        .await
    }

    async fn signature_status(&self, signature: &str) -> LedgerResult<Option<SignatureStatus>> {
        let response: WithContext<Vec<Option<SignatureStatus>>> = self
            .request(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;
        Ok(response.value.into_iter().next().flatten())
    }

    /// Poll until the signature is finalized or the confirmation wait expires.
    ///
    /// Poll failures are not fatal: the transaction is already in flight, so
    /// only the deadline ends the wait.
    async fn await_finality(&self, signature: String) -> LedgerResult<Confirmation> {
        let started = Instant::now();
        let deadline = started + self.config.confirm_timeout;

        loop {
            match self.signature_status(&signature).await {
                Ok(status) => {
                    if let Some(confirmation) = interpret_status(&signature, status)? {
                        return Ok(confirmation);
                    }
                }
                Err(e) => {
                    warn!(signature = %signature, error = %e, "Signature status poll failed");
                }
            }

            if Instant::now() >= deadline {
                return Err(LedgerError::ConfirmationTimeout {
                    signature,
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn submit_and_confirm(
        &self,
        instruction: &ProgramInstruction,
        signer: &dyn TransactionSigner,
    ) -> LedgerResult<Confirmation> {
        let blockhash = self.latest_blockhash().await?;
        let signed = signer
            .sign(instruction, blockhash)
            .await
            .map_err(|e| LedgerError::Signing(e.to_string()))?;

        // Once the bytes may have reached the node only finality polling can
        // tell whether the transaction landed.
        let signature = match self.send_transaction(&signed.wire).await {
            Ok(signature) => {
                if signature != signed.signature {
                    warn!(
                        expected = %signed.signature,
                        returned = %signature,
                        "Node returned a different signature than the signer produced"
                    );
                }
                signature
            }
            Err(CallFailure::Rpc(error)) => return Err(classify_rpc_error(error)),
            Err(CallFailure::Transport(reason)) => {
                warn!(
                    method = %instruction.method,
                    signature = %signed.signature,
                    reason = %reason,
                    "Send outcome unknown, polling for the signed transaction"
                );
                signed.signature
            }
        };
        info!(
            method = %instruction.method,
            signature = %signature,
            "Transaction submitted, awaiting finality"
        );

        let confirmation = self.await_finality(signature).await?;
        info!(
            method = %instruction.method,
            signature = %confirmation.signature,
            slot = ?confirmation.slot,
            "Transaction finalized"
        );
        Ok(confirmation)
    }

    async fn fetch_account(&self, address: &LedgerAddress) -> LedgerResult<Vec<u8>> {
        let response: WithContext<Option<AccountValue>> = self
            .request(
                "getAccountInfo",
                json!([address.to_string(), { "encoding": "base64", "commitment": FINALIZED }]),
            )
            .await?;

        debug!(address = %address, slot = response.context.slot, "Account fetched");
        match response.value {
            Some(value) => decode_account_payload(value),
            None => Err(LedgerError::AccountNotFound(*address)),
        }
    }
}

impl LedgerTransport for RpcTransport {
    fn submit<'a>(
        &'a self,
        instruction: &'a ProgramInstruction,
        signer: &'a dyn TransactionSigner,
    ) -> BoxFuture<'a, LedgerResult<Confirmation>> {
        Box::pin(self.submit_and_confirm(instruction, signer))
    }

    fn get_account<'a>(
        &'a self,
        address: &'a LedgerAddress,
    ) -> BoxFuture<'a, LedgerResult<Vec<u8>>> {
        Box::pin(self.fetch_account(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "getAccountInfo",
            params: json!(["11111111111111111111111111111111"]),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","id":7,"method":"getAccountInfo","params":["11111111111111111111111111111111"]}"#
        );
    }

    #[test]
    fn test_preflight_failure_is_simulation_rejected() {
        let body: RpcResponse<String> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {
                "code": -32002,
                "message": "Transaction simulation failed: Error processing Instruction 0: custom program error: 0x1770",
                "data": {
                    "err": {"InstructionError": [0, {"Custom": 6000}]},
                    "logs": ["Program log: AnchorError occurred. Error Code: OrderNotFound."]
                }
            }
        }))
        .unwrap();

        match classify_rpc_error(body.error.unwrap()) {
            LedgerError::SimulationRejected(r) => {
                assert_eq!(r.custom_code, Some(6000));
                assert!(r.logs_contain("OrderNotFound"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_other_rpc_errors_are_network_errors() {
        let err = classify_rpc_error(RpcErrorBody {
            code: -32005,
            message: "Node is behind".to_string(),
            data: None,
        });
        assert!(matches!(err, LedgerError::NetworkError(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_interpret_status() {
        assert_eq!(interpret_status("sig", None).unwrap(), None);

        let confirmed: SignatureStatus = serde_json::from_value(json!({
            "slot": 10, "confirmations": 3, "err": null, "confirmationStatus": "confirmed"
        }))
        .unwrap();
        assert_eq!(interpret_status("sig", Some(confirmed)).unwrap(), None);

        let finalized: SignatureStatus = serde_json::from_value(json!({
            "slot": 12, "confirmations": null, "err": null, "confirmationStatus": "finalized"
        }))
        .unwrap();
        assert_eq!(
            interpret_status("sig", Some(finalized)).unwrap(),
            Some(Confirmation {
                signature: "sig".to_string(),
                slot: Some(12)
            })
        );

        let failed: SignatureStatus = serde_json::from_value(json!({
            "slot": 12, "err": {"InstructionError": [0, {"Custom": 0}]}, "confirmationStatus": "finalized"
        }))
        .unwrap();
        assert!(matches!(
            interpret_status("sig", Some(failed)),
            Err(LedgerError::SimulationRejected(_))
        ));
    }

    #[test]
    fn test_account_info_parsing() {
        let missing: RpcResponse<WithContext<Option<AccountValue>>> = serde_json::from_value(
            json!({"jsonrpc": "2.0", "id": 1, "result": {"context": {"slot": 5}, "value": null}}),
        )
        .unwrap();
        assert!(missing.result.unwrap().value.is_none());

        let present: RpcResponse<WithContext<Option<AccountValue>>> =
            serde_json::from_value(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "context": {"slot": 5},
                    "value": {
                        "data": ["AQID", "base64"],
                        "executable": false,
                        "lamports": 1,
                        "owner": "11111111111111111111111111111111",
                        "rentEpoch": 0
                    }
                }
            }))
            .unwrap();
        let value = present.result.unwrap().value.unwrap();
        assert_eq!(decode_account_payload(value).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_transport_new_keeps_endpoint() {
        let transport = RpcTransport::new(RpcConfig::new("http://localhost:8899")).unwrap();
        assert_eq!(transport.endpoint(), "http://localhost:8899");
    }
}
