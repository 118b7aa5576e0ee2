// Settlement chain client.
//
// The daemon never signs anything itself: it asks the operator signer
// service, over JSON-RPC, to execute one batched token transfer. The only
// contract with that service is "succeeds, fails, or times out" - the
// distributor treats a timeout exactly like a failure.

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{config::ChainConfig, core::error::CoreError};
use pulse_common::{
    chain::{ChainId, TxHash, WalletAddress},
    ledger::LedgerError,
    rpc::JSON_RPC_VERSION,
};

/// A single transfer inside a batch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub recipient: WalletAddress,
    pub amount: u64,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Submit one on-chain transfer covering every recipient.
    /// Returns the settlement transaction hash once accepted.
    async fn submit_batch_transfer(
        &self,
        contract: &WalletAddress,
        chain_id: ChainId,
        transfers: &[Transfer],
    ) -> Result<TxHash, CoreError>;
}

#[derive(Deserialize)]
struct SubmitResult {
    #[serde(rename = "txHash")]
    tx_hash: TxHash,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct SubmitResponse {
    result: Option<SubmitResult>,
    error: Option<RpcErrorBody>,
}

/// JSON-RPC client against the operator signer service
pub struct HttpChainClient {
    client: reqwest::Client,
    url: String,
    operator_key: String,
}

impl HttpChainClient {
    /// Build a client from the chain section of the config.
    /// Returns None when the integration is not (fully) configured.
    pub fn from_config(config: &ChainConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }

        Some(Self {
            client: reqwest::Client::new(),
            // is_configured guarantees both fields
            url: config.chain_rpc_url.clone()?,
            operator_key: config.operator_key.clone()?,
        })
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn submit_batch_transfer(
        &self,
        contract: &WalletAddress,
        chain_id: ChainId,
        transfers: &[Transfer],
    ) -> Result<TxHash, CoreError> {
        debug!(
            "submitting batch transfer of {} recipients to {}",
            transfers.len(),
            contract
        );

        let body = json!({
            "jsonrpc": JSON_RPC_VERSION,
            "id": 1,
            "method": "pulse_submitBatchTransfer",
            "params": {
                "contract": contract,
                "chainId": chain_id,
                "transfers": transfers
            }
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.operator_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let response: SubmitResponse = response.json().await?;
        if let Some(error) = response.error {
            return Err(LedgerError::SubmissionFailed(error.message).into());
        }

        match response.result {
            Some(result) => Ok(result.tx_hash),
            None => Err(CoreError::InvalidChainResponse(
                "missing result in submit response".to_string(),
            )),
        }
    }
}

/// Explorer link for a settled transaction, when an explorer is configured
pub fn explorer_tx_url(config: &ChainConfig, tx_hash: &TxHash) -> Option<String> {
    config
        .explorer_url
        .as_ref()
        .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
}
