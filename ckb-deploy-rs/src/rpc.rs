use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ckb_jsonrpc_types::{
    BlockNumber, BlockView as JsonBlockView, CellWithStatus, OutputsValidator,
    Transaction as JsonTransaction,
};
use ckb_types::{
    bytes::Bytes,
    core::TransactionView,
    packed::{CellOutput, OutPoint},
    H256,
};
use log::debug;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("node returned error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A live cell together with its data.
#[derive(Debug, Clone)]
pub struct LiveCell {
    pub output: CellOutput,
    pub data: Bytes,
}

/// The chain queries the deploy workflow relies on.
pub trait ChainClient {
    fn tip_block_number(&self) -> Result<u64, RpcError>;

    /// Hashes of the transactions in the genesis block, in block order.
    fn genesis_tx_hashes(&self) -> Result<Vec<H256>, RpcError>;

    /// `None` when the cell is unknown or already spent.
    fn live_cell(&self, out_point: &OutPoint) -> Result<Option<LiveCell>, RpcError>;

    fn send_transaction(&self, tx: &TransactionView) -> Result<H256, RpcError>;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

fn decode_response<T: DeserializeOwned>(response: RpcResponse) -> Result<T, RpcError> {
    if let Some(err) = response.error {
        return Err(RpcError::Remote {
            code: err.code,
            message: err.message,
        });
    }
    Ok(serde_json::from_value(response.result.unwrap_or(Value::Null))?)
}

/// Blocking JSON-RPC client for a CKB node.
pub struct RpcClient {
    url: String,
    http: reqwest::blocking::Client,
    id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: &str) -> Result<Self, RpcError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            url: url.to_owned(),
            http,
            id: AtomicU64::new(0),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!("rpc call {} {}", method, request.params);
        let response: RpcResponse = self
            .http
            .post(&self.url)
            .json(&request)
            .send()?
            .error_for_status()?
            .json()?;
        decode_response(response)
    }

    pub fn get_tip_block_number(&self) -> Result<BlockNumber, RpcError> {
        self.call("get_tip_block_number", Value::Array(vec![]))
    }

    pub fn get_block_by_number(
        &self,
        number: BlockNumber,
    ) -> Result<Option<JsonBlockView>, RpcError> {
        self.call(
            "get_block_by_number",
            Value::Array(vec![serde_json::to_value(number)?]),
        )
    }

    pub fn get_live_cell(
        &self,
        out_point: ckb_jsonrpc_types::OutPoint,
        with_data: bool,
    ) -> Result<CellWithStatus, RpcError> {
        self.call(
            "get_live_cell",
            Value::Array(vec![serde_json::to_value(out_point)?, Value::Bool(with_data)]),
        )
    }

    pub fn send_raw_transaction(
        &self,
        tx: JsonTransaction,
        outputs_validator: Option<OutputsValidator>,
    ) -> Result<H256, RpcError> {
        self.call(
            "send_transaction",
            Value::Array(vec![
                serde_json::to_value(tx)?,
                serde_json::to_value(outputs_validator)?,
            ]),
        )
    }
}

impl ChainClient for RpcClient {
    fn tip_block_number(&self) -> Result<u64, RpcError> {
        self.get_tip_block_number().map(|number| number.value())
    }

    fn genesis_tx_hashes(&self) -> Result<Vec<H256>, RpcError> {
        let block = self.get_block_by_number(0u64.into())?;
        Ok(block
            .map(|block| block.transactions.into_iter().map(|tx| tx.hash).collect())
            .unwrap_or_default())
    }

    fn live_cell(&self, out_point: &OutPoint) -> Result<Option<LiveCell>, RpcError> {
        let cell = self.get_live_cell(out_point.clone().into(), true)?;
        if cell.status != "live" {
            return Ok(None);
        }
        Ok(cell.cell.map(|info| LiveCell {
            output: info.output.into(),
            data: info
                .data
                .map(|data| data.content.into_bytes())
                .unwrap_or_default(),
        }))
    }

    fn send_transaction(&self, tx: &TransactionView) -> Result<H256, RpcError> {
        // Custom locks are not "well known", so the node must not filter outputs.
        self.send_raw_transaction(tx.data().into(), Some(OutputsValidator::Passthrough))
    }
}
