use ckb_types::{packed::OutPoint, H256};
use thiserror::Error;

use crate::rpc::RpcError;

pub type Result<T> = core::result::Result<T, Error>;

/// Every variant is terminal: the workflow stops at the first one it meets.
#[derive(Debug, Error)]
pub enum Error {
    #[error("load config error: {0}")]
    Config(String),

    #[error("decode hex error: {field}: {reason}")]
    Decode { field: String, reason: String },

    #[error("create rpc client error: {0}")]
    Connection(#[source] RpcError),

    #[error("import private key error: {0}")]
    CredentialImport(String),

    #[error("load system script error: {0}")]
    SystemScripts(String),

    #[error("resolve input error: {0}")]
    InputResolution(InputError),

    #[error("group inputs error: {0}")]
    Grouping(GroupError),

    #[error("pixel rule violated: {0}")]
    Pixel(PixelError),

    #[error("sign transaction error: {0}")]
    Signing(String),

    #[error("send transaction error: {0}")]
    Submission(#[source] RpcError),

    #[error("capacity imbalance: inputs {inputs} < outputs {outputs} + fee {fee}")]
    Imbalance { inputs: u64, outputs: u64, fee: u64 },

    #[error("output #{index} capacity {capacity} is below occupied capacity {occupied}")]
    InsufficientCapacity {
        index: usize,
        capacity: u64,
        occupied: u64,
    },

    #[error("capacity overflow")]
    CapacityOverflow,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("no input references")]
    NoInputs,

    #[error("input group #{0} is empty")]
    EmptyGroup(usize),

    #[error("cell {} is referenced twice", display_out_point(.0))]
    Duplicate(OutPoint),

    #[error("cell {} not found or already spent", display_out_point(.0))]
    NotLive(OutPoint),

    #[error("cell {}: {}", display_out_point(.0), .1)]
    Rpc(OutPoint, #[source] RpcError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupError {
    #[error("signed input group #{0} spends cells under more than one lock")]
    MixedLocks(usize),

    #[error("lock {0:#x} is spent by both signed and unsigned input groups")]
    MixedSigning(H256),

    #[error("lock {0:#x} is not owned by the signing key")]
    NotOwned(H256),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PixelError {
    #[error("canvas script {0:#x} args must be 32 bytes, got {1}")]
    CanvasArgs(H256, usize),

    #[error("canvas cell data must be 5 bytes, output #{index} has {len}")]
    CanvasData { index: usize, len: usize },

    #[error("canvas input data must be 5 bytes, input #{index} has {len}")]
    CanvasInputData { index: usize, len: usize },

    #[error("output #{0} paints a coordinate no canvas input holds")]
    Coordinate(usize),

    #[error("pixel lock {0:#x} args must be 20 bytes")]
    LockArgs(H256),

    #[error("pixel lock {0:#x} pays out of {1} inputs, expect exactly one")]
    PaymentInputs(H256, usize),

    #[error("pixel lock {0:#x} has {1} refund outputs, expect exactly one")]
    RefundOutputs(H256, usize),

    #[error("refund to {lock:#x} is {actual}, below {required}")]
    Refund {
        lock: H256,
        required: u64,
        actual: u64,
    },

    #[error("official fee {actual} is below {required}")]
    OfficialFee { required: u64, actual: u64 },
}

pub(crate) fn display_out_point(out_point: &OutPoint) -> String {
    use ckb_types::prelude::Unpack;
    let index: u32 = out_point.index().unpack();
    format!("0x{}:{}", hex::encode(out_point.tx_hash().raw_data()), index)
}

impl Error {
    pub(crate) fn decode(field: impl Into<String>, reason: impl ToString) -> Self {
        Error::Decode {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<InputError> for Error {
    fn from(err: InputError) -> Self {
        Error::InputResolution(err)
    }
}

impl From<GroupError> for Error {
    fn from(err: GroupError) -> Self {
        Error::Grouping(err)
    }
}

impl From<PixelError> for Error {
    fn from(err: PixelError) -> Self {
        Error::Pixel(err)
    }
}
