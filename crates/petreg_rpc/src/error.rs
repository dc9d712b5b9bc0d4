use crate::protocol::RpcError;
use thiserror::Error;
use tokio_util::codec::{AnyDelimiterCodecError, LinesCodecError};

#[derive(Debug, Error)]
pub enum RpcServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("framing error: {0}")]
    Codec(#[from] AnyDelimiterCodecError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RpcClientError {
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("framing error: {0}")]
    Codec(#[from] LinesCodecError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("rpc error {}: {}", .0.code, .0.message)]
    Rpc(RpcError),

    #[error("server closed the connection")]
    Closed,

    #[error("no result in response")]
    NoResult,

    #[error("response id {actual:?} does not match request id {expected}")]
    IdMismatch { expected: u64, actual: Option<u64> },
}
