//! Line-delimited JSON transport for the pet registry.
//!
//! # Responsibility
//! - Decode requests, run them on the registry service, encode replies.
//! - Provide a matching async client.
//!
//! # Invariants
//! - A malformed request (bad JSON, invalid UTF-8, oversized line) gets an
//!   error response; the connection stays open.
//! - Store calls run on blocking workers, never on the async reactor.

pub mod client;
pub mod config;
mod error;
mod frame;
pub mod protocol;
pub mod server;

pub use client::{RegisterCall, RegistryClient};
pub use config::{resolve_db_path, ServerConfig, StoreConfig};
pub use error::{RpcClientError, RpcServerError};
pub use protocol::{
    Method, PingResult, RegisterNewPetParams, RegisterNewPetResult, Request, Response, RpcError,
    SearchDetail, SearchPetParams, SearchPetResult, WirePet,
};
pub use server::Server;
