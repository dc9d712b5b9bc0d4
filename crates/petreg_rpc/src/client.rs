//! Async client for the registry protocol.
//!
//! One request in flight per client; request ids increase from 1.

use crate::error::RpcClientError;
use crate::protocol::{
    Method, PingResult, RegisterNewPetParams, RegisterNewPetResult, Request, Response, RpcError,
    SearchDetail, SearchPetParams, SearchPetResult, WirePet, MAX_FRAME_BYTES,
};
use futures::{SinkExt, StreamExt};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{Framed, LinesCodec};

/// Registration result plus the storage error the server attached, if any.
///
/// `result.code` decides success; `storage_error` is diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterCall {
    pub result: RegisterNewPetResult,
    pub storage_error: Option<RpcError>,
}

pub struct RegistryClient {
    framed: Framed<TcpStream, LinesCodec>,
    next_id: u64,
}

impl RegistryClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, RpcClientError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            framed: Framed::new(stream, LinesCodec::new_with_max_length(MAX_FRAME_BYTES)),
            next_id: 1,
        })
    }

    pub async fn ping(&mut self) -> Result<PingResult, RpcClientError> {
        let response = self.call(Method::Ping, serde_json::json!({})).await?;
        expect_result(response)
    }

    pub async fn register_new_pet(
        &mut self,
        params: RegisterNewPetParams,
    ) -> Result<RegisterCall, RpcClientError> {
        let response: Response<RegisterNewPetResult> =
            self.call(Method::RegisterNewPet, params).await?;
        match response.result {
            Some(result) => Ok(RegisterCall {
                result,
                storage_error: response.error,
            }),
            None => Err(response
                .error
                .map_or(RpcClientError::NoResult, RpcClientError::Rpc)),
        }
    }

    /// Searches by one field; `None` asks with no criterion.
    pub async fn search_pet(
        &mut self,
        detail: Option<SearchDetail>,
    ) -> Result<Vec<WirePet>, RpcClientError> {
        let response: Response<SearchPetResult> = self
            .call(Method::SearchPet, SearchPetParams { detail })
            .await?;
        expect_result(response).map(|result| result.pets)
    }

    async fn call<P: Serialize, T: DeserializeOwned>(
        &mut self,
        method: Method,
        params: P,
    ) -> Result<Response<T>, RpcClientError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = Request {
            id: Some(id),
            method,
            params,
        };
        self.framed.send(serde_json::to_string(&request)?).await?;
        debug!("event=rpc_call module=rpc_client status=sent id={id} method={method:?}");

        let line = self.framed.next().await.ok_or(RpcClientError::Closed)??;
        let response: Response<T> = serde_json::from_str(&line)?;
        if response.id != Some(id) {
            return Err(RpcClientError::IdMismatch {
                expected: id,
                actual: response.id,
            });
        }
        Ok(response)
    }
}

fn expect_result<T>(response: Response<T>) -> Result<T, RpcClientError> {
    if let Some(error) = response.error {
        return Err(RpcClientError::Rpc(error));
    }
    response.result.ok_or(RpcClientError::NoResult)
}
