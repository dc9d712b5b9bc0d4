//! TCP server for the registry protocol.
//!
//! # Threading model
//! - The accept loop runs on the calling task.
//! - Every connection runs on its own spawned task.
//! - Every store call runs on `spawn_blocking`; all tasks share one
//!   `RegistryService` through `Arc`.

use crate::error::RpcServerError;
use crate::frame::{RequestCodec, RequestFrame};
use crate::protocol::{
    Method, PingResult, RegisterNewPetParams, RegisterNewPetResult, Request, Response, RpcError,
    SearchPetParams, SearchPetResult, INTERNAL_ERROR, INVALID_PARAMS, MAX_FRAME_BYTES,
    PARSE_ERROR, STORAGE_ERROR,
};
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use petreg_core::{PetRepository, RegistryService, SearchCriterion};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

/// Registry server bound to one shared service.
pub struct Server<R: PetRepository + 'static> {
    service: Arc<RegistryService<R>>,
}

impl<R: PetRepository + 'static> Server<R> {
    pub fn new(service: Arc<RegistryService<R>>) -> Self {
        Self { service }
    }

    /// Binds `addr` and serves until `cancel` fires.
    pub async fn serve(
        self,
        addr: SocketAddr,
        cancel: CancellationToken,
    ) -> Result<(), RpcServerError> {
        let listener = TcpListener::bind(addr).await?;
        self.run(listener, cancel).await
    }

    /// Serves connections from an already bound listener until `cancel` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        cancel: CancellationToken,
    ) -> Result<(), RpcServerError> {
        let local_addr = listener.local_addr()?;
        info!("event=server_start module=rpc status=ok addr={local_addr}");

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("event=server_stop module=rpc status=ok addr={local_addr}");
                    break;
                }

                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let service = Arc::clone(&self.service);
                            let cancel = cancel.child_token();
                            tokio::spawn(async move {
                                if let Err(err) = handle_connection(stream, service, cancel).await {
                                    warn!("event=connection module=rpc status=error peer={peer} error={err}");
                                }
                            });
                        }
                        Err(err) => {
                            error!("event=accept module=rpc status=error error={err}");
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

async fn handle_connection<R: PetRepository + 'static>(
    stream: TcpStream,
    service: Arc<RegistryService<R>>,
    cancel: CancellationToken,
) -> Result<(), RpcServerError> {
    let peer = stream.peer_addr()?;
    debug!("event=connection module=rpc status=start peer={peer}");

    let framed = Framed::new(stream, RequestCodec::new(MAX_FRAME_BYTES));
    let (mut sink, mut lines) = framed.split();
    let mut handled = 0u64;

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = lines.next() => next,
        };

        let line = match next {
            None => break,
            Some(Ok(RequestFrame::Line(line))) => line,
            Some(Ok(RequestFrame::Oversized)) => {
                warn!("event=rpc_request module=rpc status=error error_code=oversized peer={peer}");
                let message = format!("request exceeds {MAX_FRAME_BYTES} bytes");
                sink.send(parse_error(message)?).await?;
                continue;
            }
            Some(Ok(RequestFrame::NotUtf8)) => {
                warn!("event=rpc_request module=rpc status=error error_code=not_utf8 peer={peer}");
                let message = "request is not valid UTF-8".to_string();
                sink.send(parse_error(message)?).await?;
                continue;
            }
            Some(Err(err)) => return Err(err.into()),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        handled += 1;
        let response = handle_line(&service, trimmed).await;
        sink.send(serde_json::to_string(&response)?).await?;
    }

    debug!("event=connection module=rpc status=ok peer={peer} requests={handled}");
    Ok(())
}

fn parse_error(message: String) -> Result<String, serde_json::Error> {
    let response: Response = Response::error(None, RpcError::new(PARSE_ERROR, message));
    serde_json::to_string(&response)
}

/// Decodes one request line and produces its response.
pub async fn handle_line<R: PetRepository + 'static>(
    service: &Arc<RegistryService<R>>,
    line: &str,
) -> Response {
    let raw: Value = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(err) => {
            warn!("event=rpc_request module=rpc status=error error_code=parse_error error={err}");
            return Response::error(
                None,
                RpcError::new(PARSE_ERROR, format!("parse error: {err}")),
            );
        }
    };

    let id = raw.get("id").and_then(Value::as_u64);
    let request: Request = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(err) => {
            warn!(
                "event=rpc_request module=rpc status=error error_code=invalid_request error={err}"
            );
            return Response::error(
                id,
                RpcError::new(PARSE_ERROR, format!("invalid request: {err}")),
            );
        }
    };

    let started_at = Instant::now();
    let method = request.method;
    let response = dispatch(service, request).await;
    debug!(
        "event=rpc_request module=rpc status={} method={method:?} duration_ms={}",
        if response.error.is_some() { "error" } else { "ok" },
        started_at.elapsed().as_millis()
    );
    response
}

async fn dispatch<R: PetRepository + 'static>(
    service: &Arc<RegistryService<R>>,
    request: Request,
) -> Response {
    let id = request.id;
    match request.method {
        Method::Ping => encode(
            id,
            PingResult {
                message: petreg_core::ping().to_string(),
                version: petreg_core::core_version().to_string(),
            },
        ),
        Method::RegisterNewPet => {
            let params: RegisterNewPetParams = match decode_params(request.params) {
                Ok(params) => params,
                Err(err) => return Response::error(id, err),
            };
            let service = Arc::clone(service);
            let outcome =
                match tokio::task::spawn_blocking(move || service.register_new_pet(params.into()))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(err) => return worker_failed(id, &err),
                };

            let storage_error = outcome
                .error
                .map(|err| RpcError::new(STORAGE_ERROR, err.to_string()));
            let mut response = encode(id, RegisterNewPetResult::from(outcome.reply));
            if response.error.is_none() {
                response.error = storage_error;
            }
            response
        }
        Method::SearchPet => {
            let params: SearchPetParams = match decode_params(request.params) {
                Ok(params) => params,
                Err(err) => return Response::error(id, err),
            };
            let criterion = SearchCriterion::from(params);
            let service = Arc::clone(service);
            match tokio::task::spawn_blocking(move || service.search_pet(&criterion)).await {
                Ok(Ok(reply)) => encode(id, SearchPetResult::from(reply)),
                Ok(Err(err)) => Response::error(id, RpcError::new(STORAGE_ERROR, err.to_string())),
                Err(err) => worker_failed(id, &err),
            }
        }
    }
}

fn decode_params<P: DeserializeOwned>(params: Value) -> Result<P, RpcError> {
    let params = match params {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    serde_json::from_value(params)
        .map_err(|err| RpcError::new(INVALID_PARAMS, format!("invalid params: {err}")))
}

fn encode<T: Serialize>(id: Option<u64>, result: T) -> Response {
    match serde_json::to_value(result) {
        Ok(value) => Response::success(id, value),
        Err(err) => Response::error(
            id,
            RpcError::new(INTERNAL_ERROR, format!("failed to encode result: {err}")),
        ),
    }
}

fn worker_failed(id: Option<u64>, err: &tokio::task::JoinError) -> Response {
    error!("event=rpc_worker module=rpc status=error error={err}");
    Response::error(id, RpcError::new(INTERNAL_ERROR, format!("worker failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::handle_line;
    use crate::protocol::{INVALID_PARAMS, PARSE_ERROR, STORAGE_ERROR};
    use petreg_core::{
        FieldValue, NewPet, Pet, PetField, PetId, PetRepository, RegistryService, RepoError,
        RepoResult, SqlitePetRepository,
    };
    use serde_json::json;
    use std::sync::Arc;

    struct OfflineRepo;

    impl PetRepository for OfflineRepo {
        fn insert(&self, _pet: &NewPet) -> RepoResult<PetId> {
            Err(RepoError::Unavailable("offline".to_string()))
        }

        fn find_by_field(&self, _field: PetField, _value: &FieldValue) -> RepoResult<Vec<Pet>> {
            Err(RepoError::Unavailable("offline".to_string()))
        }
    }

    fn sqlite_service() -> Arc<RegistryService<SqlitePetRepository>> {
        Arc::new(RegistryService::new(
            SqlitePetRepository::open_in_memory().unwrap(),
        ))
    }

    #[tokio::test]
    async fn register_and_search_over_lines() {
        let service = sqlite_service();

        let registered = handle_line(
            &service,
            r#"{"id":1,"method":"register_new_pet","params":{"name":"Buddy","gender":"Male","age":3,"breed":"Golden Retriever","picture":""}}"#,
        )
        .await;
        assert_eq!(registered.id, Some(1));
        assert!(registered.error.is_none());
        let result = registered.result.unwrap();
        assert_eq!(result["code"], 0);
        assert_eq!(result["msg"], "Pet registered successfully");

        let found = handle_line(
            &service,
            r#"{"id":2,"method":"search_pet","params":{"detail":{"name":"Buddy"}}}"#,
        )
        .await;
        assert_eq!(
            found.result.unwrap(),
            json!({ "pets": [{
                "name": "Buddy",
                "gender": "Male",
                "age": 3,
                "breed": "Golden Retriever",
                "picture": ""
            }]})
        );
    }

    #[tokio::test]
    async fn malformed_json_is_a_parse_error() {
        let response = handle_line(&sqlite_service(), "{not json").await;
        assert_eq!(response.error.unwrap().code, PARSE_ERROR);
    }

    #[tokio::test]
    async fn unknown_method_keeps_request_id() {
        let response = handle_line(&sqlite_service(), r#"{"id":9,"method":"delete_pet"}"#).await;
        assert_eq!(response.id, Some(9));
        assert_eq!(response.error.unwrap().code, PARSE_ERROR);
    }

    #[tokio::test]
    async fn bad_params_are_invalid_params() {
        let response = handle_line(
            &sqlite_service(),
            r#"{"id":3,"method":"register_new_pet","params":{"age":"three"}}"#,
        )
        .await;
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn register_failure_carries_code_and_error() {
        let service = Arc::new(RegistryService::new(OfflineRepo));
        let response = handle_line(
            &service,
            r#"{"id":4,"method":"register_new_pet","params":{"name":"Buddy"}}"#,
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["code"], 1);
        assert_eq!(result["msg"], "Failed to register pet");
        let error = response.error.unwrap();
        assert_eq!(error.code, STORAGE_ERROR);
        assert!(error.message.contains("offline"));
    }

    #[tokio::test]
    async fn search_failure_is_an_error_not_an_empty_list() {
        let service = Arc::new(RegistryService::new(OfflineRepo));
        let response = handle_line(
            &service,
            r#"{"id":5,"method":"search_pet","params":{"detail":{"breed":"Pug"}}}"#,
        )
        .await;
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, STORAGE_ERROR);
    }

    #[tokio::test]
    async fn search_without_detail_is_empty_even_when_store_is_down() {
        let service = Arc::new(RegistryService::new(OfflineRepo));
        let response = handle_line(&service, r#"{"id":6,"method":"search_pet"}"#).await;
        assert!(response.error.is_none());
        assert_eq!(response.result.unwrap(), json!({ "pets": [] }));
    }
}
