// JSON-RPC 2.0 method registry and dispatcher.
// Methods receive a request-scoped Context (carrying at least the handler
// data) plus the raw params Value, and return a JSON result.

use std::collections::HashMap;

use futures::future::BoxFuture;
use log::{debug, trace};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use super::{
    InternalRpcError, RpcRequest, RpcResponseError, JSON_RPC_VERSION, MAX_BATCH_REQUESTS,
};
use crate::context::Context;

pub type Handler = for<'a> fn(&'a Context, Value) -> BoxFuture<'a, Result<Value, InternalRpcError>>;

/// Wrap an async fn into a registrable RPC handler
#[macro_export]
macro_rules! async_handler {
    ($func: expr) => {
        |context, body| Box::pin($func(context, body))
    };
}

pub struct RPCHandler<T>
where
    T: Send + Sync + Clone + 'static,
{
    // all RPC methods registered
    methods: HashMap<String, Handler>,
    data: T,
}

impl<T> RPCHandler<T>
where
    T: Send + Sync + Clone + 'static,
{
    pub fn new(data: T) -> Self {
        Self {
            methods: HashMap::new(),
            data,
        }
    }

    pub fn register_method(&mut self, name: &str, handler: Handler) {
        if self.methods.insert(name.into(), handler).is_some() {
            debug!("The method '{}' was already registered!", name);
        }
    }

    pub fn has_method(&self, method_name: &str) -> bool {
        self.methods.contains_key(method_name)
    }

    pub fn get_data(&self) -> &T {
        &self.data
    }

    /// Handle a raw request body with a prebuilt context.
    /// Supports single requests and bounded batches.
    pub async fn handle_request_with_context(
        &self,
        context: Context,
        body: &[u8],
    ) -> Result<Value, RpcResponseError> {
        let request: Value = serde_json::from_slice(body)
            .map_err(|_| RpcResponseError::new(None, InternalRpcError::ParseBodyError))?;

        match request {
            Value::Array(requests) => {
                if requests.len() > MAX_BATCH_REQUESTS {
                    return Err(RpcResponseError::new(
                        None,
                        InternalRpcError::BatchLimitExceeded,
                    ));
                }

                let mut responses = Vec::with_capacity(requests.len());
                for request in requests {
                    let response = match self.parse_request_value(request) {
                        Ok(request) => match self.execute_method(&context, request).await {
                            Ok(response) => response,
                            Err(e) => e.to_json(),
                        },
                        Err(e) => e.to_json(),
                    };
                    responses.push(response);
                }
                Ok(Value::Array(responses))
            }
            request => {
                let request = self.parse_request_value(request)?;
                self.execute_method(&context, request).await
            }
        }
    }

    fn parse_request_value(&self, value: Value) -> Result<RpcRequest, RpcResponseError> {
        let request: RpcRequest = serde_json::from_value(value)
            .map_err(|_| RpcResponseError::new(None, InternalRpcError::InvalidJSONRequest))?;

        if request.jsonrpc != JSON_RPC_VERSION {
            return Err(RpcResponseError::new(
                request.id,
                InternalRpcError::InvalidVersion,
            ));
        }
        Ok(request)
    }

    pub async fn execute_method(
        &self,
        context: &Context,
        mut request: RpcRequest,
    ) -> Result<Value, RpcResponseError> {
        let handler = match self.methods.get(&request.method) {
            Some(handler) => handler,
            None => {
                return Err(RpcResponseError::new(
                    request.id,
                    InternalRpcError::MethodNotFound(request.method),
                ))
            }
        };

        trace!("executing method '{}'", request.method);
        let params = request.params.take().unwrap_or(Value::Null);
        let result = handler(context, params)
            .await
            .map_err(|err| RpcResponseError::new(request.id.clone(), err))?;

        Ok(json!({
            "jsonrpc": JSON_RPC_VERSION,
            "id": request.id,
            "result": result
        }))
    }
}

/// Deserialize method params, treating absent params as an empty object
pub fn parse_params<P: DeserializeOwned>(mut params: Value) -> Result<P, InternalRpcError> {
    if params.is_null() {
        params = Value::Object(Map::new());
    }
    serde_json::from_value(params).map_err(InternalRpcError::InvalidJSONParams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    async fn echo(_: &Context, body: Value) -> Result<Value, InternalRpcError> {
        Ok(body)
    }

    fn build_handler() -> RPCHandler<u64> {
        let mut handler = RPCHandler::new(0u64);
        handler.register_method("echo", async_handler!(echo));
        handler
    }

    #[tokio::test]
    async fn test_dispatch() {
        let handler = build_handler();
        let body = br#"{"jsonrpc":"2.0","id":1,"method":"echo","params":{"a":1}}"#;
        let response = handler
            .handle_request_with_context(Context::new(), body)
            .await
            .unwrap();
        assert_eq!(response["result"]["a"], 1);
        assert_eq!(response["id"], 1);
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let handler = build_handler();
        let body = br#"{"jsonrpc":"2.0","id":1,"method":"nope"}"#;
        let err = handler
            .handle_request_with_context(Context::new(), body)
            .await
            .unwrap_err();
        assert_eq!(err.to_json()["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_invalid_version() {
        let handler = build_handler();
        let body = br#"{"jsonrpc":"1.0","id":1,"method":"echo"}"#;
        let err = handler
            .handle_request_with_context(Context::new(), body)
            .await
            .unwrap_err();
        assert_eq!(err.to_json()["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_batch() {
        let handler = build_handler();
        let body =
            br#"[{"jsonrpc":"2.0","id":1,"method":"echo","params":1},{"jsonrpc":"2.0","id":2,"method":"echo","params":2}]"#;
        let response = handler
            .handle_request_with_context(Context::new(), body)
            .await
            .unwrap();
        let responses = response.as_array().unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"], 1);
        assert_eq!(responses[1]["result"], 2);
    }

    #[test]
    fn test_parse_params_defaults() {
        #[derive(Deserialize)]
        struct Params {
            #[serde(default)]
            limit: Option<u64>,
        }

        let params: Params = parse_params(Value::Null).unwrap();
        assert!(params.limit.is_none());
    }
}
