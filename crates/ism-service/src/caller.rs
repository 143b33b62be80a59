//! The HTTP-calling capability.

use std::future::Future;
use std::sync::Arc;

use ism_model::{ApiRequest, ServerResponse};
use serde::de::DeserializeOwned;

use crate::error::Result;

/// Sends proxy requests. Implementations never fail outright: transport
/// problems come back as `ok: false` envelopes.
pub trait ApiCaller: Send + Sync {
    fn call(&self, request: ApiRequest) -> impl Future<Output = ServerResponse> + Send;
}

impl<C: ApiCaller> ApiCaller for Arc<C> {
    fn call(&self, request: ApiRequest) -> impl Future<Output = ServerResponse> + Send {
        C::call(self, request)
    }
}

/// Decode the `response` payload of a successful envelope.
pub fn decode<T: DeserializeOwned>(response: ServerResponse) -> Result<ServerResponse<T>> {
    let ServerResponse {
        ok,
        response,
        error,
        body,
    } = response;
    let response = response.map(serde_json::from_value).transpose()?;
    Ok(ServerResponse {
        ok,
        response,
        error,
        body,
    })
}
