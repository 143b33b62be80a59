use std::sync::{Arc, Mutex};

use ism_model::{ApiRequest, ServerResponse};
use ism_service::{ApiCaller, ToastLog};
use serde_json::{Value, json};

type Responder = Box<dyn Fn(&ApiRequest) -> ServerResponse + Send + Sync>;

/// Records every request and answers with a scripted responder.
pub struct MockCaller {
    requests: Mutex<Vec<ApiRequest>>,
    responder: Responder,
}

impl MockCaller {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> ServerResponse + Send + Sync + 'static,
    {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ApiCaller for MockCaller {
    async fn call(&self, request: ApiRequest) -> ServerResponse {
        let response = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}

pub fn toasts() -> Arc<ToastLog> {
    Arc::new(ToastLog::new())
}

/// `ok: false` envelope carrying an engine error body.
pub fn engine_error(status: u64, error_type: &str, message: &str) -> ServerResponse {
    ServerResponse::failure(message).with_body(json!({
        "status": status,
        "error": { "type": error_type, "reason": message },
    }))
}

static NULL: Value = Value::Null;

/// Value of `data.<key>` of a recorded request.
pub fn data<'a>(request: &'a ApiRequest, key: &str) -> &'a Value {
    request
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .unwrap_or(&NULL)
}
