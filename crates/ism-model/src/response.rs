//! Request and response envelopes of the dashboards API proxy.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP method forwarded by the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

/// A call routed through the proxy to an engine client endpoint such as
/// `indices.create` or `transport.request`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub endpoint: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: HttpMethod::Get,
            data: None,
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// A raw REST call through the `transport.request` endpoint.
    pub fn transport(method: HttpMethod, path: impl Into<String>, body: Option<Value>) -> Self {
        let mut data = serde_json::json!({
            "method": method.as_str(),
            "path": path.into(),
        });
        if let (Some(body), Some(map)) = (body, data.as_object_mut()) {
            map.insert("body".to_string(), body);
        }
        Self::new("transport.request")
            .with_method(method)
            .with_data(data)
    }
}

/// Envelope returned by the proxy: `{ ok, response }` or `{ ok, error }`.
///
/// `body` carries the raw engine error body when the proxy forwards one
/// (used to detect status codes and exception types).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse<T = Value> {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl<T> ServerResponse<T> {
    pub fn success(response: T) -> Self {
        Self {
            ok: true,
            response: Some(response),
            error: None,
            body: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            response: None,
            error: Some(error.into()),
            body: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// `status` field of the error body, if any.
    pub fn status(&self) -> Option<u64> {
        self.body
            .as_ref()
            .and_then(|body| body.get("status"))
            .and_then(Value::as_u64)
    }

    /// `error.type` of the error body, if any.
    pub fn error_type(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|body| body.pointer("/error/type"))
            .and_then(Value::as_str)
    }

    pub fn is_security_exception(&self) -> bool {
        self.error_type() == Some("security_exception")
    }

    /// Error text for display, falling back to a generic message.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "Request failed".to_string())
    }

    /// Convert the envelope into a `Result`. An `ok` envelope without a
    /// response is treated as a failure.
    pub fn into_result(self) -> Result<T, String> {
        match (self.ok, self.response) {
            (true, Some(response)) => Ok(response),
            (true, None) => Err("Response body is missing".to_string()),
            (false, _) => Err(self
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "Request failed".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn transport_request_shape() {
        let request = ApiRequest::transport(HttpMethod::Get, "/_plugins/_im/lron", None);
        insta::assert_json_snapshot!(request, @r#"
        {
          "endpoint": "transport.request",
          "method": "GET",
          "data": {
            "method": "GET",
            "path": "/_plugins/_im/lron"
          }
        }
        "#);
    }

    #[test]
    fn parses_failure_envelope() {
        let raw = json!({
            "ok": false,
            "error": "no permissions",
            "body": { "status": 403, "error": { "type": "security_exception" } }
        });
        let response: ServerResponse = serde_json::from_value(raw).unwrap();
        assert!(!response.ok);
        assert_eq!(response.status(), Some(403));
        assert!(response.is_security_exception());
        assert_eq!(response.into_result().unwrap_err(), "no permissions");
    }

    #[test]
    fn ok_without_response_is_an_error() {
        let response: ServerResponse = serde_json::from_value(json!({ "ok": true })).unwrap();
        assert!(response.into_result().is_err());
    }
}
