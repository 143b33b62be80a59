//! Dashboards proxy client.
//!
//! Every call is a `POST` of the serialised [`ApiRequest`] to the plugin's
//! proxy route; the dashboards server forwards it to the engine client and
//! wraps the result in a [`ServerResponse`] envelope.

use std::time::Duration;

use ism_model::{ApiRequest, ServerResponse};
use reqwest::Url;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, warn};

use crate::caller::ApiCaller;
use crate::error::{Result, ServiceError};

/// Proxy route of the index management plugin.
pub const API_CALLER_PATH: &str = "/api/ism/apiCaller";

/// Default HTTP request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT_VALUE: &str = concat!("ism-cli/", env!("CARGO_PKG_VERSION"));

/// [`ApiCaller`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpApiCaller {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpApiCaller {
    /// Create a client for the dashboards server at `base_url`.
    ///
    /// `data_source_id` selects a remote cluster in multi data source setups.
    pub fn new(base_url: &str, data_source_id: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        // Dashboards rejects state-changing calls without this header.
        headers.insert("osd-xsrf", HeaderValue::from_static("true"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint_url(base_url, data_source_id)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn send(&self, request: &ApiRequest) -> Result<ServerResponse> {
        debug!(endpoint = %request.endpoint, method = request.method.as_str(), "calling proxy");
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Dashboards answers route-level failures with
            // `{ statusCode, error, message }` instead of an envelope.
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status}"));
            let mut failure = ServerResponse::failure(message);
            failure.body = Some(serde_json::json!({
                "status": status.as_u16(),
                "error": body,
            }));
            return Ok(failure);
        }

        Ok(response.json().await?)
    }
}

impl ApiCaller for HttpApiCaller {
    async fn call(&self, request: ApiRequest) -> ServerResponse {
        match self.send(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(endpoint = %request.endpoint, error = %err, "proxy call failed");
                ServerResponse::failure(err.to_string())
            }
        }
    }
}

/// Proxy URL for `base_url`, with the data source as a query parameter.
pub fn endpoint_url(base_url: &str, data_source_id: Option<&str>) -> Result<Url> {
    let base = Url::parse(base_url)
        .map_err(|e| ServiceError::Network(format!("invalid server URL '{base_url}': {e}")))?;
    let mut url = base
        .join(API_CALLER_PATH)
        .map_err(|e| ServiceError::Network(format!("invalid server URL '{base_url}': {e}")))?;
    if let Some(id) = data_source_id.filter(|id| !id.is_empty()) {
        url.query_pairs_mut().append_pair("dataSourceId", id);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_without_data_source() {
        let url = endpoint_url("http://localhost:5601", None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5601/api/ism/apiCaller");
    }

    #[test]
    fn endpoint_with_data_source() {
        let url = endpoint_url("http://localhost:5601/", Some("ds 1")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5601/api/ism/apiCaller?dataSourceId=ds+1"
        );
        let url = endpoint_url("http://localhost:5601/", Some("")).unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn invalid_base_url() {
        assert!(matches!(
            endpoint_url("not a url", None),
            Err(ServiceError::Network(_))
        ));
    }
}
