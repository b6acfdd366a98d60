//! Remote-fetch envelope and the hosted backend's REST client
//!
//! Remote functions resolve to a `{data, error}` envelope. Returning
//! `Err(RemoteError)` instead means the call itself blew up (transport
//! failure, undecodable body), which the cached-call wrapper treats
//! differently from an error reported inside the envelope.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error code manufactured when offline with nothing cached
pub const OFFLINE_CODE: &str = "OFFLINE";

/// Structured error carried in envelopes and outcomes
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub code: String,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The error reported when offline and no cached data exists
    pub fn offline() -> Self {
        Self::new(OFFLINE_CODE, "Offline and no cached data available")
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        let code = e
            .status()
            .map(|status| status.as_u16().to_string())
            .unwrap_or_else(|| "NETWORK".to_string());
        Self::new(code, e.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        Self::new("PARSE", e.to_string())
    }
}

/// `{data, error}` envelope returned by a remote function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse<T> {
    pub data: Option<T>,
    pub error: Option<RemoteError>,
}

impl<T> RemoteResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: RemoteError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }
}

/// Client for the hosted backend's PostgREST interface
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestClient {
    /// Creates a client for the project at `base_url` using `api_key`
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    /// Creates a client with a custom HTTP client
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// URL selecting `columns` from `table`
    pub fn table_url(&self, table: &str, columns: &str) -> String {
        format!(
            "{}/rest/v1/{}?select={}",
            self.base_url,
            urlencoding::encode(table),
            urlencoding::encode(columns)
        )
    }

    /// Fetches rows of `table`
    ///
    /// # Returns
    /// * `Ok` with `data` set on a 2xx response
    /// * `Ok` with `error` set when the backend answers with an error status
    /// * `Err` when the request cannot be sent or the body is not JSON
    pub async fn fetch_table(
        &self,
        table: &str,
        columns: &str,
    ) -> Result<RemoteResponse<Value>, RemoteError> {
        let response = self
            .client
            .get(self.table_url(table, columns))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<BackendError>(&text)
                .ok()
                .and_then(|body| body.message)
                .unwrap_or(text);
            return Ok(RemoteResponse::err(RemoteError::new(
                status.as_u16().to_string(),
                message,
            )));
        }

        Ok(RemoteResponse::ok(serde_json::from_str(&text)?))
    }
}

/// Error body returned by the backend
#[derive(Debug, Deserialize)]
struct BackendError {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_error_shape() {
        let err = RemoteError::offline();
        assert_eq!(err.code, "OFFLINE");
        assert_eq!(err.message, "Offline and no cached data available");
        assert_eq!(err.to_string(), "OFFLINE: Offline and no cached data available");
    }

    #[test]
    fn test_envelope_constructors() {
        let ok = RemoteResponse::ok(3);
        assert_eq!(ok.data, Some(3));
        assert!(ok.error.is_none());

        let err: RemoteResponse<i32> = RemoteResponse::err(RemoteError::new("42501", "denied"));
        assert!(err.data.is_none());
        assert_eq!(err.error.unwrap().code, "42501");
    }

    #[test]
    fn test_table_url() {
        let client = RestClient::new("https://project.example.co/", "anon");
        assert_eq!(
            client.table_url("tasks", "id,title"),
            "https://project.example.co/rest/v1/tasks?select=id%2Ctitle"
        );
        assert_eq!(
            client.table_url("stock items", "*"),
            "https://project.example.co/rest/v1/stock%20items?select=%2A"
        );
    }

    #[test]
    fn test_table_url_encodes_plus_and_equals() {
        let client = RestClient::new("https://project.example.co", "anon");
        assert_eq!(
            client.table_url("tasks", "a+b=c"),
            "https://project.example.co/rest/v1/tasks?select=a%2Bb%3Dc"
        );
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: RemoteError = serde_json::from_str::<Value>("{").unwrap_err().into();
        assert_eq!(err.code, "PARSE");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_call_failure() {
        // Port 9 on localhost is the discard service and is normally closed
        let client = RestClient::new("http://127.0.0.1:9", "anon");
        let result = client.fetch_table("tasks", "*").await;
        assert!(result.is_err());
    }
}
