//! Shared HTTP plumbing for the API clients.
//!
//! Every client sends plain JSON GET requests; this module turns the
//! possible failures into one classified error type.

use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const BODY_PREVIEW_LIMIT: usize = 256;

/// A failed request, classified by where it failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("cannot connect to {url}")]
    Connect { url: String },

    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("malformed response from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            FetchError::Timeout { url }
        } else if err.is_connect() {
            FetchError::Connect { url }
        } else if err.is_decode() {
            FetchError::Decode { url, source: err }
        } else {
            FetchError::Request { url, source: err }
        }
    }

    /// HTTP status code, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_connect(&self) -> bool {
        matches!(self, FetchError::Connect { .. })
    }
}

/// Build a client with a per-request timeout.
pub fn build_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))
}

/// Send `request` and decode a 2xx JSON body into `T`.
pub async fn get_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, FetchError> {
    let response = request.send().await.map_err(|e| {
        let url = e.url().map(|u| u.to_string()).unwrap_or_default();
        FetchError::from_reqwest(e, &url)
    })?;

    let url = response.url().to_string();
    let status = response.status();
    debug!("GET {} -> {}", url, status);

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::Status {
            status: status.as_u16(),
            url,
            body: preview_body(&body),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| FetchError::from_reqwest(e, &url))
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    if trimmed.len() <= BODY_PREVIEW_LIMIT {
        return trimmed.to_string();
    }
    let mut end = BODY_PREVIEW_LIMIT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Greeting {
        hello: String,
    }

    #[test]
    fn test_preview_body_empty() {
        assert_eq!(preview_body("  \n "), "<empty body>");
    }

    #[test]
    fn test_preview_body_truncates() {
        let body = "é".repeat(BODY_PREVIEW_LIMIT);
        let preview = preview_body(&body);
        assert!(preview.ends_with("..."));
        assert!(preview.len() <= BODY_PREVIEW_LIMIT + 3);
    }

    #[tokio::test]
    async fn test_get_json_decodes_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/greeting")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"hello":"world"}"#)
            .create_async()
            .await;

        let client = build_client(5).unwrap();
        let greeting: Greeting = get_json(client.get(format!("{}/greeting", server.url())))
            .await
            .unwrap();

        assert_eq!(greeting.hello, "world");
    }

    #[tokio::test]
    async fn test_get_json_status_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/greeting")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let client = build_client(5).unwrap();
        let err = get_json::<Greeting>(client.get(format!("{}/greeting", server.url())))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("maintenance"));
    }

    #[tokio::test]
    async fn test_get_json_malformed_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/greeting")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = build_client(5).unwrap();
        let err = get_json::<Greeting>(client.get(format!("{}/greeting", server.url())))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_get_json_connect_error() {
        let client = build_client(5).unwrap();
        // Port 9 (discard) is closed on test machines
        let err = get_json::<Greeting>(client.get("http://127.0.0.1:9/greeting"))
            .await
            .unwrap_err();

        assert!(err.is_connect());
    }
}
