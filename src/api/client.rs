use std::time::Duration;

use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use super::document::{Document, ListDocument};

/// Hard cap on response body size (2 MB). A discussion page with its
/// included posts is a few hundred KB at worst; anything larger is a
/// broken or hostile server.
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Per-request timeout, applied around the whole send+read.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out after 20s")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Malformed JSON:API payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid forum URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Insecure forum URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

impl ApiError {
    /// True if the error is transient and the request may be retried.
    fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout | ApiError::Network(_) => true,
            ApiError::HttpStatus(status) => *status >= 500,
            ApiError::ResponseTooLarge(_)
            | ApiError::Decode(_)
            | ApiError::InvalidBaseUrl(_)
            | ApiError::InsecureBaseUrl => false,
        }
    }
}

/// HTTP client for a Flarum forum's JSON:API.
///
/// Owns the base URL (`<forum>/api/`), the optional API token, and
/// the retry policy. All methods return fully decoded documents;
/// callers never see reqwest types.
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<SecretString>,
}

impl ApiClient {
    /// Build a client for `forum_url` (the forum root, without
    /// `/api`).
    ///
    /// HTTPS is enforced except for localhost, which is allowed so
    /// tests can point the client at a local mock server.
    pub fn new(
        http: reqwest::Client,
        forum_url: &str,
        token: Option<SecretString>,
    ) -> Result<Self, ApiError> {
        let parsed =
            Url::parse(forum_url).map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))?;

        if parsed.scheme() != "https" {
            let is_localhost = matches!(
                parsed.host_str(),
                Some("localhost") | Some("127.0.0.1") | Some("[::1]")
            );
            if parsed.scheme() != "http" || !is_localhost {
                tracing::error!(url = %forum_url, "Rejecting non-HTTPS forum URL");
                return Err(ApiError::InsecureBaseUrl);
            }
            tracing::warn!(url = %forum_url, "Using non-HTTPS forum URL (localhost only)");
        }

        let base = parsed
            .join(&format!("{}/api/", parsed.path().trim_end_matches('/')))
            .map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))?;

        Ok(Self { http, base, token })
    }

    /// GET a single-resource document, e.g.
    /// `discussions/5?page[near]=12&include=posts,posts.user`.
    pub async fn get_document(&self, path_and_query: &str) -> Result<Document, ApiError> {
        let body = self
            .request_with_retry(reqwest::Method::GET, path_and_query, None)
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// GET a resource-collection document, e.g. `discussions?sort=-lastPostedAt`.
    pub async fn get_list(&self, path_and_query: &str) -> Result<ListDocument, ApiError> {
        let body = self
            .request_with_retry(reqwest::Method::GET, path_and_query, None)
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// PATCH a resource with a JSON:API body, returning the updated
    /// document. Not retried: a PATCH that timed out may have been
    /// applied, and replaying it is the server's problem to dedupe,
    /// not ours to guess at.
    pub async fn patch_document(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<Document, ApiError> {
        let text = self
            .request_once(reqwest::Method::PATCH, path, Some(body))
            .await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Issue a request, retrying transient failures with exponential
    /// backoff: 1s, 2s, 4s.
    async fn request_with_retry(
        &self,
        method: reqwest::Method,
        path_and_query: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<String, ApiError> {
        let mut retry_count = 0;

        loop {
            match self.request_once(method.clone(), path_and_query, body).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && retry_count < MAX_RETRIES => {
                    let delay = 1u64 << retry_count;
                    tracing::debug!(
                        error = %e,
                        retry = retry_count + 1,
                        delay_secs = delay,
                        "Retrying API request after transient error"
                    );
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once(
        &self,
        method: reqwest::Method,
        path_and_query: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<String, ApiError> {
        let url = self
            .base
            .join(path_and_query)
            .map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))?;

        let mut request = self
            .http
            .request(method, url.clone())
            .header("Accept", "application/vnd.api+json");

        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Token {}", token.expose_secret()));
        }

        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/vnd.api+json")
                .json(body);
        }

        let response = tokio::time::timeout(REQUEST_TIMEOUT, request.send())
            .await
            .map_err(|_| ApiError::Timeout)?
            .map_err(ApiError::Network)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = status.as_u16(), "API request failed");
            return Err(ApiError::HttpStatus(status.as_u16()));
        }

        read_limited_text(response, MAX_BODY_SIZE).await
    }
}

/// Read a response body up to `limit` bytes, streaming so an
/// oversized body is rejected without buffering it whole.
async fn read_limited_text(
    response: reqwest::Response,
    limit: usize,
) -> Result<String, ApiError> {
    let mut buf: Vec<u8> = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        if buf.len() + chunk.len() > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        buf.extend_from_slice(&chunk);
    }

    String::from_utf8(buf).map_err(|_| {
        ApiError::Decode(serde_json::Error::io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "response body is not valid UTF-8",
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn discussion_json() -> serde_json::Value {
        serde_json::json!({
            "data": {
                "type": "discussions",
                "id": "5",
                "attributes": { "title": "Hello world", "slug": "hello-world" }
            }
        })
    }

    #[test]
    fn test_rejects_plain_http_for_remote_hosts() {
        let result = ApiClient::new(reqwest::Client::new(), "http://forum.example.com", None);
        assert!(matches!(result, Err(ApiError::InsecureBaseUrl)));
    }

    #[test]
    fn test_allows_http_for_localhost() {
        let result = ApiClient::new(reqwest::Client::new(), "http://127.0.0.1:9999", None);
        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_unparseable_url() {
        let result = ApiClient::new(reqwest::Client::new(), "not a url", None);
        assert!(matches!(result, Err(ApiError::InvalidBaseUrl(_))));
    }

    #[tokio::test]
    async fn test_get_document_decodes_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/discussions/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(discussion_json()))
            .mount(&server)
            .await;

        let client = ApiClient::new(reqwest::Client::new(), &server.uri(), None).unwrap();
        let doc = client.get_document("discussions/5").await.unwrap();
        assert_eq!(doc.data.attr_str("title"), Some("Hello world"));
    }

    #[tokio::test]
    async fn test_token_sent_as_authorization_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/discussions/5"))
            .and(header("Authorization", "Token sekrit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(discussion_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(
            reqwest::Client::new(),
            &server.uri(),
            Some(SecretString::from("sekrit".to_string())),
        )
        .unwrap();
        client.get_document("discussions/5").await.unwrap();
    }

    #[tokio::test]
    async fn test_404_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(reqwest::Client::new(), &server.uri(), None).unwrap();
        let result = client.get_document("discussions/999").await;
        assert!(matches!(result, Err(ApiError::HttpStatus(404))));
    }

    #[tokio::test]
    async fn test_500_retries_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(4) // initial request + 3 retries
            .mount(&server)
            .await;

        let client = ApiClient::new(reqwest::Client::new(), &server.uri(), None).unwrap();
        let result = client.get_document("discussions/5").await;
        assert!(matches!(result, Err(ApiError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_patch_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(reqwest::Client::new(), &server.uri(), None).unwrap();
        let result = client
            .patch_document("discussions/5", &serde_json::json!({}))
            .await;
        assert!(matches!(result, Err(ApiError::HttpStatus(503))));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(vec![b'a'; MAX_BODY_SIZE + 1]),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(reqwest::Client::new(), &server.uri(), None).unwrap();
        let result = client.get_document("discussions/5").await;
        assert!(matches!(result, Err(ApiError::ResponseTooLarge(_))));
    }
}
