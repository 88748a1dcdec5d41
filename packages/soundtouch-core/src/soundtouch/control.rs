//! Low-level HTTP transport for the SoundTouch control API.
//!
//! This module handles request building, HTTP transport and error-body
//! detection. For typed device commands, see `client.rs`.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::protocol_constants::CONTROL_TIMEOUT_SECS;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while talking to a SoundTouch control endpoint.
#[derive(Debug, Error)]
pub enum ControlError {
    /// HTTP request to the device failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Device returned a non-success HTTP status without an error document.
    #[error("HTTP error {0}: {1}")]
    HttpStatus(u16, String),

    /// Device answered with an `<errors>` document.
    #[error("device error: {0}")]
    Device(String),

    /// Response body could not be parsed.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// Convenient Result alias for control API operations.
pub type ControlResult<T> = Result<T, ControlError>;

impl ControlError {
    /// Returns true if the failure is transient and an idempotent request may be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ControlError::Http(e) => e.is_timeout() || e.is_connect(),
            ControlError::HttpStatus(status, _) => *status == 503,
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response
// ─────────────────────────────────────────────────────────────────────────────

/// Joins a control endpoint (`http://{address}:8090`) and a resource path.
pub fn build_control_url(endpoint: &str, path: &str) -> String {
    format!(
        "{}/{}",
        endpoint.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Sends a request to a SoundTouch control endpoint.
///
/// A request without a body is sent as `GET`, a request with a body as `POST`
/// with an XML content type. Error documents (`<errors>…</errors>`) are turned
/// into [`ControlError::Device`] even when the status code is 200.
pub async fn send_control_request(
    client: &Client,
    endpoint: &str,
    path: &str,
    body: Option<String>,
) -> ControlResult<String> {
    let url = build_control_url(endpoint, path);
    let method = if body.is_some() { "POST" } else { "GET" };

    log::debug!(
        "[HTTP] {} {} (body: {} bytes)",
        method,
        url,
        body.as_ref().map_or(0, String::len)
    );
    if let Some(ref body) = body {
        log::trace!("[HTTP] Request body: {}", body);
    }

    let request = match body {
        Some(body) => client
            .post(&url)
            .header("Content-Type", "application/xml")
            .body(body),
        None => client.get(&url),
    };

    let start = std::time::Instant::now();
    let res = request
        .timeout(Duration::from_secs(CONTROL_TIMEOUT_SECS))
        .send()
        .await;

    log::debug!(
        "[HTTP] {} {} completed in {:?}: {:?}",
        method,
        url,
        start.elapsed(),
        res.as_ref().map(|r| r.status())
    );

    let res = res?;
    let status = res.status();
    let response_text = res.text().await?;

    if response_text.contains("<errors") {
        let detail = extract_error_name(&response_text)
            .unwrap_or_else(|| "unknown device error".to_string());
        return Err(ControlError::Device(detail));
    }

    if !status.is_success() {
        return Err(ControlError::HttpStatus(status.as_u16(), response_text));
    }

    Ok(response_text)
}

/// Extracts the `name` attribute of the first `<error>` element.
fn extract_error_name(xml: &str) -> Option<String> {
    let start = xml.find("<error ")?;
    let element = &xml[start..];
    let element = &element[..element.find('>')?];
    let attr_start = element.find("name=\"")? + "name=\"".len();
    let rest = &element[attr_start..];
    let end = rest.find('"')?;
    Some(html_escape::decode_html_entities(&rest[..end]).into_owned())
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for control API requests.
///
/// # Example
/// ```ignore
/// let response = ControlRequestBuilder::new(&client, "http://192.168.1.20:8090")
///     .path("/volume")
///     .body("<volume>30</volume>")
///     .send()
///     .await?;
/// ```
pub struct ControlRequestBuilder<'a> {
    client: &'a Client,
    endpoint: &'a str,
    path: Option<&'a str>,
    body: Option<String>,
}

impl<'a> ControlRequestBuilder<'a> {
    /// Creates a new request builder for the given control endpoint.
    #[must_use]
    pub fn new(client: &'a Client, endpoint: &'a str) -> Self {
        Self {
            client,
            endpoint,
            path: None,
            body: None,
        }
    }

    /// Sets the resource path (e.g. `/info`, `/volume`).
    #[must_use]
    pub fn path(mut self, path: &'a str) -> Self {
        self.path = Some(path);
        self
    }

    /// Sets an XML body, turning the request into a `POST`.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sends the request and returns the response body.
    ///
    /// # Errors
    /// Returns `ControlError` if the path is not set or the request fails.
    pub async fn send(self) -> ControlResult<String> {
        let path = self
            .path
            .ok_or_else(|| ControlError::Parse("ControlRequestBuilder: path not set".into()))?;

        send_control_request(self.client, self.endpoint, path, self.body).await
    }

    /// Returns the request parts without sending (for testing).
    #[cfg(test)]
    pub fn into_parts(self) -> Option<(&'a str, Option<String>)> {
        Some((self.path?, self.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_url_joins_without_double_slash() {
        assert_eq!(
            build_control_url("http://10.0.0.5:8090", "/info"),
            "http://10.0.0.5:8090/info"
        );
        assert_eq!(
            build_control_url("http://10.0.0.5:8090/", "volume"),
            "http://10.0.0.5:8090/volume"
        );
    }

    #[test]
    fn builder_without_body_has_no_payload() {
        let client = Client::new();
        let parts = ControlRequestBuilder::new(&client, "http://10.0.0.5:8090")
            .path("/info")
            .into_parts();

        let (path, body) = parts.expect("should have parts");
        assert_eq!(path, "/info");
        assert!(body.is_none());
    }

    #[test]
    fn builder_captures_body() {
        let client = Client::new();
        let parts = ControlRequestBuilder::new(&client, "http://10.0.0.5:8090")
            .path("/volume")
            .body("<volume>30</volume>")
            .into_parts();

        let (_, body) = parts.expect("should have parts");
        assert_eq!(body.as_deref(), Some("<volume>30</volume>"));
    }

    #[test]
    fn into_parts_returns_none_without_path() {
        let client = Client::new();
        let parts = ControlRequestBuilder::new(&client, "http://10.0.0.5:8090").into_parts();
        assert!(parts.is_none());
    }

    #[test]
    fn extracts_error_name_from_error_document() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" ?><errors deviceID="A0F6FD1E2A3B"><error value="1019" name="CLIENT_XML_ERROR" severity="Unknown">1019</error></errors>"#;
        assert_eq!(extract_error_name(xml).as_deref(), Some("CLIENT_XML_ERROR"));
    }

    #[test]
    fn status_errors_other_than_503_are_not_transient() {
        assert!(ControlError::HttpStatus(503, String::new()).is_transient());
        assert!(!ControlError::HttpStatus(400, String::new()).is_transient());
        assert!(!ControlError::Device("INVALID_KEY".into()).is_transient());
    }
}
