//! HTTP plumbing shared by both transports.
//!
//! Requests are sent once: there is no retry or backoff at this layer, and a
//! transport-level failure surfaces as [`CascadeError::Server`].

use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::traits::{CascadeError, CascadeResult};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Where credentials go on a request.
#[derive(Debug, Clone, Copy)]
pub enum AuthPlacement<'a> {
    /// Credentials travel inside the body.
    None,
    Query(&'a Credentials),
    Header(&'a Credentials),
}

/// Thin JSON-over-HTTP client bound to one Cascade instance.
pub struct HttpClient {
    client: Client,
    base_url: Url,
}

impl HttpClient {
    /// Builds the client. Fails with [`CascadeError::Configuration`] on bad settings.
    pub fn new(config: &ClientConfig) -> CascadeResult<Self> {
        config.validate()?;

        let verify_tls = if !config.verify_tls {
            #[cfg(debug_assertions)]
            {
                warn!(
                    base_url = %config.base_url,
                    client = %config.name,
                    "TLS certificate verification disabled in development mode"
                );
                false
            }
            #[cfg(not(debug_assertions))]
            {
                warn!(
                    base_url = %config.base_url,
                    client = %config.name,
                    "Ignoring request to disable TLS verification in a release build"
                );
                true
            }
        } else {
            true
        };

        let mut headers = reqwest::header::HeaderMap::new();
        for (key, value) in &config.headers {
            if let (Ok(name), Ok(val)) = (
                reqwest::header::HeaderName::try_from(key.as_str()),
                reqwest::header::HeaderValue::try_from(value.as_str()),
            ) {
                headers.insert(name, val);
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!verify_tls)
            .default_headers(headers)
            .build()
            .map_err(|e| CascadeError::Configuration(e.to_string()))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| CascadeError::Configuration(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends URL-encoded path segments to the base URL.
    ///
    /// A segment containing `/` is split so each part is encoded on its own.
    pub fn endpoint<S: AsRef<str>>(&self, segments: &[S]) -> CascadeResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                CascadeError::Configuration(format!(
                    "Base URL '{}' cannot carry path segments",
                    self.base_url
                ))
            })?;
            path.pop_if_empty();
            for segment in segments {
                for part in segment.as_ref().split('/').filter(|p| !p.is_empty()) {
                    path.push(part);
                }
            }
        }
        Ok(url)
    }

    /// GETs `url` and decodes the JSON reply.
    pub async fn get_json(&self, url: Url, auth: AuthPlacement<'_>) -> CascadeResult<Value> {
        let request = self.client.get(url);
        self.execute(self.with_auth(request, auth)).await
    }

    /// POSTs `body` as JSON to `url` and decodes the JSON reply.
    pub async fn post_json(
        &self,
        url: Url,
        body: &Value,
        auth: AuthPlacement<'_>,
    ) -> CascadeResult<Value> {
        let request = self.client.post(url).json(body);
        self.execute(self.with_auth(request, auth)).await
    }

    fn with_auth(&self, request: RequestBuilder, auth: AuthPlacement<'_>) -> RequestBuilder {
        match auth {
            AuthPlacement::None => request,
            AuthPlacement::Query(creds) => request.query(&creds.query_pairs()),
            AuthPlacement::Header(creds) => request.header(
                reqwest::header::AUTHORIZATION,
                creds.basic_header().expose_secret(),
            ),
        }
    }

    async fn execute(&self, request: RequestBuilder) -> CascadeResult<Value> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CascadeError::Server(format!("Request timed out: {}", e))
            } else if e.is_connect() {
                CascadeError::Server(format!("Connection failed: {}", e))
            } else {
                CascadeError::Server(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CascadeError::Server(format!("Failed to read reply: {}", e)))?;
        debug!(%status, bytes = text.len(), "Received reply");

        match status {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(CascadeError::Server(format!(
                    "Authentication rejected ({})",
                    status
                )))
            }
            _ => {
                return Err(CascadeError::Server(format!(
                    "HTTP {}: {}",
                    status,
                    text.chars().take(500).collect::<String>()
                )))
            }
        }

        decode_reply(&text)
    }
}

/// Decodes a reply body, treating anything but JSON as a server fault.
pub fn decode_reply(text: &str) -> CascadeResult<Value> {
    serde_json::from_str(text).map_err(|e| {
        CascadeError::Server(format!(
            "Malformed reply: {} - Body: {}",
            e,
            text.chars().take(500).collect::<String>()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_client_config;

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = HttpClient::new(&test_client_config("https://cms.example.edu/api/v1")).unwrap();
        let url = client
            .endpoint(&["read", "page", "my site", "about/news & events"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://cms.example.edu/api/v1/read/page/my%20site/about/news%20&%20events"
        );
    }

    #[test]
    fn test_endpoint_handles_trailing_slash() {
        let client = HttpClient::new(&test_client_config("https://cms.example.edu/")).unwrap();
        let url = client.endpoint(&["listSites"]).unwrap();
        assert_eq!(url.as_str(), "https://cms.example.edu/listSites");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = test_client_config("https://cms.example.edu");
        config.base_url = String::new();
        assert!(HttpClient::new(&config).is_err());
    }

    #[test]
    fn test_decode_reply() {
        assert_eq!(
            decode_reply(r#"{"success":true}"#).unwrap(),
            serde_json::json!({"success": true})
        );
        let err = decode_reply("<html>oops</html>").unwrap_err();
        assert!(matches!(err, CascadeError::Server(_)));
    }
}
