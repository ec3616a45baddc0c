//! Thin blocking wrapper over platform REST APIs.
//!
//! Every HTTP call pitcrew makes goes through [`ApiClient`]: a base URL,
//! one authentication mode, and JSON-by-default request/response handling.
//! Non-2xx responses become [`HttpError::Status`] carrying the response
//! body, so command-level errors can show what the server actually said.

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default per-request timeout. Polling loops own their overall deadline;
/// this only bounds a single hung request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Base URL or joined path failed to parse
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    /// Client construction or transport-level failure
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: StatusCode,
        body: String,
    },

    /// Response body was not the expected JSON shape
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
}

/// Authentication mode applied to every request
#[derive(Debug, Clone)]
pub enum Auth {
    /// No credentials (pre-bootstrap probes)
    None,
    /// `Authorization: Bearer <token>` (BuildKite API tokens)
    Bearer(String),
    /// HTTP basic auth (TeamCity users; the super user has an empty name)
    Basic { user: String, password: String },
}

/// Blocking REST client bound to one server and one credential.
#[derive(Debug)]
pub struct ApiClient {
    base: Url,
    auth: Auth,
    client: Client,
}

impl ApiClient {
    /// Create a client for `base_url` using `auth` on every request.
    pub fn new(base_url: &str, auth: Auth) -> Result<Self, HttpError> {
        let base = Url::parse(base_url).map_err(|e| HttpError::InvalidUrl {
            url: base_url.to_string(),
            source: e,
        })?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HttpError::Transport {
                url: base_url.to_string(),
                source: e,
            })?;
        Ok(Self { base, auth, client })
    }

    /// Resolve `path` (which may carry a query string) against the base URL.
    pub fn url(&self, path: &str) -> Result<Url, HttpError> {
        self.base.join(path).map_err(|e| HttpError::InvalidUrl {
            url: format!("{}{path}", self.base),
            source: e,
        })
    }

    /// Base URL this client is bound to.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn apply_auth(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::None => req,
            Auth::Bearer(token) => req.bearer_auth(token),
            Auth::Basic { user, password } => req.basic_auth(user, Some(password)),
        }
    }

    fn send(
        &self,
        method: &'static str,
        req: RequestBuilder,
        url: &Url,
    ) -> Result<String, HttpError> {
        tracing::debug!(%method, %url, "sending request");
        let resp: Response = self
            .apply_auth(req)
            .send()
            .map_err(|e| HttpError::Transport {
                url: url.to_string(),
                source: e,
            })?;
        let status = resp.status();
        let body = resp.text().map_err(|e| HttpError::Transport {
            url: url.to_string(),
            source: e,
        })?;
        if !status.is_success() {
            return Err(HttpError::Status {
                method,
                url: url.to_string(),
                status,
                body,
            });
        }
        Ok(body)
    }

    fn decode<T: DeserializeOwned>(url: &Url, body: &str) -> Result<T, HttpError> {
        serde_json::from_str(body).map_err(|e| HttpError::Decode {
            url: url.to_string(),
            source: e,
        })
    }

    /// GET `path` and decode the JSON response into `T`.
    pub fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        let url = self.url(path)?;
        let req = self.client.get(url.clone()).header("Accept", "application/json");
        let body = self.send("GET", req, &url)?;
        Self::decode(&url, &body)
    }

    /// GET `path` and return the raw response body.
    pub fn get_text(&self, path: &str) -> Result<String, HttpError> {
        let url = self.url(path)?;
        let req = self.client.get(url.clone());
        self.send("GET", req, &url)
    }

    /// GET `path` and return the status code without treating non-2xx as an
    /// error. Used by readiness probes: a 401 or 503 still proves the server
    /// is answering HTTP.
    pub fn probe(&self, path: &str) -> Result<StatusCode, HttpError> {
        let url = self.url(path)?;
        let resp = self
            .apply_auth(self.client.get(url.clone()))
            .send()
            .map_err(|e| HttpError::Transport {
                url: url.to_string(),
                source: e,
            })?;
        Ok(resp.status())
    }

    /// POST a JSON `body` to `path` and decode the JSON response into `T`.
    pub fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        let url = self.url(path)?;
        let req = self
            .client
            .post(url.clone())
            .header("Accept", "application/json")
            .json(body);
        let body = self.send("POST", req, &url)?;
        Self::decode(&url, &body)
    }

    /// PUT with an empty body to `path` and decode the JSON response into
    /// `T`. BuildKite's rebuild endpoint is a bodyless PUT that returns the
    /// new build.
    pub fn put_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        let url = self.url(path)?;
        let req = self
            .client
            .put(url.clone())
            .header("Accept", "application/json");
        let body = self.send("PUT", req, &url)?;
        Self::decode(&url, &body)
    }

    /// PUT a plain-text `body` to `path` and return the raw response body.
    /// TeamCity attribute endpoints (`/agents/id:N/authorized`) speak
    /// `text/plain`.
    pub fn put_text(&self, path: &str, body: &str) -> Result<String, HttpError> {
        let url = self.url(path)?;
        let req = self
            .client
            .put(url.clone())
            .header("Content-Type", "text/plain")
            .body(body.to_string());
        self.send("PUT", req, &url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_path_and_query() {
        let client = ApiClient::new("http://localhost:8111", Auth::None).unwrap();
        let url = client
            .url("/app/rest/agents?locator=authorized:false,defaultFilter:false")
            .unwrap();
        assert_eq!(url.path(), "/app/rest/agents");
        assert_eq!(url.query(), Some("locator=authorized:false,defaultFilter:false"));
    }

    #[test]
    fn test_url_join_keeps_host() {
        let client =
            ApiClient::new("https://api.buildkite.com", Auth::Bearer("tok".into())).unwrap();
        let url = client
            .url("/v2/organizations/acme/pipelines?page=2")
            .unwrap();
        assert_eq!(url.host_str(), Some("api.buildkite.com"));
        assert_eq!(url.path(), "/v2/organizations/acme/pipelines");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = ApiClient::new("not a url", Auth::None).unwrap_err();
        assert!(matches!(err, HttpError::InvalidUrl { .. }));
    }

    #[test]
    fn test_status_error_display_includes_body() {
        let err = HttpError::Status {
            method: "PUT",
            url: "http://localhost:8111/app/rest/users".to_string(),
            status: StatusCode::FORBIDDEN,
            body: "Access denied".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("Access denied"));
    }
}
