//! HTTP transport shared by the session manager and the API client.
//!
//! Owns the `reqwest` client and base URL, decorates requests with the
//! `Authorization: Token <value>` header, and classifies responses into the
//! crate's error taxonomy.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::auth::Token;
use crate::config::ClientConfig;
use crate::error::{Error, FieldErrors, Result};
use crate::util::{compact_text, is_http_url, normalize_text_option};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.require_api_base_url()?, config.http_timeout())
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an API path such as `api/v1/notes/` against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|error| Error::InvalidConfiguration(format!("invalid endpoint {path}: {error}")))
    }

    /// Resolve a continuation URL returned by the server.
    ///
    /// The cursor must point at the configured origin so the token is never
    /// sent to another host.
    pub fn resolve_cursor(&self, cursor: &str) -> Result<Url> {
        let url = self
            .base_url
            .join(cursor)
            .map_err(|error| Error::MalformedResponse(format!("invalid cursor URL: {error}")))?;
        if url.origin() != self.base_url.origin() {
            return Err(Error::MalformedResponse(format!(
                "cursor URL points at a different origin: {}",
                url.origin().ascii_serialization()
            )));
        }
        Ok(url)
    }

    pub fn request(&self, method: Method, url: Url, token: Option<&Token>) -> RequestBuilder {
        let request = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, token.header_value()),
            None => request,
        }
    }

    /// Send `request` and decode a 2xx JSON body into `T`.
    pub async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        decode_response(response).await
    }
}

pub(crate) async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(classify_status(status, &body));
    }
    serde_json::from_str(&body).map_err(|error| {
        Error::MalformedResponse(format!("{error} in body: {}", compact_text(&body)))
    })
}

/// Map a non-2xx status and its body to an error.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::BAD_REQUEST => Error::Validation(parse_field_errors(body)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(parse_api_error(status, body)),
        StatusCode::CONFLICT => Error::Conflict,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            Error::Transient(parse_api_error(status, body))
        }
        status if status.is_server_error() => Error::Transient(parse_api_error(status, body)),
        _ => Error::Rejected(parse_api_error(status, body)),
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.detail.or(payload.message).or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

/// Parse DRF-style field errors.
///
/// Accepts both `{"errors": {"field": ["msg"]}}` and a bare
/// `{"field": ["msg"]}` object; anything else lands under `non_field_errors`.
pub(crate) fn parse_field_errors(body: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        let trimmed = compact_text(body);
        if !trimmed.is_empty() {
            errors.insert("non_field_errors".to_string(), vec![trimmed]);
        }
        return errors;
    };

    let fields = value.get("errors").unwrap_or(&value);
    match fields {
        serde_json::Value::Object(map) => {
            for (field, messages) in map {
                errors.insert(field.clone(), messages_of(messages));
            }
        }
        other => {
            errors.insert("non_field_errors".to_string(), messages_of(other));
        }
    }
    errors
}

fn messages_of(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::String(message) => vec![message.clone()],
        serde_json::Value::Array(items) => items.iter().flat_map(messages_of).collect(),
        serde_json::Value::Object(map) => map.values().flat_map(messages_of).collect(),
        serde_json::Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

fn normalize_base_url(raw: String) -> Result<Url> {
    let raw = normalize_text_option(Some(raw)).ok_or_else(|| {
        Error::InvalidConfiguration("API base URL must not be empty".to_string())
    })?;
    if !is_http_url(&raw) {
        return Err(Error::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    // A trailing slash makes `Url::join` append rather than replace the last segment.
    let with_slash = format!("{}/", raw.trim_end_matches('/'));
    Url::parse(&with_slash)
        .map_err(|error| Error::InvalidConfiguration(format!("invalid API base URL: {error}")))
}
