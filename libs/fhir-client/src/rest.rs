//! HTTP implementation of [`FhirClient`] on top of reqwest

use crate::client::FhirClient;
use crate::error::{Error, Result};
use crate::models::{Bundle, SearchParams};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

const FHIR_JSON: &str = "application/fhir+json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection options for [`RestClient`].
#[derive(Debug, Clone)]
pub struct RestClientOptions {
    pub timeout: Duration,
    /// Sent as `Authorization: Bearer <token>` when set.
    pub bearer_token: Option<String>,
}

impl Default for RestClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            bearer_token: None,
        }
    }
}

/// FHIR REST client speaking JSON to a single endpoint.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl RestClient {
    /// Create a client with default options.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_options(base_url, RestClientOptions::default())
    }

    pub fn with_options(base_url: impl Into<String>, options: RestClientOptions) -> Result<Self> {
        let base_url = normalize_base_url(&base_url.into())?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(FHIR_JSON));

        let client = Client::builder()
            .timeout(options.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url,
            bearer_token: options.bearer_token,
        })
    }

    /// `[base]/[type]` or `[base]/[type]/[id]`.
    pub fn resource_url(&self, resource_type: &str, id: Option<&str>) -> Result<String> {
        validate_segment("resource type", resource_type)?;
        match id {
            Some(id) => {
                validate_segment("resource id", id)?;
                Ok(format!("{}/{}/{}", self.base_url, resource_type, id))
            }
            None => Ok(format!("{}/{}", self.base_url, resource_type)),
        }
    }

    /// `[base]/[type]?query`
    pub fn search_url(&self, resource_type: &str, params: &SearchParams) -> Result<String> {
        let mut url = self.resource_url(resource_type, None)?;
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.to_query_string());
        }
        Ok(url)
    }

    /// Resolve a server-supplied URL (paging link, `Location` header) against
    /// the base URL. Absolute URLs outside the base are refused so the bearer
    /// token never leaves this endpoint.
    pub fn resolve_url(&self, url: &str) -> Result<String> {
        let url = url.trim();
        if url.is_empty() || url.starts_with("//") {
            return Err(Error::InvalidUrl(format!("unusable server link: {:?}", url)));
        }

        if url.starts_with("http://") || url.starts_with("https://") {
            let inside = url
                .strip_prefix(self.base_url.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']));
            if !inside {
                return Err(Error::InvalidUrl(format!(
                    "link points outside {}: {}",
                    self.base_url, url
                )));
            }
            return Ok(url.to_string());
        }

        if url.starts_with('/') {
            return Ok(format!("{}{}", origin(&self.base_url), url));
        }
        Ok(format!("{}/{}", self.base_url, url))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.authorize(request).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// Write a resource and return the server's representation. Servers that
    /// ignore `Prefer: return=representation` and answer with an empty body
    /// get a follow-up read of the `Location` header.
    async fn write(&self, request: RequestBuilder, body: &Value) -> Result<Value> {
        let request = request
            .header(CONTENT_TYPE, FHIR_JSON)
            .header("Prefer", "return=representation")
            .body(serde_json::to_vec(body)?);

        let response = self.authorize(request).send().await?;
        let response = ensure_success(response).await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await?;

        if !text.trim().is_empty() {
            return Ok(serde_json::from_str(&text)?);
        }

        match location {
            Some(location) => {
                let location = self.resolve_url(&location).map_err(|err| {
                    Error::UnexpectedResponse(format!("unusable Location header: {}", err))
                })?;
                tracing::debug!(location = %location, "Empty write response, reading Location");
                self.send_json(self.client.get(&location)).await
            }
            None => Err(Error::UnexpectedResponse(
                "write returned neither a body nor a Location header".to_string(),
            )),
        }
    }
}

#[async_trait]
impl FhirClient for RestClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read(&self, resource_type: &str, id: &str) -> Result<Option<Value>> {
        let url = self.resource_url(resource_type, Some(id))?;
        tracing::debug!(url = %url, "FHIR read");

        let response = self.authorize(self.client.get(&url)).send().await?;
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Ok(None);
        }

        let response = ensure_success(response).await?;
        Ok(Some(response.json().await?))
    }

    async fn create(&self, resource_type: &str, resource: &Value) -> Result<Value> {
        let url = self.resource_url(resource_type, None)?;
        tracing::debug!(url = %url, "FHIR create");
        self.write(self.client.post(&url), resource).await
    }

    async fn update(&self, resource_type: &str, id: &str, resource: &Value) -> Result<Value> {
        let url = self.resource_url(resource_type, Some(id))?;
        tracing::debug!(url = %url, "FHIR update");
        self.write(self.client.put(&url), resource).await
    }

    async fn delete(&self, resource_type: &str, id: &str) -> Result<()> {
        let url = self.resource_url(resource_type, Some(id))?;
        tracing::debug!(url = %url, "FHIR delete");

        let response = self.authorize(self.client.delete(&url)).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn search(&self, resource_type: &str, params: &SearchParams) -> Result<Bundle> {
        let url = self.search_url(resource_type, params)?;
        tracing::debug!(url = %url, "FHIR search");
        self.send_json(self.client.get(&url)).await
    }

    async fn fetch_page(&self, url: &str) -> Result<Bundle> {
        let url = self.resolve_url(url)?;
        tracing::debug!(url = %url, "FHIR page");
        self.send_json(self.client.get(&url)).await
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(|| {
            Error::InvalidUrl(format!("base URL must be absolute http(s): {}", raw))
        })?;
    if host.is_empty() {
        return Err(Error::InvalidUrl(format!("base URL has no host: {}", raw)));
    }
    Ok(trimmed.to_string())
}

/// `scheme://authority` of a normalized base URL.
fn origin(base_url: &str) -> &str {
    let authority_start = base_url.find("://").map_or(0, |i| i + 3);
    match base_url[authority_start..].find('/') {
        Some(i) => &base_url[..authority_start + i],
        None => base_url,
    }
}

fn validate_segment(what: &str, segment: &str) -> Result<()> {
    if segment.is_empty() || segment.contains(['/', '?', '#']) {
        return Err(Error::InvalidUrl(format!("invalid {}: {:?}", what, segment)));
    }
    Ok(())
}

/// Turn a non-2xx response into [`Error::Status`], preferring the
/// diagnostics of an OperationOutcome body over the raw text.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = outcome_message(&body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body
        }
    });

    tracing::warn!(status = status.as_u16(), message = %message, "FHIR request failed");

    Err(Error::Status {
        status: status.as_u16(),
        message,
    })
}

fn outcome_message(body: &str) -> Option<String> {
    let outcome: Value = serde_json::from_str(body).ok()?;
    if outcome.get("resourceType")?.as_str()? != "OperationOutcome" {
        return None;
    }

    let messages: Vec<&str> = outcome
        .get("issue")?
        .as_array()?
        .iter()
        .filter_map(|issue| {
            issue
                .get("diagnostics")
                .or_else(|| issue.get("details").and_then(|d| d.get("text")))
                .and_then(Value::as_str)
        })
        .collect();

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}
