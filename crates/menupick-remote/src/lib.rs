// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use menupick_app::{Record, RecordId, RecordStore, StoreError, StoreResult};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const FOOD_PATH: &str = "food";
const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Blocking client for the hosted `/food` endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("remote.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("remote.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "remote.base_url {base_url:?} uses scheme {:?}; use http or https",
                parsed.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_owned);

        Ok(Self {
            endpoint: format!("{base_url}/{FOOD_PATH}"),
            base_url,
            api_key,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Checks that the endpoint answers a list request.
    pub fn ping(&self) -> Result<()> {
        let count = self
            .fetch_all()
            .with_context(|| format!("ping {}", self.endpoint))?
            .len();
        debug!(endpoint = %self.endpoint, records = count, "remote reachable");
        Ok(())
    }

    pub fn fetch_all(&self) -> StoreResult<Vec<Record>> {
        let response = self.send(self.http.get(&self.endpoint))?;
        let response = self.check(response, Intent::List)?;
        let mut records: Vec<WireRecord> = response
            .json()
            .map_err(|error| StoreError::transport(format!("decode dish list: {error}")))?;
        records.sort_by_key(|record| record.id);
        Ok(records.into_iter().map(Record::from).collect())
    }

    pub fn create(&self, name: &str) -> StoreResult<Record> {
        let request = self.http.post(&self.endpoint).json(&NameBody { name });
        let response = self.send(request)?;
        let response = self.check(response, Intent::Insert { name })?;
        decode_record(response)
    }

    pub fn rename(&self, id: RecordId, name: &str) -> StoreResult<Record> {
        let request = self.http.put(&self.endpoint).json(&UpdateBody {
            id: id.get(),
            name,
        });
        let response = self.send(request)?;
        let response = self.check(response, Intent::Update { id, name })?;
        decode_record(response)
    }

    pub fn remove(&self, id: RecordId) -> StoreResult<()> {
        let request = self
            .http
            .delete(&self.endpoint)
            .json(&IdBody { id: id.get() });
        let response = self.send(request)?;
        self.check(response, Intent::Delete { id })?;
        Ok(())
    }

    fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let request = match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        };
        request.send().map_err(|error| {
            warn!(endpoint = %self.endpoint, %error, "remote unreachable");
            StoreError::Transport(connection_error(&self.base_url, &error))
        })
    }

    fn check(&self, response: Response, intent: Intent<'_>) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        let error = classify_failure(status, &body, intent);
        warn!(status = status.as_u16(), %error, "remote call rejected");
        Err(error)
    }
}

impl RecordStore for Client {
    fn list(&mut self) -> StoreResult<Vec<Record>> {
        self.fetch_all()
    }

    fn insert(&mut self, name: &str) -> StoreResult<Record> {
        self.create(name)
    }

    fn update(&mut self, id: RecordId, name: &str) -> StoreResult<Record> {
        self.rename(id, name)
    }

    fn delete(&mut self, id: RecordId) -> StoreResult<()> {
        self.remove(id)
    }
}

#[derive(Debug, Clone, Copy)]
enum Intent<'a> {
    List,
    Insert { name: &'a str },
    Update { id: RecordId, name: &'a str },
    Delete { id: RecordId },
}

impl Intent<'_> {
    const fn target(self) -> Option<RecordId> {
        match self {
            Self::Update { id, .. } | Self::Delete { id } => Some(id),
            Self::List | Self::Insert { .. } => None,
        }
    }
}

fn classify_failure(status: StatusCode, body: &str, intent: Intent<'_>) -> StoreError {
    let written_name = match intent {
        Intent::Insert { name } | Intent::Update { name, .. } => Some(name),
        Intent::List | Intent::Delete { .. } => None,
    };

    if let Some(name) = written_name
        && (status == StatusCode::CONFLICT || is_unique_violation(body))
    {
        return StoreError::DuplicateName {
            name: name.to_owned(),
        };
    }

    if status == StatusCode::NOT_FOUND
        && let Some(id) = intent.target()
    {
        return StoreError::NotFound { id };
    }

    StoreError::Transport(clean_error_response(status, body))
}

fn is_unique_violation(body: &str) -> bool {
    body.contains(UNIQUE_VIOLATION_CODE) || body.contains("duplicate key value")
}

fn connection_error(base_url: &str, error: &reqwest::Error) -> String {
    if error.is_timeout() {
        return format!("{base_url} timed out -- raise remote.timeout or check the network");
    }
    format!("cannot reach {base_url} -- check remote.base_url and your connection ({error})")
}

fn clean_error_response(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.message()
    {
        return format!("server error ({}): {}", status.as_u16(), message);
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return format!("server error ({}): {}", status.as_u16(), body.trim());
    }

    format!("server returned {}", status.as_u16())
}

fn decode_record(response: Response) -> StoreResult<Record> {
    response
        .json::<WireRecord>()
        .map(Record::from)
        .map_err(|error| StoreError::transport(format!("decode dish: {error}")))
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    id: i64,
    name: String,
}

impl From<WireRecord> for Record {
    fn from(wire: WireRecord) -> Self {
        Record::new(wire.id, wire.name)
    }
}

#[derive(Debug, Serialize)]
struct NameBody<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateBody<'a> {
    id: i64,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct IdBody {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorField>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Text(String),
    Detail { message: String },
}

impl ErrorEnvelope {
    fn message(self) -> Option<String> {
        let text = match self.error {
            Some(ErrorField::Text(text)) => Some(text),
            Some(ErrorField::Detail { message }) => Some(message),
            None => self.message,
        };
        text.filter(|text| !text.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::{Client, Intent, classify_failure, clean_error_response};
    use menupick_app::{RecordId, StoreError};
    use reqwest::StatusCode;
    use std::time::Duration;

    #[test]
    fn conflict_and_unique_code_mean_duplicate() {
        let insert = Intent::Insert { name: "Soup" };
        let duplicate = StoreError::DuplicateName {
            name: "Soup".to_owned(),
        };
        assert_eq!(classify_failure(StatusCode::CONFLICT, "", insert), duplicate);
        assert_eq!(
            classify_failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error":"duplicate key value violates unique constraint \"foods_name_key\""}"#,
                insert,
            ),
            duplicate
        );
        assert_eq!(
            classify_failure(
                StatusCode::BAD_REQUEST,
                r#"{"code":"23505","message":"conflict"}"#,
                insert,
            ),
            duplicate
        );
    }

    #[test]
    fn not_found_needs_a_target() {
        let id = RecordId::new(4);
        assert_eq!(
            classify_failure(StatusCode::NOT_FOUND, "", Intent::Delete { id }),
            StoreError::NotFound { id }
        );
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, "", Intent::List),
            StoreError::Transport(_)
        ));
    }

    #[test]
    fn error_bodies_are_cleaned() {
        assert_eq!(
            clean_error_response(StatusCode::BAD_REQUEST, r#"{"error":"Name is required"}"#),
            "server error (400): Name is required"
        );
        assert_eq!(
            clean_error_response(
                StatusCode::BAD_GATEWAY,
                r#"{"error":{"message":"upstream down"}}"#
            ),
            "server error (502): upstream down"
        );
        assert_eq!(
            clean_error_response(StatusCode::SERVICE_UNAVAILABLE, "maintenance"),
            "server error (503): maintenance"
        );
        assert_eq!(
            clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, "{\"weird\":true}"),
            "server returned 500"
        );
    }

    #[test]
    fn new_rejects_bad_base_urls() {
        let timeout = Duration::from_secs(1);
        assert!(Client::new("", None, timeout).is_err());
        assert!(Client::new("not a url", None, timeout).is_err());
        assert!(Client::new("ftp://example.com", None, timeout).is_err());

        let client = Client::new("https://menu.example.com/api/", Some("  "), timeout)
            .expect("valid url");
        assert_eq!(client.endpoint(), "https://menu.example.com/api/food");
        assert!(!client.has_api_key());
    }
}
