use std::time::Duration;

use mockall::automock;
use reqwest::{blocking::Response, header::AUTHORIZATION, Method};
use serde_derive::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::{DocumentTitle, RemoteUpdate, Timestamp};

pub const DEFAULT_CLIENT_TIMEOUT: u64 = 30;
pub const UPLOAD_ROUTE: &str = "upload";
pub const PULL_ROUTE: &str = "pull";

/// Network or status failure. Recoverable : next edit or next tick will retry.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Connection error")]
    ConnectionError,
    #[error("Timeout error")]
    TimeoutError,
    #[error("Unexpected response status {0} : '{1}'")]
    UnexpectedStatus(u16, String),
    #[error("Unknown error: `{0}`")]
    Unknown(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() {
            return Self::ConnectionError;
        }

        if error.is_timeout() {
            return Self::TimeoutError;
        }

        Self::Unknown(error.to_string())
    }
}

/// Remote answered something which don't respect the protocol
#[derive(Debug, Clone, Error)]
#[error("Invalid response: `{0}` (`{1}`)")]
pub struct ProtocolError(pub String, pub Value);

#[derive(Debug, Clone, Error)]
pub enum PullError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// One element of the pulled `updates` sequence, not validated yet
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntry(pub Value);

impl RemoteEntry {
    pub fn update(&self) -> Result<RemoteUpdate, ProtocolError> {
        let data = self.0.as_object().ok_or(ProtocolError(
            "Update is not an object".to_string(),
            self.0.clone(),
        ))?;
        let title = data
            .get("title")
            .and_then(Value::as_str)
            .map(DocumentTitle::from)
            .filter(DocumentTitle::is_valid)
            .ok_or(ProtocolError(
                "Update title is missing or can't be used as document title".to_string(),
                self.0.clone(),
            ))?;
        let content = data
            .get("content")
            .and_then(Value::as_str)
            .ok_or(ProtocolError(
                "Update content is missing or is not a string".to_string(),
                self.0.clone(),
            ))?;
        let timestamp = data
            .get("timestamp")
            .and_then(timestamp_value)
            .ok_or(ProtocolError(
                "Update timestamp is missing or is not a positive number".to_string(),
                self.0.clone(),
            ))?;

        Ok(RemoteUpdate {
            title,
            content: content.to_string(),
            timestamp,
        })
    }
}

fn timestamp_value(value: &Value) -> Option<Timestamp> {
    if let Some(value) = value.as_u64() {
        return Some(Timestamp(value));
    }

    // Some remotes produce milliseconds as float
    value
        .as_f64()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .map(|value| Timestamp(value as u64))
}

/// Extract `updates` sequence from a pull response body
pub fn pull_entries(body: Value) -> Result<Vec<RemoteEntry>, ProtocolError> {
    match body.get("updates") {
        Some(Value::Array(updates)) => Ok(updates.iter().cloned().map(RemoteEntry).collect()),
        Some(_) => Err(ProtocolError(
            "Response updates is not an array".to_string(),
            body.clone(),
        )),
        None => Err(ProtocolError(
            "Response is missing updates array".to_string(),
            body.clone(),
        )),
    }
}

#[automock]
pub trait RemoteClient {
    /// Upload one document. The caller choose the timestamp (typically now)
    /// to be able to use it as watermark candidate.
    fn push(
        &self,
        title: &DocumentTitle,
        content: &str,
        timestamp: Timestamp,
    ) -> Result<(), TransportError>;
    /// Fetch updates with a timestamp strictly greater than `since`
    fn pull(&self, since: Timestamp) -> Result<Vec<RemoteEntry>, PullError>;
}

#[derive(Serialize, Debug)]
struct PushBody<'a> {
    vault: &'a str,
    title: &'a str,
    content: &'a str,
    timestamp: Timestamp,
}

#[derive(Clone)]
pub struct HttpRemote {
    server_url: String,
    collection: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl HttpRemote {
    pub fn new(
        server_url: String,
        collection: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            server_url,
            collection,
            api_key,
            client,
        })
    }

    pub fn url(&self, suffix: &str) -> String {
        format!("{}/{}", self.server_url.trim_end_matches('/'), suffix)
    }

    fn response_error(&self, response: Response) -> TransportError {
        let status_code = response.status().as_u16();
        let text = response.text().unwrap_or_default();
        TransportError::UnexpectedStatus(status_code, text)
    }
}

impl RemoteClient for HttpRemote {
    fn push(
        &self,
        title: &DocumentTitle,
        content: &str,
        timestamp: Timestamp,
    ) -> Result<(), TransportError> {
        let body = PushBody {
            vault: &self.collection,
            title: &title.0,
            content,
            timestamp,
        };
        let response = self
            .client
            .request(Method::POST, self.url(UPLOAD_ROUTE))
            .header(AUTHORIZATION, &self.api_key)
            .json(&body)
            .send()?;

        if !response.status().is_success() {
            return Err(self.response_error(response));
        }

        Ok(())
    }

    fn pull(&self, since: Timestamp) -> Result<Vec<RemoteEntry>, PullError> {
        let response = self
            .client
            .request(Method::GET, self.url(PULL_ROUTE))
            .query(&[("vault", self.collection.clone()), ("since", since.to_string())])
            .header(AUTHORIZATION, &self.api_key)
            .send()
            .map_err(TransportError::from)?;

        if !response.status().is_success() {
            return Err(self.response_error(response).into());
        }

        let text = response.text().map_err(TransportError::from)?;
        let body = serde_json::from_str::<Value>(&text).map_err(|error| {
            ProtocolError(
                format!("Response body is not json : {}", error),
                Value::String(text.clone()),
            )
        })?;

        Ok(pull_entries(body)?)
    }
}
