//! Conditional fetch of the remote rule list

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use bl_core::Freshness;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use reqwest::StatusCode;

use crate::error::FetchError;

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
/// Obsolete RFC 850 form, e.g. `Sunday, 06-Nov-94 08:49:37 GMT`.
const RFC850_DATE_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S GMT";
/// asctime form, e.g. `Sun Nov  6 08:49:37 1994`.
const ASCTIME_DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Result of a conditional fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The server answered `304 Not Modified`.
    NotModified,
    /// A fresh body. `last_modified` is `None` when the header was absent or
    /// unparseable.
    Modified {
        body: String,
        last_modified: Option<Freshness>,
    },
}

/// Source of rule list updates.
pub trait RemoteSource: Send + Sync {
    fn fetch(&self, if_modified_since: Option<Freshness>) -> Result<FetchOutcome, FetchError>;
}

impl<T: RemoteSource + ?Sized> RemoteSource for Arc<T> {
    fn fetch(&self, if_modified_since: Option<Freshness>) -> Result<FetchOutcome, FetchError> {
        (**self).fetch(if_modified_since)
    }
}

/// HTTP rule source using a blocking client.
///
/// The client is built on first fetch, so a broken transport only fails
/// refreshes and never the rules already loaded.
pub struct HttpSource {
    client: OnceLock<Client>,
    timeout: Duration,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: OnceLock::new(),
            timeout,
            url: url.into(),
        }
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        let source = Self::new(url, Duration::ZERO);
        let _ = source.client.set(client);
        source
    }

    fn client(&self) -> Result<&Client, FetchError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let built = Client::builder().timeout(self.timeout).build()?;
        Ok(self.client.get_or_init(|| built))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RemoteSource for HttpSource {
    fn fetch(&self, if_modified_since: Option<Freshness>) -> Result<FetchOutcome, FetchError> {
        let mut request = self.client()?.get(&self.url);
        if let Some(since) = if_modified_since {
            request = request.header(IF_MODIFIED_SINCE, format_http_date(since));
        }

        let response = request.send()?;
        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_http_date);
        let body = response.text()?;

        Ok(FetchOutcome::Modified { body, last_modified })
    }
}

pub fn format_http_date(timestamp: Freshness) -> String {
    timestamp.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date in any of the three forms HTTP/1.1 allows.
pub fn parse_http_date(value: &str) -> Option<Freshness> {
    let value = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc2822(value) {
        return Some(timestamp.with_timezone(&Utc));
    }

    [RFC850_DATE_FORMAT, ASCTIME_DATE_FORMAT]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|timestamp| timestamp.and_utc())
}
