//! Signed HTTP transport with bounded retries and cursor pagination.
//!
//! [`Transport`] performs one authenticated call per invocation: it builds
//! the canonical string for the request, signs it (or attaches the session
//! token after a login), sends it with a bounded attempt loop, and returns
//! the parsed JSON body or a structured error.
//!
//! Retry policy: a fixed number of attempts with a constant sleep between
//! them. A timed-out attempt doubles the per-request timeout for the next
//! one. Statuses 400, 401, 403, 404 and 413 are permanent and never retried.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::{Body, Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, DATE};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::{Result, TesseraError};
use crate::sign;

/// Statuses that fail a call immediately, with no further attempts.
const PERMANENT_STATUSES: [u16; 5] = [400, 401, 403, 404, 413];

/// Request body variants.
enum Payload<'a> {
    None,
    Json(Vec<u8>),
    Stream(&'a File),
}

impl Payload<'_> {
    /// Content type sent and signed for this body, empty when bodyless.
    fn content_type(&self) -> &'static str {
        match self {
            Payload::None => "",
            Payload::Json(_) => "application/json",
            Payload::Stream(_) => "application/octet-stream",
        }
    }
}

/// Signed, retrying HTTP transport for one API host.
pub struct Transport {
    http: Client,
    config: Config,
    session: Option<String>,
}

impl Transport {
    /// Create a transport for the configured host.
    pub fn new(config: Config) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| TesseraError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            config,
            session: None,
        })
    }

    /// The configuration this transport was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Switch to session authentication with `token`, or back to request
    /// signing with `None`.
    pub fn set_session(&mut self, token: Option<String>) {
        self.session = token;
    }

    /// The current session token, if session authentication is active.
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// GET `path` with query parameters and return the parsed body.
    pub fn get(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        self.send(Method::GET, path, params, Payload::None)
    }

    /// DELETE `path` with query parameters and return the parsed body.
    pub fn delete(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        self.send(Method::DELETE, path, params, Payload::None)
    }

    /// POST a JSON body to `path` and return the parsed response body.
    pub fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let bytes = serde_json::to_vec(body)?;
        self.send(Method::POST, path, &[], Payload::Json(bytes))
    }

    /// PUT a JSON body to `path` and return the parsed response body.
    pub fn put(&self, path: &str, body: &Value) -> Result<Value> {
        let bytes = serde_json::to_vec(body)?;
        self.send(Method::PUT, path, &[], Payload::Json(bytes))
    }

    /// POST a raw byte stream to `path` and return the parsed response body.
    ///
    /// The file is hashed in chunks for the signature, rewound, and streamed
    /// as `application/octet-stream`.
    pub fn post_stream(&self, path: &str, file: &File) -> Result<Value> {
        self.send(Method::POST, path, &[], Payload::Stream(file))
    }

    /// Iterate over every page of a listing call.
    ///
    /// The first request carries `params`; each page's `next_page_uri` is
    /// followed with empty parameters (they are already embedded in the URI)
    /// until it comes back null or absent. The iterator is lazy, finite and
    /// not restartable; it ends after yielding an error.
    pub fn pages(&self, path: &str, params: &[(String, String)]) -> Pages<'_> {
        Pages {
            transport: self,
            next: Some(path.to_string()),
            params: params.to_vec(),
        }
    }

    fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        payload: Payload<'_>,
    ) -> Result<Value> {
        let (url, canonical_uri) = self.build_url(path, params)?;
        let checksum = match &payload {
            Payload::None => String::new(),
            Payload::Json(bytes) => sign::body_checksum(bytes),
            Payload::Stream(file) => {
                let mut reader = file.try_clone()?;
                sign::stream_checksum(&mut reader)?
            }
        };
        let date = sign::http_date(Utc::now());
        let headers = self.build_headers(&method, &checksum, &payload, &date, &canonical_uri)?;

        let attempts = self.config.retries.max(1);
        let mut timeout = self.config.timeout();
        let mut last_failure: Option<TesseraError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                std::thread::sleep(self.config.retry_interval());
            }
            let request = self.build_request(method.clone(), &url, &headers, &payload, timeout)?;
            match request.send() {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if status == 200 {
                        debug!(%method, uri = %canonical_uri, attempt, "request succeeded");
                        return response
                            .json()
                            .map_err(|e| TesseraError::Response(format!("invalid JSON body: {}", e)));
                    }
                    let body = response.text().unwrap_or_default();
                    let error = TesseraError::from_response(status, &body);
                    if PERMANENT_STATUSES.contains(&status) {
                        debug!(%method, uri = %canonical_uri, status, "permanent failure");
                        return Err(error);
                    }
                    debug!(%method, uri = %canonical_uri, status, attempt, "retryable failure");
                    last_failure = Some(error);
                }
                Err(err) => {
                    if err.is_timeout() {
                        timeout *= 2;
                        debug!(
                            %method,
                            uri = %canonical_uri,
                            attempt,
                            next_timeout_ms = timeout.as_millis() as u64,
                            "attempt timed out, doubling timeout"
                        );
                    } else {
                        debug!(%method, uri = %canonical_uri, attempt, error = %err, "transport failure");
                    }
                    last_failure = Some(TesseraError::transport(err.to_string()));
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| TesseraError::transport("no attempts were made")))
    }

    /// Resolve `path` against the configured host and append `params`,
    /// returning the full URL and the canonical path-plus-query to sign.
    fn build_url(&self, path: &str, params: &[(String, String)]) -> Result<(Url, String)> {
        let base = Url::parse(&self.config.base_url())
            .map_err(|e| TesseraError::Config(format!("invalid host {:?}: {}", self.config.host, e)))?;
        let mut url = base
            .join(path)
            .map_err(|e| TesseraError::Config(format!("invalid request path {:?}: {}", path, e)))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        let canonical_uri = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        Ok((url, canonical_uri))
    }

    fn build_headers(
        &self,
        method: &Method,
        checksum: &str,
        payload: &Payload<'_>,
        date: &str,
        canonical_uri: &str,
    ) -> Result<HeaderMap> {
        let content_type = payload.content_type();
        let mut headers = HeaderMap::new();
        headers.insert(DATE, header_value(date)?);

        match &self.session {
            Some(token) => {
                headers.insert(HeaderName::from_static("x-session-id"), header_value(token)?);
            }
            None => {
                let canonical = sign::canonical_string(
                    method.as_str(),
                    checksum,
                    content_type,
                    date,
                    canonical_uri,
                );
                let signature = sign::signature(&canonical, &self.config.secret_key);
                let auth = format!("GEO {}:{}", self.config.key_id, signature);
                headers.insert(AUTHORIZATION, header_value(&auth)?);
            }
        }

        if !matches!(payload, Payload::None) {
            headers.insert(HeaderName::from_static("content-sha"), header_value(checksum)?);
            headers.insert(CONTENT_TYPE, header_value(content_type)?);
        }

        if let (Some(key_id), Some(key)) = (&self.config.sharing_key_id, &self.config.sharing_key)
        {
            headers.insert(
                HeaderName::from_static("x-user-api-key-id"),
                header_value(key_id)?,
            );
            headers.insert(
                HeaderName::from_static("x-user-api-sharing-key"),
                header_value(key)?,
            );
        }

        Ok(headers)
    }

    fn build_request(
        &self,
        method: Method,
        url: &Url,
        headers: &HeaderMap,
        payload: &Payload<'_>,
        timeout: Duration,
    ) -> Result<RequestBuilder> {
        let builder = self
            .http
            .request(method, url.clone())
            .headers(headers.clone())
            .timeout(timeout);
        Ok(match payload {
            Payload::None => builder,
            Payload::Json(bytes) => builder.body(bytes.clone()),
            Payload::Stream(file) => {
                // Each attempt resends from the start of the stream.
                let mut reader = file.try_clone()?;
                reader.seek(SeekFrom::Start(0))?;
                let len = reader.metadata()?.len();
                builder.body(Body::sized(reader, len))
            }
        })
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| TesseraError::Config(format!("invalid header value: {}", e)))
}

/// Lazy iterator over the pages of a listing call.
///
/// Created by [`Transport::pages`]. Yields each page's parsed body in turn;
/// a null or absent `next_page_uri` ends the sequence.
pub struct Pages<'a> {
    transport: &'a Transport,
    next: Option<String>,
    params: Vec<(String, String)>,
}

impl Iterator for Pages<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.next.take()?;
        let params = std::mem::take(&mut self.params);
        match self.transport.get(&path, &params) {
            Ok(page) => {
                self.next = page
                    .get("next_page_uri")
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                Some(Ok(page))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> Transport {
        Transport::new(Config::new("api.tessera.io:443", "key_id", "secret")).unwrap()
    }

    #[test]
    fn test_build_url_without_params() {
        let t = transport();
        let (url, canonical) = t.build_url("/geo/1/layers", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.tessera.io/geo/1/layers");
        assert_eq!(canonical, "/geo/1/layers");
    }

    #[test]
    fn test_build_url_with_params() {
        let t = transport();
        let params = vec![
            ("name__exact".to_string(), "alpha".to_string()),
            ("slice_start".to_string(), "1".to_string()),
        ];
        let (url, canonical) = t.build_url("/geo/1/layers", &params).unwrap();
        assert_eq!(canonical, "/geo/1/layers?name__exact=alpha&slice_start=1");
        assert!(url.as_str().ends_with(canonical.as_str()));
    }

    #[test]
    fn test_build_url_keeps_embedded_query() {
        // Next-page URIs arrive with their query already embedded.
        let t = transport();
        let (_, canonical) = t
            .build_url("/geo/1/layers?page=1&page_size=2", &[])
            .unwrap();
        assert_eq!(canonical, "/geo/1/layers?page=1&page_size=2");
    }

    #[test]
    fn test_build_url_encodes_param_values() {
        let t = transport();
        let params = vec![(
            "date_created__lte".to_string(),
            "2002-12-25 00:00:00-00:00".to_string(),
        )];
        let (url, canonical) = t.build_url("/geo/1/layers", &params).unwrap();
        // The signed form is exactly the form sent.
        assert!(url.as_str().ends_with(canonical.as_str()));
        assert!(!canonical.contains(' '));
    }

    #[test]
    fn test_http_scheme_for_non_443_port() {
        let t = Transport::new(Config::new("localhost:8000", "k", "s")).unwrap();
        let (url, _) = t.build_url("/geo/1/layers", &[]).unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn test_permanent_statuses() {
        for status in [400, 401, 403, 404, 413] {
            assert!(PERMANENT_STATUSES.contains(&status));
        }
        assert!(!PERMANENT_STATUSES.contains(&500));
        assert!(!PERMANENT_STATUSES.contains(&429));
    }
}
