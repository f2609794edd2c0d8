use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use reqwest::blocking::{RequestBuilder, Response, multipart};
use reqwest::header::{ACCEPT, CONTENT_DISPOSITION, HeaderMap};
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::form_urlencoded::{self, byte_serialize};

use crate::{ClientConfig, ClientError};

/// Blocking, authenticated JSON client for the ASTR REST API.
///
/// Every request carries the configured email/token pair as HTTP Basic
/// credentials. Paths are resolved against `<base_url>/api/`.
#[derive(Debug)]
pub struct AstrClient {
    config: ClientConfig,
    api_root: Url,
    http: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct UserProfile {
    firstname: String,
    lastname: String,
}

impl AstrClient {
    /// Creates a client from a resolved configuration. No request is sent.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let parsed = Url::parse(config.base_url())
            .map_err(|_| ClientError::InvalidBaseUrl(config.base_url().to_owned()))?;
        let api_root = ensure_trailing_slash(parsed)
            .join("api/")
            .map_err(|_| ClientError::InvalidBaseUrl(config.base_url().to_owned()))?;
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("astr-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| ClientError::transport(config.base_url(), error))?;

        Ok(Self {
            config,
            api_root,
            http,
        })
    }

    /// Creates a client entirely from `LIBASTR_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Creates a client from the given values, reading the environment for any left out.
    pub fn resolve(
        base_url: Option<&str>,
        email: Option<&str>,
        token: Option<&str>,
    ) -> Result<Self, ClientError> {
        Self::new(ClientConfig::resolve(
            base_url.map(str::to_owned),
            email.map(str::to_owned),
            token.map(str::to_owned),
        )?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends a `GET` request and parses the response as JSON.
    pub fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        self.request_json(Method::GET, path, None)
    }

    /// Sends a `GET` request with query parameters and parses the response as JSON.
    pub fn get_json_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        self.request_json_with_query(Method::GET, path, query, None)
    }

    /// Sends a `POST` request with a JSON body and parses the response as JSON.
    pub fn post_json(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        self.request_json(Method::POST, path, Some(body))
    }

    /// Sends a `PUT` request with a JSON body and parses the response as JSON.
    pub fn put_json(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        self.request_json(Method::PUT, path, Some(body))
    }

    /// Sends a `DELETE` request and parses the response as JSON.
    pub fn delete_json(&self, path: &str) -> Result<Value, ClientError> {
        self.request_json(Method::DELETE, path, None)
    }

    /// Sends a request and parses the response as JSON.
    pub fn request_json(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        self.request_json_with_query(method, path, &[], body)
    }

    /// Sends a request with query parameters and parses the response as JSON.
    ///
    /// Repeated keys in `query` become repeated parameters. Returns
    /// [`Value::Null`] for successful responses with an empty body.
    pub fn request_json_with_query(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        let mut request = self.prepare(method, path)?;

        if !query.is_empty() {
            request = request.query(query);
        }

        if let Some(json_body) = body {
            request = request.json(&json_body);
        }

        let response = self.send(request, path)?;
        let payload = response
            .text()
            .map_err(|error| ClientError::transport(path, error))?;

        if payload.trim().is_empty() {
            Ok(Value::Null)
        } else {
            Ok(serde_json::from_str(&payload)?)
        }
    }

    /// Streams the body of `GET path` into a local file.
    ///
    /// When `destination` is a directory the file is named after the
    /// `Content-Disposition` filename, or `fallback_name` when the server
    /// declares none. Either name is reduced to its last path component so
    /// the file always lands inside `destination`. Returns the path that was
    /// written.
    pub fn download(
        &self,
        path: &str,
        destination: &Path,
        fallback_name: &str,
    ) -> Result<PathBuf, ClientError> {
        let request = self.prepare(Method::GET, path)?;
        let mut response = self.send(request, path)?;

        let target = if destination.is_dir() {
            let name = attachment_name(response.headers())
                .or_else(|| bare_file_name(fallback_name).map(str::to_owned))
                .ok_or_else(|| ClientError::InvalidPath(fallback_name.to_owned()))?;
            destination.join(name)
        } else {
            destination.to_path_buf()
        };

        let mut file = File::create(&target).map_err(|error| ClientError::io(&target, error))?;
        let mut buffer = [0u8; 8192];
        let mut written = 0u64;
        loop {
            let read = response
                .read(&mut buffer)
                .map_err(|error| ClientError::transport(path, error))?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])
                .map_err(|error| ClientError::io(&target, error))?;
            written += read as u64;
        }
        file.flush().map_err(|error| ClientError::io(&target, error))?;

        debug!(path, target = %target.display(), bytes = written, "download complete");
        Ok(target)
    }

    /// Sends a multipart `POST` and returns the raw response text.
    pub fn upload(&self, path: &str, form: multipart::Form) -> Result<String, ClientError> {
        let request = self.prepare(Method::POST, path)?.multipart(form);
        let response = self.send(request, path)?;
        let text = response
            .text()
            .map_err(|error| ClientError::transport(path, error))?;
        debug!(path, "upload complete");
        Ok(text)
    }

    /// Returns `"<firstname> <lastname>"` of the authenticated user.
    pub fn username(&self) -> Result<String, ClientError> {
        let path = api_path(&["user", "email", self.config.email()]);
        let profile: UserProfile = serde_json::from_value(self.get_json(&path)?)?;
        Ok(format!("{} {}", profile.firstname, profile.lastname))
    }

    fn prepare(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self.build_url(path)?;
        debug!(%method, %url, "sending request");
        Ok(self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json")
            .basic_auth(self.config.email(), Some(self.config.token())))
    }

    fn send(&self, request: RequestBuilder, path: &str) -> Result<Response, ClientError> {
        let response = request
            .send()
            .map_err(|error| ClientError::transport(path, error))?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        warn!(path, %status, "request rejected by server");
        Err(ClientError::from_status(status, path, body))
    }

    fn build_url(&self, path: &str) -> Result<Url, ClientError> {
        let relative = path.trim_start_matches('/');
        self.api_root
            .join(relative)
            .map_err(|_| ClientError::InvalidPath(path.to_owned()))
    }
}

/// Joins path segments, percent-encoding each one.
pub(crate) fn api_path(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|segment| encode_path_segment(segment))
        .collect::<Vec<_>>()
        .join("/")
}

fn encode_path_segment(value: &str) -> String {
    // Form encoding writes spaces as '+'; a literal '+' is already escaped as %2B.
    byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Reduces a server-supplied name to its last path component.
///
/// Returns `None` for names such as `""`, `"."` or `".."` that do not name a file.
pub(crate) fn bare_file_name(name: &str) -> Option<&str> {
    Path::new(name)
        .file_name()?
        .to_str()
        .filter(|name| !name.is_empty())
}

/// Extracts a bare file name from a `Content-Disposition` header.
///
/// `filename*` (RFC 6266, UTF-8 only) wins over `filename`. Parameter names
/// are matched case-insensitively.
fn attachment_name(headers: &HeaderMap) -> Option<String> {
    let disposition = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    let params = disposition_params(disposition);
    let param = |wanted: &str| {
        params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(wanted))
            .map(|(_, value)| value.as_str())
    };

    let name = param("filename*")
        .and_then(decode_ext_value)
        .or_else(|| param("filename").map(str::to_owned))?;
    bare_file_name(&name).map(str::to_owned)
}

/// Splits the `key=value` parameters following the disposition type.
/// Quoted values may contain `;` and backslash escapes.
fn disposition_params(header: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut rest = header.split_once(';').map_or("", |(_, tail)| tail);

    loop {
        rest = rest.trim_start_matches([' ', '\t', ';']);
        let Some((key, after)) = rest.split_once('=') else {
            break;
        };
        if let Some(pos) = key.find(';') {
            // Parameter without a value.
            rest = &rest[pos + 1..];
            continue;
        }

        let after = after.trim_start();
        let (value, remaining) = if let Some(quoted) = after.strip_prefix('"') {
            let mut value = String::new();
            let mut end = quoted.len();
            let mut chars = quoted.char_indices();
            while let Some((index, c)) = chars.next() {
                match c {
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => {
                        end = index + 1;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            (value, &quoted[end..])
        } else {
            let end = after.find(';').unwrap_or(after.len());
            (after[..end].trim().to_owned(), &after[end..])
        };

        params.push((key.trim().to_owned(), value));
        rest = remaining;
    }
    params
}

/// Decodes an RFC 5987 `charset'language'percent-encoded` value.
fn decode_ext_value(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = parts.next()?;
    if !charset.eq_ignore_ascii_case("utf-8") {
        return None;
    }

    // Neither '+' nor '&' is a valid attr-char; escape them so the form
    // decoder leaves them literal.
    let escaped = encoded.replace('+', "%2B").replace('&', "%26");
    form_urlencoded::parse(format!("v={escaped}").as_bytes())
        .next()
        .map(|(_, decoded)| decoded.into_owned())
}

fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_owned();
        path.push('/');
        url.set_path(&path);
    }
    url
}
