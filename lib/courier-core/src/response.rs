//! HTTP response handling.
//!
//! [`Response`] wraps what the transport returned: a [`ResponseHead`]
//! (status, version, headers, final URL), the request that produced it, and
//! a body stream that can be read exactly once.
//!
//! # Example
//!
//! ```ignore
//! let mut response = courier::get("https://api.example.com/me").send().await?;
//! let session = response.cookie("session")?;
//! let user: Option<User> = response.json().await?;
//! response.close();
//! ```

use std::fmt;

use bytes::Bytes;
use cookie::Cookie;
use http::header::SET_COOKIE;
use http::{HeaderMap, StatusCode, Version};
use http_body_util::BodyExt;
use url::Url;

use crate::body::{self, Body};
use crate::{Error, Method, Result};

/// Status line and headers of a response, plus the URL that produced it.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    url: Url,
}

impl ResponseHead {
    /// Creates a response head.
    #[must_use]
    pub const fn new(status: StatusCode, version: Version, headers: HeaderMap, url: Url) -> Self {
        Self {
            status,
            version,
            headers,
            url,
        }
    }

    /// Build from `http` response parts and the URL that was requested.
    #[must_use]
    pub fn from_parts(parts: http::response::Parts, url: Url) -> Self {
        Self::new(parts.status, parts.version, parts.headers, url)
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// HTTP version.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// URL this response was received from.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// All parseable `Set-Cookie` cookies, in header order.
    #[must_use]
    pub fn cookies(&self) -> Vec<Cookie<'static>> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| Cookie::parse(value.to_owned()).ok())
            .collect()
    }
}

/// HTTP response received for a request built with
/// [`RequestBuilder`](crate::RequestBuilder).
///
/// The body is a stream: [`body_bytes`](Self::body_bytes),
/// [`body_string`](Self::body_string), [`json`](Self::json) and
/// [`json_into`](Self::json_into) each consume what is left of it.
pub struct Response {
    head: ResponseHead,
    method: Method,
    request_url: Url,
    body: Body,
}

impl Response {
    /// Creates a response for a request sent with `method` to `request_url`.
    #[must_use]
    pub fn new(method: Method, request_url: Url, head: ResponseHead, body: Body) -> Self {
        Self {
            head,
            method,
            request_url,
            body,
        }
    }

    /// Release the body stream.
    ///
    /// Dropping the response has the same effect; this makes the end of use
    /// explicit at the call site.
    pub fn close(self) {
        tracing::trace!(url = %self.head.url, "response closed");
    }

    /// Status line and headers.
    #[must_use]
    pub const fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.head.status
    }

    /// HTTP version.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.head.version
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// First value of a header, if present and visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.head.status.is_success()
    }

    /// Status is 3xx.
    #[must_use]
    pub fn is_redirection(&self) -> bool {
        self.head.status.is_redirection()
    }

    /// Status is 4xx.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.head.status.is_client_error()
    }

    /// Status is 5xx.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.head.status.is_server_error()
    }

    /// Method of the original request.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// URL of the original request.
    #[must_use]
    pub const fn request_url(&self) -> &Url {
        &self.request_url
    }

    /// URL the response came from, after any redirect.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.head.url
    }

    /// Path of the original request.
    ///
    /// This is not where redirects ended up; use [`url`](Self::url) for that.
    #[must_use]
    pub fn path(&self) -> &str {
        self.request_url.path()
    }

    /// All parseable `Set-Cookie` cookies, in header order.
    #[must_use]
    pub fn cookies(&self) -> Vec<Cookie<'static>> {
        self.head.cookies()
    }

    /// The first cookie named `name`.
    ///
    /// When several cookies share the name, the first one wins.
    pub fn cookie(&self, name: &str) -> Result<Cookie<'static>> {
        self.cookies()
            .into_iter()
            .find(|cookie| cookie.name() == name)
            .ok_or_else(|| Error::CookieNotFound(name.to_owned()))
    }

    /// Read the rest of the body into memory.
    ///
    /// The stream is single-read: a second call returns an empty buffer.
    pub async fn body_bytes(&mut self) -> Result<Bytes> {
        let body = std::mem::replace(&mut self.body, body::empty());
        Ok(body.collect().await?.to_bytes())
    }

    /// Read the rest of the body as UTF-8 text.
    pub async fn body_string(&mut self) -> Result<String> {
        let bytes = self.body_bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(Into::into)
    }

    /// Decode the body as JSON into `target`.
    ///
    /// An empty (or whitespace-only) body is not an error: `target` is left
    /// untouched.
    pub async fn json_into<T: serde::de::DeserializeOwned>(&mut self, target: &mut T) -> Result<()> {
        if let Some(value) = self.json().await? {
            *target = value;
        }
        Ok(())
    }

    /// Decode the body as JSON, or `None` if the body is empty.
    pub async fn json<T: serde::de::DeserializeOwned>(&mut self) -> Result<Option<T>> {
        let bytes = self.body_bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        crate::from_json(&bytes).map(Some)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("head", &self.head)
            .field("method", &self.method)
            .field("request_url", &self.request_url)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} - {:?} {} {}",
            self.head.status, self.head.version, self.method, self.request_url
        )?;
        if !self.head.headers.is_empty() {
            writeln!(f, "\tHeader:")?;
            crate::request::write_headers(f, &self.head.headers, None)?;
        }
        let cookies = self.cookies();
        if !cookies.is_empty() {
            writeln!(f, "\tCookies:")?;
            for cookie in &cookies {
                writeln!(f, "\t\t{cookie}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use http::HeaderValue;

    use super::*;

    fn fixture(headers: HeaderMap, body: &'static str) -> Response {
        let url = Url::parse("https://example.com/final").expect("valid URL");
        let request_url = Url::parse("https://example.com/start?x=1").expect("valid URL");
        let head = ResponseHead::new(StatusCode::OK, Version::HTTP_11, headers, url);
        Response::new(Method::Post, request_url, head, body::full(body))
    }

    fn set_cookies(values: &[&'static str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append(SET_COOKIE, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn cookie_first_match_wins() {
        let response = fixture(
            set_cookies(&["session=first; Path=/", "other=1", "session=second"]),
            "",
        );

        let session = response.cookie("session").expect("cookie");
        check!(session.value() == "first");
        check!(session.path() == Some("/"));
        check!(response.cookies().len() == 3);
    }

    #[test]
    fn cookie_not_found() {
        let response = fixture(set_cookies(&["other=1"]), "");
        let_assert!(Err(Error::CookieNotFound(name)) = response.cookie("session"));
        check!(name == "session");
    }

    #[test]
    fn unparseable_cookies_are_skipped() {
        let response = fixture(set_cookies(&["=novalue", "ok=1"]), "");
        let names: Vec<_> = response.cookies().iter().map(|c| c.name().to_owned()).collect();
        check!(names == vec!["ok".to_string()]);
    }

    #[test]
    fn path_is_the_original_request_path() {
        let response = fixture(HeaderMap::new(), "");
        check!(response.path() == "/start");
        check!(response.url().path() == "/final");
        check!(response.method() == &Method::Post);
    }

    #[tokio::test]
    async fn body_is_single_read() {
        let mut response = fixture(HeaderMap::new(), "Hello, World!");
        let first = response.body_bytes().await.expect("bytes");
        let second = response.body_bytes().await.expect("bytes");
        check!(first.as_ref() == b"Hello, World!");
        check!(second.is_empty());
    }

    #[tokio::test]
    async fn body_string() {
        let mut response = fixture(HeaderMap::new(), "Hello, World!");
        let text = response.body_string().await.expect("text");
        check!(text == "Hello, World!");
    }

    #[tokio::test]
    async fn json_decodes_into_target() {
        #[derive(Debug, Default, PartialEq, serde::Deserialize)]
        struct User {
            id: u64,
            name: String,
        }

        let mut response = fixture(HeaderMap::new(), r#"{"id":1,"name":"test"}"#);
        let mut user = User::default();
        response.json_into(&mut user).await.expect("json");
        check!(
            user == User {
                id: 1,
                name: "test".to_string()
            }
        );
    }

    #[tokio::test]
    async fn json_on_empty_body_leaves_target_untouched() {
        let mut target = vec![1, 2, 3];
        let mut response = fixture(HeaderMap::new(), "");
        response.json_into(&mut target).await.expect("empty body is fine");
        check!(target == vec![1, 2, 3]);

        let mut response = fixture(HeaderMap::new(), "  \n");
        let decoded: Option<Vec<u32>> = response.json().await.expect("whitespace body is fine");
        check!(decoded.is_none());
    }

    #[tokio::test]
    async fn json_syntax_error_is_reported() {
        let mut target = 0_u32;
        let mut response = fixture(HeaderMap::new(), "not json");
        let result = response.json_into(&mut target).await;
        let_assert!(Err(Error::JsonDeserialization { .. }) = result);
        check!(target == 0);
    }

    #[test]
    fn display_lists_status_headers_and_cookies() {
        let mut headers = set_cookies(&["session=abc"]);
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        let rendered = fixture(headers, "").to_string();

        check!(rendered.starts_with("200 OK - HTTP/1.1 POST https://example.com/start?x=1\n"));
        check!(rendered.contains("\tHeader:\n"));
        check!(rendered.contains("\t\tcontent-type: text/plain\n"));
        check!(rendered.contains("\tCookies:\n\t\tsession=abc\n"));
    }
}
