//! HTTP request building.
//!
//! [`RequestBuilder`] is a fluent chain: every method takes the builder by
//! value and hands it back, so calls compose without intermediate `?`.
//! Errors raised along the way (a missing file, an invalid header) are kept
//! and returned by [`RequestBuilder::build`]; the first one wins and every
//! later call becomes a no-op.
//!
//! The body encoding is decided by the calls made:
//! - only [`value`](RequestBuilder::value) calls: `application/x-www-form-urlencoded`;
//! - any [`file`](RequestBuilder::file), [`open_file`](RequestBuilder::open_file)
//!   or [`force_multipart`](RequestBuilder::force_multipart): `multipart/form-data`,
//!   with every field, earlier or later, in call order;
//! - nothing: no body.
//!
//! # Example
//!
//! ```
//! use courier_core::{Encoding, post};
//!
//! let request = post("https://example.com/upload")
//!     .header("Accept-Language", "en")
//!     .value("id", "123")
//!     .file("notes", "notes.txt", &b"hello"[..])
//!     .build()
//!     .expect("valid request");
//!
//! assert_eq!(request.encoding(), Encoding::Multipart);
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use bytes::Bytes;
use cookie::Cookie;
use http::header::{CONTENT_TYPE, COOKIE, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, trace};
use url::Url;

use crate::{
    ContentType, Error, Method, MultipartWriter, RedirectPolicy, Response, Result, Transport,
    encode_form,
};

/// Body encoding of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// No multipart trigger seen yet. On a built [`Request`] this means no body.
    Undecided,
    /// `application/x-www-form-urlencoded`, chosen when the request is built.
    UrlEncoded,
    /// `multipart/form-data`. Once entered it is never left.
    Multipart,
}

/// Form state behind the encoding ratchet.
#[derive(Debug)]
enum Form {
    /// Fields buffered until the encoding is known.
    Fields(Vec<(String, String)>),
    /// Parts are written as they come.
    Multipart(MultipartWriter),
}

impl Form {
    const fn encoding(&self) -> Encoding {
        match self {
            Self::Fields(_) => Encoding::Undecided,
            Self::Multipart(_) => Encoding::Multipart,
        }
    }
}

/// Builder for [`Request`].
///
/// Obtain one with [`RequestBuilder::new`] or the [`get`], [`post`], [`put`],
/// [`patch`], [`delete`], [`head`] and [`options`] shortcuts.
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    url: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    cookies: Vec<Cookie<'static>>,
    form: Form,
    redirect: RedirectPolicy,
    error: Option<Error>,
}

impl RequestBuilder {
    /// Creates a new builder. The URL is parsed by [`build`](Self::build).
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            cookies: Vec::new(),
            form: Form::Fields(Vec::new()),
            redirect: RedirectPolicy::Follow,
            error: None,
        }
    }

    /// Run `apply` unless the builder already holds an error, keeping the
    /// error it returns.
    fn try_apply(mut self, apply: impl FnOnce(&mut Self) -> Result<()>) -> Self {
        if self.error.is_none()
            && let Err(err) = apply(&mut self)
        {
            debug!(method = %self.method, url = %self.url, error = %err, "request builder failed");
            self.error = Some(err);
        }
        self
    }

    /// Switch to multipart, flushing buffered fields in insertion order.
    fn multipart_writer(&mut self) -> Result<&mut MultipartWriter> {
        if let Form::Fields(fields) = &mut self.form {
            let fields = std::mem::take(fields);
            self.enter_multipart(MultipartWriter::new(), fields)?;
        }
        match &mut self.form {
            Form::Multipart(writer) => Ok(writer),
            Form::Fields(_) => Err(Error::multipart("multipart form not initialized")),
        }
    }

    fn enter_multipart(
        &mut self,
        writer: MultipartWriter,
        fields: Vec<(String, String)>,
    ) -> Result<()> {
        trace!(buffered = fields.len(), boundary = writer.boundary(), "switching to multipart");
        self.form = Form::Multipart(writer);
        let Form::Multipart(writer) = &mut self.form else {
            return Err(Error::multipart("multipart form not initialized"));
        };
        for (key, value) in &fields {
            writer.write_field(key, value)?;
        }
        Ok(())
    }

    /// Adds a form value.
    ///
    /// Written to the multipart body right away once the request is
    /// multipart, buffered otherwise.
    #[must_use]
    pub fn value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let (key, value) = (key.into(), value.into());
        self.try_apply(move |builder| match &mut builder.form {
            Form::Fields(fields) => {
                fields.push((key, value));
                Ok(())
            }
            Form::Multipart(writer) => writer.write_field(&key, &value),
        })
    }

    /// Adds a multipart file, copying all of `content` into the body.
    ///
    /// Pass `&mut reader` to keep ownership of the reader.
    #[must_use]
    pub fn file(self, key: &str, filename: &str, mut content: impl Read) -> Self {
        self.try_apply(|builder| {
            let mut part = builder.multipart_writer()?.create_form_file(key, filename)?;
            io::copy(&mut content, &mut part)?;
            Ok(())
        })
    }

    /// Opens the file at `path` and adds it as a multipart file named after
    /// the path's base name.
    ///
    /// The file is closed before this returns.
    #[must_use]
    pub fn open_file(self, key: &str, path: impl AsRef<Path>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => return self.try_apply(|_| Err(err.into())),
        };
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.file(key, &filename, file)
    }

    /// Forces a `multipart/form-data` body, even with no files. Idempotent.
    #[must_use]
    pub fn force_multipart(self) -> Self {
        self.try_apply(|builder| builder.multipart_writer().map(|_| ()))
    }

    /// Uses `boundary` for the multipart body and forces multipart.
    ///
    /// Fails if multipart parts were already written.
    #[must_use]
    pub fn boundary(self, boundary: &str) -> Self {
        self.try_apply(|builder| match &mut builder.form {
            Form::Fields(fields) => {
                let fields = std::mem::take(fields);
                let writer = MultipartWriter::with_boundary(boundary)?;
                builder.enter_multipart(writer, fields)
            }
            Form::Multipart(writer) => writer.set_boundary(boundary),
        })
    }

    /// Adds a header. Repeated keys accumulate values.
    #[must_use]
    pub fn header(self, key: &str, value: &str) -> Self {
        self.try_apply(|builder| {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| Error::invalid_header(format!("{key}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::invalid_header(format!("{key}: {e}")))?;
            builder.headers.append(name, value);
            Ok(())
        })
    }

    /// Adds a cookie.
    #[must_use]
    pub fn cookie(self, cookie: impl Into<Cookie<'static>>) -> Self {
        let cookie = cookie.into();
        self.try_apply(move |builder| {
            builder.cookies.push(cookie);
            Ok(())
        })
    }

    /// Sets the `User-Agent` header.
    #[must_use]
    pub fn user_agent(self, value: &str) -> Self {
        self.header(USER_AGENT.as_str(), value)
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let pair = (name.into(), value.into());
        self.try_apply(move |builder| {
            builder.query.push(pair);
            Ok(())
        })
    }

    /// Returns redirect responses instead of following them.
    #[must_use]
    pub fn disable_redirect(self) -> Self {
        self.try_apply(|builder| {
            builder.redirect = RedirectPolicy::Stop;
            Ok(())
        })
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL, as given.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Headers added so far.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Cookies added so far.
    #[must_use]
    pub fn cookies(&self) -> &[Cookie<'static>] {
        &self.cookies
    }

    /// Current body encoding.
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        self.form.encoding()
    }

    /// Redirect policy for this request.
    #[must_use]
    pub const fn redirect_policy(&self) -> RedirectPolicy {
        self.redirect
    }

    /// The error held by the builder, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// The `Content-Type` [`build`](Self::build) would send, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        let declared = || {
            self.headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        match &self.form {
            Form::Multipart(writer) => Some(writer.content_type()),
            Form::Fields(fields) if fields.is_empty() => declared(),
            Form::Fields(_) => {
                declared().or_else(|| Some(ContentType::FormUrlEncoded.as_str().to_owned()))
            }
        }
    }

    /// Builds the [`Request`], encoding the body.
    ///
    /// Returns the builder's error, if any, without doing anything else.
    pub fn build(self) -> Result<Request> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut url = Url::parse(&self.url)?;
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                pairs.append_pair(name, value);
            }
        }

        let mut headers = self.headers;
        let (encoding, body) = match self.form {
            Form::Multipart(mut writer) => {
                writer.close()?;
                let content_type = HeaderValue::try_from(writer.content_type())
                    .map_err(|e| Error::invalid_header(e.to_string()))?;
                headers.insert(CONTENT_TYPE, content_type);
                (Encoding::Multipart, Some(writer.into_bytes()))
            }
            Form::Fields(fields) if fields.is_empty() => (Encoding::Undecided, None),
            Form::Fields(fields) => {
                let body = encode_form(&fields)?;
                headers
                    .entry(CONTENT_TYPE)
                    .or_insert(HeaderValue::from_static(ContentType::FormUrlEncoded.as_str()));
                (Encoding::UrlEncoded, Some(body))
            }
        };

        if !self.cookies.is_empty() {
            let mut pairs: Vec<String> = headers
                .get_all(COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(str::to_owned)
                .collect();
            pairs.extend(self.cookies.iter().map(|c| c.stripped().to_string()));
            let cookie = HeaderValue::from_str(&pairs.join("; "))
                .map_err(|e| Error::invalid_header(format!("cookie: {e}")))?;
            headers.insert(COOKIE, cookie);
        }

        Ok(Request {
            method: self.method,
            url,
            headers,
            body,
            encoding,
            redirect: self.redirect,
        })
    }

    /// Builds the request and sends it with `transport`.
    ///
    /// A builder holding an error fails here without calling the transport.
    pub async fn send_with<T: Transport>(self, transport: &T) -> Result<Response> {
        let request = self.build()?;
        transport.send(request).await
    }
}

impl fmt::Display for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.method, self.url)?;
        writeln!(f, "\tHeader:")?;
        if let Some(content_type) = self.content_type() {
            writeln!(f, "\t\tContent-Type: {content_type}")?;
        }
        write_headers(f, &self.headers, Some(&CONTENT_TYPE))?;
        if !self.cookies.is_empty() {
            writeln!(f, "\tCookies:")?;
            for cookie in &self.cookies {
                writeln!(f, "\t\t{cookie}")?;
            }
        }
        Ok(())
    }
}

/// Write one `name: v1, v2` line per header name.
pub(crate) fn write_headers(
    f: &mut fmt::Formatter<'_>,
    headers: &HeaderMap,
    skip: Option<&HeaderName>,
) -> fmt::Result {
    for name in headers.keys() {
        if skip == Some(name) {
            continue;
        }
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .map(|v| v.to_str().unwrap_or("<binary>"))
            .collect();
        writeln!(f, "\t\t{name}: {}", values.join(", "))?;
    }
    Ok(())
}

/// Creates a builder for any method name, `PROPFIND` included.
///
/// An invalid method token is held like any other builder error and returned
/// by [`RequestBuilder::build`].
#[must_use]
pub fn request(method: &str, url: impl Into<String>) -> RequestBuilder {
    match method.parse() {
        Ok(method) => RequestBuilder::new(method, url),
        Err(err) => RequestBuilder::new(Method::Get, url).try_apply(|_| Err(err)),
    }
}

/// Creates a builder for a GET request.
#[must_use]
pub fn get(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(Method::Get, url)
}

/// Creates a builder for a POST request.
#[must_use]
pub fn post(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(Method::Post, url)
}

/// Creates a builder for a PUT request.
#[must_use]
pub fn put(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(Method::Put, url)
}

/// Creates a builder for a PATCH request.
#[must_use]
pub fn patch(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(Method::Patch, url)
}

/// Creates a builder for a DELETE request.
#[must_use]
pub fn delete(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(Method::Delete, url)
}

/// Creates a builder for a HEAD request.
#[must_use]
pub fn head(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(Method::Head, url)
}

/// Creates a builder for an OPTIONS request.
#[must_use]
pub fn options(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(Method::Options, url)
}

/// A finalized HTTP request: body encoded, `Content-Type` and `Cookie` applied.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    encoding: Encoding,
    redirect: RedirectPolicy,
}

impl Request {
    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL, query included.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if present and visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Encoding that produced the body.
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// What the transport should do with redirects.
    #[must_use]
    pub const fn redirect_policy(&self) -> RedirectPolicy {
        self.redirect
    }

    /// Consume into (method, url, headers, body, redirect policy).
    #[must_use]
    pub fn into_parts(self) -> (Method, Url, HeaderMap, Option<Bytes>, RedirectPolicy) {
        (self.method, self.url, self.headers, self.body, self.redirect)
    }
}
