//! Error types for courier.

use derive_more::{Display, Error, From};

use crate::ResponseHead;

/// Main error type for courier operations.
///
/// Errors raised while a [`RequestBuilder`](crate::RequestBuilder) chain is
/// being assembled are held back and returned from
/// [`RequestBuilder::build`](crate::RequestBuilder::build).
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// Header name or value rejected by the HTTP layer.
    #[display("invalid header: {_0}")]
    #[from(skip)]
    InvalidHeader(#[error(not(source))] String),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// File open, read or copy failure.
    #[display("I/O error: {_0}")]
    #[from]
    Io(std::io::Error),

    /// Multipart writer misuse (bad boundary, write after close).
    #[display("multipart error: {_0}")]
    #[from(skip)]
    Multipart(#[error(not(source))] String),

    /// Form URL-encoded serialization error.
    #[display("form serialization error: {_0}")]
    #[from]
    FormSerialization(serde_urlencoded::ser::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// Response body is not valid UTF-8.
    #[display("invalid UTF-8 body: {_0}")]
    #[from]
    Utf8(std::string::FromUtf8Error),

    /// No response cookie with the requested name.
    #[display("cookie not found: {_0}")]
    #[from(skip)]
    CookieNotFound(#[error(not(source))] String),

    /// Too many redirects.
    #[display("too many redirects ({count} exceeded max of {max})")]
    #[from(skip)]
    TooManyRedirects {
        /// Number of redirects followed.
        count: usize,
        /// Maximum allowed redirects.
        max: usize,
        /// Head of the last redirect response received.
        last: Option<Box<ResponseHead>>,
    },

    /// Invalid redirect response.
    #[display("invalid redirect: {_0}")]
    #[from(skip)]
    InvalidRedirect(#[error(not(source))] String),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an invalid header error.
    #[must_use]
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader(message.into())
    }

    /// Create a multipart error.
    #[must_use]
    pub fn multipart(message: impl Into<String>) -> Self {
        Self::Multipart(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if a cookie lookup failed.
    #[must_use]
    pub const fn is_cookie_not_found(&self) -> bool {
        matches!(self, Self::CookieNotFound(_))
    }

    /// The response received before the transport gave up, if any.
    ///
    /// Only [`Error::TooManyRedirects`] carries one: the head of the last
    /// redirect response. Check the error before trusting it.
    #[must_use]
    pub fn partial_response(&self) -> Option<&ResponseHead> {
        match self {
            Self::TooManyRedirects { last, .. } => last.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderMap, StatusCode, Version};

    use super::*;

    #[test]
    fn error_display() {
        let err = Error::Timeout;
        assert_eq!(err.to_string(), "request timeout");

        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "connection error: failed to connect");

        let err = Error::CookieNotFound("session".to_string());
        assert_eq!(err.to_string(), "cookie not found: session");

        let err = Error::json_deserialization("user.address.city", "missing field `city`");
        assert_eq!(
            err.to_string(),
            "JSON deserialization error at 'user.address.city': missing field `city`"
        );
    }

    #[test]
    fn error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = Error::from(io);
        assert!(matches!(err, Error::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn error_predicates() {
        assert!(Error::Timeout.is_timeout());
        assert!(!Error::connection("failed").is_timeout());
        assert!(Error::connection("failed").is_connection());
        assert!(Error::CookieNotFound("a".to_string()).is_cookie_not_found());
        assert!(!Error::Timeout.is_cookie_not_found());
    }

    #[test]
    fn partial_response_only_for_redirect_limit() {
        let url = url::Url::parse("https://example.com/loop").expect("valid URL");
        let head = ResponseHead::new(
            StatusCode::FOUND,
            Version::HTTP_11,
            HeaderMap::new(),
            url,
        );
        let err = Error::TooManyRedirects {
            count: 10,
            max: 10,
            last: Some(Box::new(head)),
        };

        let partial = err.partial_response().expect("partial response");
        assert_eq!(partial.status(), StatusCode::FOUND);
        assert_eq!(partial.url().path(), "/loop");

        assert!(Error::Timeout.partial_response().is_none());
    }
}
