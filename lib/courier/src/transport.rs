//! HTTP transport using hyper-util.

use std::sync::LazyLock;
use std::time::Instant;

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION};
use http::{HeaderMap, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tracing::{Instrument, Level, debug, info, span, warn};
use url::Url;

use crate::{
    Body, ClientConfig, Error, Method, RedirectPolicy, Request, Response, ResponseHead, Result,
    Transport, connector::https_connector,
};

static SHARED: LazyLock<HyperTransport> = LazyLock::new(HyperTransport::new);

/// HTTP transport with connection pooling and rustls TLS.
///
/// Redirects are followed here, according to the request's
/// [`RedirectPolicy`] and [`ClientConfig::max_redirects`].
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use courier::{ClientConfig, HyperTransport};
///
/// let transport = HyperTransport::with_config(
///     ClientConfig::builder().timeout(Duration::from_secs(5)).build(),
/// );
/// let response = courier::get("https://example.com/").send_with(&transport).await?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: ClientConfig,
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a transport with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a transport with a custom configuration.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let connector = https_connector(&config);

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .retry_canceled_requests(config.retry_canceled_requests)
            .build(connector);

        Self { inner, config }
    }

    /// Process-wide transport used by `send()`, created on first use.
    #[must_use]
    pub fn shared() -> &'static Self {
        &SHARED
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one request without following redirects.
    async fn hop(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&Bytes>,
    ) -> Result<(ResponseHead, Body)> {
        let mut request = http::Request::builder()
            .method(http::Method::from(method.clone()))
            .uri(url.as_str())
            .body(Full::new(body.cloned().unwrap_or_default()))
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        *request.headers_mut() = headers.clone();

        let response = tokio::time::timeout(self.config.timeout, self.inner.request(request))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(map_hyper_error)?;

        let (parts, incoming) = response.into_parts();
        let body = incoming
            .map_err(|e| Error::connection(e.to_string()))
            .boxed_unsync();
        Ok((ResponseHead::from_parts(parts, url.clone()), body))
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        let (method, request_url, mut headers, mut body, policy) = request.into_parts();
        let max_redirects = self.config.max_redirects;

        let mut current_method = method.clone();
        let mut current_url = request_url.clone();
        let mut redirects = 0;

        loop {
            let (head, stream) = self
                .hop(&current_method, &current_url, &headers, body.as_ref())
                .await?;

            let status = head.status();
            if policy == RedirectPolicy::Stop || !is_redirect(status) {
                return Ok(Response::new(method, request_url, head, stream));
            }

            let Some(location) = head.headers().get(LOCATION) else {
                debug!(%status, url = %current_url, "redirect without Location, returning it");
                return Ok(Response::new(method, request_url, head, stream));
            };
            let location = location
                .to_str()
                .map_err(|e| Error::InvalidRedirect(format!("Location header: {e}")))?;
            let next_url = resolve_redirect_url(&current_url, location)?;

            if redirects >= max_redirects {
                return Err(Error::TooManyRedirects {
                    count: redirects,
                    max: max_redirects,
                    last: Some(Box::new(head)),
                });
            }
            redirects += 1;

            if !preserves_body(status) {
                body = None;
                headers.remove(CONTENT_TYPE);
                headers.remove(CONTENT_LENGTH);
            }
            if next_url.host_str() != current_url.host_str() {
                headers.remove(AUTHORIZATION);
                headers.remove(COOKIE);
            }

            let next_method = redirect_method(status, &current_method);
            debug!(
                %status,
                from = %current_url,
                to = %next_url,
                method = %next_method,
                redirects,
                "following redirect"
            );
            current_method = next_method;
            current_url = next_url;
        }
    }
}

impl Transport for HyperTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let url = request.url().to_string();
        let span = span!(Level::INFO, "http_request", %method, %url);

        async move {
            let start = Instant::now();
            info!(method = %method, url = %url, "sending request");

            let result = self.execute(request).await;
            let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match &result {
                Ok(response) if response.is_success() || response.is_redirection() => {
                    info!(status = %response.status(), elapsed_ms, "received response");
                }
                Ok(response) => {
                    warn!(status = %response.status(), elapsed_ms, "received error response");
                }
                Err(error) => {
                    warn!(error = %error, elapsed_ms, "request failed");
                }
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[allow(clippy::needless_pass_by_value)]
fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
    // The source chain carries the actual cause (refused, DNS, handshake).
    let mut msg = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        msg = format!("{msg}: {cause}");
        source = cause.source();
    }

    let lower = msg.to_ascii_lowercase();
    if lower.contains("ssl") || lower.contains("tls") || lower.contains("certificate") {
        return Error::tls(msg);
    }

    Error::connection(msg)
}

/// Check if a status code is a followable redirect.
fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// 307 and 308 replay the request as-is.
fn preserves_body(status: StatusCode) -> bool {
    matches!(status.as_u16(), 307 | 308)
}

/// Determine the method for the redirected request.
///
/// - 301, 302, 303: GET, except HEAD stays HEAD
/// - 307, 308: original method
fn redirect_method(status: StatusCode, original: &Method) -> Method {
    if preserves_body(status) || original.is_bodyless() {
        original.clone()
    } else {
        Method::Get
    }
}

/// Resolve a `Location` value against the URL that answered with it.
fn resolve_redirect_url(base_url: &Url, location: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(location) {
        return Ok(url);
    }

    base_url
        .join(location)
        .map_err(|e| Error::InvalidRedirect(format!("{location:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_statuses() {
        for code in [301, 302, 303, 307, 308] {
            let status = StatusCode::from_u16(code).expect("status");
            assert!(is_redirect(status), "{code} should redirect");
        }
        for code in [200, 300, 304, 305, 400] {
            let status = StatusCode::from_u16(code).expect("status");
            assert!(!is_redirect(status), "{code} should not redirect");
        }
    }

    #[test]
    fn see_other_switches_to_get() {
        assert_eq!(redirect_method(StatusCode::SEE_OTHER, &Method::Post), Method::Get);
        assert_eq!(redirect_method(StatusCode::FOUND, &Method::Put), Method::Get);
        assert_eq!(redirect_method(StatusCode::MOVED_PERMANENTLY, &Method::Delete), Method::Get);
    }

    #[test]
    fn head_stays_head() {
        assert_eq!(redirect_method(StatusCode::FOUND, &Method::Head), Method::Head);
    }

    #[test]
    fn temporary_and_permanent_redirects_keep_method() {
        assert_eq!(
            redirect_method(StatusCode::TEMPORARY_REDIRECT, &Method::Post),
            Method::Post
        );
        assert_eq!(
            redirect_method(StatusCode::PERMANENT_REDIRECT, &Method::Patch),
            Method::Patch
        );
        assert!(preserves_body(StatusCode::TEMPORARY_REDIRECT));
        assert!(!preserves_body(StatusCode::SEE_OTHER));
    }

    #[test]
    fn resolve_absolute_and_relative_locations() {
        let base = Url::parse("https://example.com/api/v1/users").expect("url");

        let absolute = resolve_redirect_url(&base, "https://other.com/path").expect("absolute");
        assert_eq!(absolute.as_str(), "https://other.com/path");

        let rooted = resolve_redirect_url(&base, "/new/path").expect("rooted");
        assert_eq!(rooted.as_str(), "https://example.com/new/path");

        let relative = resolve_redirect_url(&base, "items?page=2").expect("relative");
        assert_eq!(relative.as_str(), "https://example.com/api/v1/items?page=2");
    }

    #[test]
    fn unparseable_location_is_invalid_redirect() {
        let base = Url::parse("https://example.com/").expect("url");
        let result = resolve_redirect_url(&base, "http://[::1");
        assert!(matches!(result, Err(Error::InvalidRedirect(_))));
    }

    #[test]
    fn shared_transport_is_one_instance() {
        let first: *const HyperTransport = HyperTransport::shared();
        let second: *const HyperTransport = HyperTransport::shared();
        assert_eq!(first, second);
        assert_eq!(HyperTransport::shared().config().max_redirects, 10);
    }
}
