//! Transport trait.
//!
//! A [`Transport`] sends a finalized [`Request`] and returns the raw
//! [`Response`]. The `courier` crate ships `HyperTransport`; implement the
//! trait yourself for tests or to route requests elsewhere.

use std::future::Future;

use crate::{Request, Response, Result};

/// What the transport does with a 3xx response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RedirectPolicy {
    /// Follow `Location` until a non-redirect response arrives.
    #[default]
    Follow,
    /// Return the first response as-is, redirect or not.
    Stop,
}

/// Core transport trait.
pub trait Transport: Send + Sync {
    /// Send the request and return the response.
    ///
    /// With [`RedirectPolicy::Stop`] a redirect response is returned, not
    /// reported as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    /// - Redirect loops or unusable `Location` headers
    fn send(&self, request: Request) -> impl Future<Output = Result<Response>> + Send;
}
