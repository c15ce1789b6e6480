//! `send()` on the shared transport.

use std::future::Future;

use crate::{HyperTransport, RequestBuilder, Response, Result};

/// Adds [`send`](RequestBuilderExt::send) to [`RequestBuilder`].
pub trait RequestBuilderExt {
    /// Build the request and send it with [`HyperTransport::shared`].
    ///
    /// # Errors
    ///
    /// Returns the builder's held error without touching the network, or the
    /// transport error.
    fn send(self) -> impl Future<Output = Result<Response>> + Send;
}

impl RequestBuilderExt for RequestBuilder {
    fn send(self) -> impl Future<Output = Result<Response>> + Send {
        self.send_with(HyperTransport::shared())
    }
}
