//! Fluent HTTP client with form, multipart and cookie support.
//!
//! Build a request with a chain of calls, then send it. Errors met while
//! building (a missing file, a bad header) do not interrupt the chain: they
//! are returned by `send()`.
//!
//! # Example
//!
//! ```ignore
//! use courier::prelude::*;
//!
//! let mut response = courier::post("https://example.com/upload")
//!     .header("Accept-Language", "en")
//!     .cookie(Cookie::new("session", "123"))
//!     .value("id", "123")
//!     .open_file("picture", "avatar.png")
//!     .send()
//!     .await?;
//!
//! println!("{response}");
//! let text = response.body_string().await?;
//! ```

mod config;
mod connector;
pub mod prelude;
mod send;
mod transport;

pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_MAX_REDIRECTS};
pub use connector::https_connector;
pub use send::RequestBuilderExt;
pub use transport::HyperTransport;

// Re-export core types
pub use courier_core::{
    Body, ContentType, Cookie, Encoding, Error, Method, MultipartWriter, PartWriter,
    RedirectPolicy, Request, RequestBuilder, Response, ResponseHead, Result, Transport, cookie,
    delete, encode_form, from_json, get, head, options, patch, post, put, request,
};

// Re-export http types for status codes and headers
pub use courier_core::{StatusCode, header};

pub use url;
