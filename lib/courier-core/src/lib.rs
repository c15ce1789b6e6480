//! Core types for the courier HTTP client.
//!
//! This crate holds everything that does not touch the network:
//! - [`RequestBuilder`] and [`Request`]: fluent request assembly with deferred errors
//! - [`MultipartWriter`]: streaming `multipart/form-data` encoding
//! - [`Response`] and [`ResponseHead`]: status, headers, cookies and a single-read body
//! - [`Transport`]: the seam a network client implements
//! - [`Error`] and [`Result`]: error handling
//!
//! The `courier` crate adds a hyper-based [`Transport`] and `send()`.

mod body;
mod error;
mod method;
mod multipart;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use body::{Body, ContentType, empty, encode_form, from_json, full};
pub use error::{Error, Result};
pub use method::Method;
pub use multipart::{MultipartWriter, PartWriter};
pub use request::{
    Encoding, Request, RequestBuilder, delete, get, head, options, patch, post, put, request,
};
pub use response::{Response, ResponseHead};
pub use transport::{RedirectPolicy, Transport};

// Re-export http status codes and header names, and the cookie type
pub use cookie::{self, Cookie};
pub use http::{StatusCode, header};
