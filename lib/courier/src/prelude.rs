//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::{
    ClientConfig, Cookie, Encoding, Error, HyperTransport, Method, RedirectPolicy, Request,
    RequestBuilder, RequestBuilderExt, Response, Result, StatusCode, Transport, delete, get, head,
    options, patch, post, put, request,
};
