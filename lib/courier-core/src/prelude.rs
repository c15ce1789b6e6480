//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    Cookie, Encoding, Error, Method, RedirectPolicy, Request, RequestBuilder, Response, Result,
    Transport, delete, get, head, options, patch, post, put, request,
};
