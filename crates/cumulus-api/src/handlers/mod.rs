//! Per-operation request handlers.
//!
//! Every handler has the same outer shape: validate inputs, call the driver,
//! build the response. Authentication and routing happen before a handler
//! runs; error mapping and common headers happen after. Handlers return
//! [`ApiError`](crate::error::ApiError) and never write error bodies
//! themselves.

pub(crate) mod bucket;
pub(crate) mod object;

use crate::response::ContentFormat;

/// Per-request facts a handler needs beyond its path parameters.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HandlerContext {
    /// Whether the request carried a valid signature. Anonymous requests
    /// reach object reads only; the handlers gate them on the bucket ACL.
    pub authenticated: bool,
    /// The negotiated response serialization.
    pub format: ContentFormat,
}
