//! S3-compatible HTTP core for the Cumulus object storage service.
//!
//! This crate is the protocol layer between S3 clients and a storage
//! [`Driver`](cumulus_driver::Driver):
//!
//! - **Routing** ([`router`]): Maps method x path x query onto the supported
//!   operation set; recognized-but-unsupported sub-resources short-circuit
//!   to `NotImplemented`.
//!
//! - **Authentication**: AWS SigV2 verification via `cumulus-auth`, wired
//!   into the pipeline with an anonymous-read carve-out for objects in
//!   `public-read` buckets.
//!
//! - **Handlers** ([`handlers`]): Per-operation validation, driver calls,
//!   and response composition.
//!
//! - **Responses** ([`response`]): XML bodies (with JSON negotiated from
//!   `Accept`), the S3 error document, and the common response headers.
//!
//! - **Errors** ([`error`]): The wire-level [`ApiError`] and the total
//!   mapping from the driver error vocabulary onto S3 codes and statuses.
//!
//! - **Ranges** ([`range`]): `Range` header parsing against a known object
//!   size.
//!
//! - **Bodies** ([`body`]): The buffered/empty/streaming response body and
//!   the request-body-to-`AsyncRead` adapter; object payloads stream in
//!   both directions, never buffered whole.
//!
//! - **Service** ([`service`]): [`S3Service`], the hyper `Service` tying the
//!   pipeline together, mountable at any path prefix.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> S3Service (hyper Service)
//!     -> Router (bucket / key / operation)
//!     -> SigV2 verification (cumulus-auth)
//!     -> handler -> Driver (cumulus-driver)
//!     -> response writer (XML / JSON, common headers)
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use cumulus_api::{S3Service, ServiceConfig};
//! use cumulus_auth::StaticCredentialProvider;
//! use cumulus_driver::MemoryDriver;
//!
//! let credentials = Arc::new(StaticCredentialProvider::new(vec![
//!     ("access-key".to_owned(), "secret-key".to_owned()),
//! ]));
//! let service = S3Service::new("", MemoryDriver::new(), credentials, ServiceConfig::default());
//! // Serve `service` with hyper, mounted at "/".
//! ```

pub mod body;
pub mod error;
pub mod handlers;
pub mod range;
pub mod response;
pub mod router;
pub mod service;

pub use body::ResponseBody;
pub use error::{ApiError, ApiErrorCode, ApiResult};
pub use range::HttpRange;
pub use response::ContentFormat;
pub use router::{Operation, RouteContext, Router};
pub use service::{S3Service, ServiceConfig};
