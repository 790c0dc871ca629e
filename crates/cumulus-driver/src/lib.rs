//! Storage driver contract for the Cumulus object storage service.
//!
//! This crate defines the boundary between the HTTP core and any storage
//! backend:
//!
//! - **Contract** ([`driver`]): The [`Driver`] trait -- the narrow capability
//!   set every backend implements identically. Object bodies cross it as
//!   `AsyncRead`/`AsyncWrite` streams, never as full buffers.
//!
//! - **Errors** ([`error`]): [`DriverError`], the canonical closed vocabulary
//!   of backend failure kinds the HTTP core maps onto the wire.
//!
//! - **Data model** ([`types`]): Bucket and object metadata, canned ACL tags,
//!   and the [`BucketResources`] listing parameters.
//!
//! - **Validation** ([`validation`]): S3 bucket-name and object-key rules,
//!   shared so every backend rejects the same names the same way.
//!
//! - **Reference backend** ([`memory`]): [`MemoryDriver`], a thread-safe
//!   in-memory driver used by the test suite and the development server.
//!
//! # Architecture
//!
//! ```text
//! HTTP core (routing, auth, XML)
//!        |
//!        v
//!   dyn / impl Driver  <- this crate
//!        |
//!        +-- MemoryDriver (in-memory, this crate)
//!        +-- filesystem / erasure-coded backends (external)
//! ```

pub mod driver;
pub mod error;
pub mod memory;
pub mod types;
pub mod validation;

pub use driver::{BodyReader, BodyWriter, Driver};
pub use error::{DriverError, DriverResult};
pub use memory::MemoryDriver;
pub use types::{BucketAcl, BucketMetadata, BucketResources, ObjectMetadata, DEFAULT_MAX_KEYS};
