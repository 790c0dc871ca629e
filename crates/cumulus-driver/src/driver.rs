//! The storage driver contract.
//!
//! [`Driver`] is the sole boundary between the HTTP core and any backend.
//! The HTTP layer treats it opaquely: it never sees how bytes are placed, only
//! the capability set below. Object bodies cross the boundary as
//! `AsyncRead`/`AsyncWrite` streams so neither side ever needs the full
//! payload in memory.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::DriverError;
use crate::types::{BucketAcl, BucketMetadata, BucketResources, ObjectMetadata};

/// A readable byte stream handed to [`Driver::create_object`].
pub type BodyReader = dyn AsyncRead + Send + Unpin;

/// A writable byte sink handed to [`Driver::get_object`] and
/// [`Driver::get_partial_object`].
pub type BodyWriter = dyn AsyncWrite + Send + Unpin;

/// The capability set every storage backend implements.
///
/// The service process owns one driver instance for its lifetime; handler
/// invocations borrow it concurrently, and the driver is responsible for its
/// own internal synchronization. Within a single `(bucket, key)`, successive
/// writes are linearizable: concurrent readers observe the pre-state or the
/// post-state of any single [`create_object`](Self::create_object), never a
/// torn mix.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// List all buckets, ordered ascending by name.
    async fn list_buckets(&self) -> Result<Vec<BucketMetadata>, DriverError>;

    /// Create a bucket.
    ///
    /// # Errors
    ///
    /// - [`DriverError::BucketNameInvalid`] if `name` violates the naming rules.
    /// - [`DriverError::BucketExists`] if the bucket already exists.
    async fn create_bucket(&self, name: &str, acl: BucketAcl) -> Result<(), DriverError>;

    /// Fetch a bucket's metadata.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::BucketNotFound`] if the bucket does not exist.
    async fn get_bucket_metadata(&self, name: &str) -> Result<BucketMetadata, DriverError>;

    /// Replace a bucket's ACL.
    ///
    /// Optional: a backend may answer [`DriverError::NotImplemented`].
    async fn set_bucket_metadata(&self, name: &str, acl: BucketAcl) -> Result<(), DriverError>;

    /// List objects in a bucket.
    ///
    /// Applies `resources` (prefix, marker, delimiter, `max_keys`) and
    /// returns up to `max_keys` entries in ascending key order, together
    /// with the resources echoed back carrying `is_truncated` and
    /// `common_prefixes`.
    async fn list_objects(
        &self,
        bucket: &str,
        resources: BucketResources,
    ) -> Result<(Vec<ObjectMetadata>, BucketResources), DriverError>;

    /// Store an object, consuming `reader` to end-of-stream.
    ///
    /// The object is persisted atomically: it becomes visible under
    /// `(bucket, key)` only once the stream is fully consumed and the digest
    /// check passed. The MD5 of the received bytes is computed and stored
    /// unconditionally; the stored metadata is returned so callers can emit
    /// the `ETag` without a second lookup.
    ///
    /// # Errors
    ///
    /// - [`DriverError::BucketNotFound`] if the bucket does not exist.
    /// - [`DriverError::ObjectNameInvalid`] if `key` violates the key rules.
    /// - [`DriverError::BadDigest`] if `expected_md5` is non-empty (base64,
    ///   as carried by `Content-MD5`) and disagrees with the computed digest.
    async fn create_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expected_md5: &str,
        reader: &mut BodyReader,
    ) -> Result<ObjectMetadata, DriverError>;

    /// Fetch an object's metadata.
    ///
    /// `prefix` is a pass-through filter slot retained from the driver
    /// contract; backends may ignore it.
    ///
    /// # Errors
    ///
    /// - [`DriverError::BucketNotFound`] if the bucket does not exist.
    /// - [`DriverError::ObjectNotFound`] if the key does not exist.
    async fn get_object_metadata(
        &self,
        bucket: &str,
        key: &str,
        prefix: &str,
    ) -> Result<ObjectMetadata, DriverError>;

    /// Stream the whole object into `writer`. Returns the bytes written.
    async fn get_object(
        &self,
        writer: &mut BodyWriter,
        bucket: &str,
        key: &str,
    ) -> Result<u64, DriverError>;

    /// Stream `[offset, offset + length)` of the object into `writer`.
    ///
    /// The caller guarantees the range lies within `[0, size)`; a driver may
    /// still answer [`DriverError::InvalidRange`] defending its own bounds.
    async fn get_partial_object(
        &self,
        writer: &mut BodyWriter,
        bucket: &str,
        key: &str,
        offset: u64,
        length: u64,
    ) -> Result<u64, DriverError>;
}
