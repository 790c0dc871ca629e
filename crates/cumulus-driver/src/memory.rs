//! In-memory reference driver.
//!
//! Buckets live in a [`DashMap`]; each bucket keeps its objects in a
//! `parking_lot::RwLock<BTreeMap>` so listings come out in ascending key
//! order by construction. Object bodies are [`Bytes`], so reads clone a
//! refcount, not the payload.
//!
//! # Atomicity
//!
//! [`create_object`](MemoryDriver::create_object) consumes the whole body
//! stream and verifies the digest *before* taking the write lock; the
//! finished entry is then swapped in with a single `BTreeMap::insert`.
//! Readers observe either the previous object or the new one, never a
//! partial write, and an aborted or digest-failed upload publishes nothing.

use std::collections::BTreeMap;

use anyhow::anyhow;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use md5::{Digest, Md5};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, trace};

use crate::driver::{BodyReader, BodyWriter, Driver};
use crate::error::DriverError;
use crate::types::{BucketAcl, BucketMetadata, BucketResources, ObjectMetadata};
use crate::validation::{validate_bucket_name, validate_object_key};

/// Fallback content type when the client sends none.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A stored object: metadata plus the body bytes.
#[derive(Debug, Clone)]
struct StoredObject {
    metadata: ObjectMetadata,
    data: Bytes,
}

/// Per-bucket state: the metadata and a sorted key store.
#[derive(Debug)]
struct MemoryBucket {
    metadata: parking_lot::RwLock<BucketMetadata>,
    objects: parking_lot::RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryBucket {
    fn new(name: &str, acl: BucketAcl) -> Self {
        Self {
            metadata: parking_lot::RwLock::new(BucketMetadata {
                name: name.to_owned(),
                created: Utc::now(),
                acl,
            }),
            objects: parking_lot::RwLock::new(BTreeMap::new()),
        }
    }
}

/// In-memory storage driver.
///
/// Thread-safe; suitable for tests and single-process development servers.
///
/// # Examples
///
/// ```
/// use cumulus_driver::memory::MemoryDriver;
/// use cumulus_driver::{BucketAcl, Driver};
///
/// # tokio_test::block_on(async {
/// let driver = MemoryDriver::new();
/// driver.create_bucket("demo", BucketAcl::Private).await.unwrap();
///
/// let mut body: &[u8] = b"hello";
/// let meta = driver
///     .create_object("demo", "greeting", "text/plain", "", &mut body)
///     .await
///     .unwrap();
/// assert_eq!(meta.size, 5);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryDriver {
    buckets: DashMap<String, MemoryBucket>,
}

impl MemoryDriver {
    /// Create an empty driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a stored object, cloning the cheap `Bytes` handle.
    fn fetch(&self, bucket: &str, key: &str) -> Result<StoredObject, DriverError> {
        let entry = self
            .buckets
            .get(bucket)
            .ok_or_else(|| DriverError::BucketNotFound {
                bucket: bucket.to_owned(),
            })?;
        let objects = entry.objects.read();
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| DriverError::ObjectNotFound {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            })
    }
}

#[async_trait::async_trait]
impl Driver for MemoryDriver {
    async fn list_buckets(&self) -> Result<Vec<BucketMetadata>, DriverError> {
        let mut buckets: Vec<BucketMetadata> = self
            .buckets
            .iter()
            .map(|entry| entry.metadata.read().clone())
            .collect();
        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(buckets)
    }

    async fn create_bucket(&self, name: &str, acl: BucketAcl) -> Result<(), DriverError> {
        validate_bucket_name(name)?;

        match self.buckets.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(DriverError::BucketExists {
                bucket: name.to_owned(),
            }),
            Entry::Vacant(slot) => {
                debug!(bucket = name, acl = %acl, "created bucket");
                slot.insert(MemoryBucket::new(name, acl));
                Ok(())
            }
        }
    }

    async fn get_bucket_metadata(&self, name: &str) -> Result<BucketMetadata, DriverError> {
        self.buckets
            .get(name)
            .map(|entry| entry.metadata.read().clone())
            .ok_or_else(|| DriverError::BucketNotFound {
                bucket: name.to_owned(),
            })
    }

    async fn set_bucket_metadata(&self, name: &str, acl: BucketAcl) -> Result<(), DriverError> {
        let entry = self
            .buckets
            .get(name)
            .ok_or_else(|| DriverError::BucketNotFound {
                bucket: name.to_owned(),
            })?;
        entry.metadata.write().acl = acl;
        debug!(bucket = name, acl = %acl, "updated bucket acl");
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        mut resources: BucketResources,
    ) -> Result<(Vec<ObjectMetadata>, BucketResources), DriverError> {
        let entry = self
            .buckets
            .get(bucket)
            .ok_or_else(|| DriverError::BucketNotFound {
                bucket: bucket.to_owned(),
            })?;

        let objects = entry.objects.read();
        let listed = list_from_btree(&objects, &mut resources);
        Ok((listed, resources))
    }

    async fn create_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expected_md5: &str,
        reader: &mut BodyReader,
    ) -> Result<ObjectMetadata, DriverError> {
        if !self.buckets.contains_key(bucket) {
            return Err(DriverError::BucketNotFound {
                bucket: bucket.to_owned(),
            });
        }
        validate_object_key(key)?;

        let content_type = if content_type.is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            content_type
        };

        // Consume the stream to EOF, hashing as chunks arrive. Nothing is
        // published until the digest check below has passed.
        let mut data = BytesMut::new();
        let mut hasher = Md5::new();
        loop {
            let start = data.len();
            let n = reader
                .read_buf(&mut data)
                .await
                .map_err(|e| DriverError::Internal(anyhow!("reading object body: {e}")))?;
            if n == 0 {
                break;
            }
            hasher.update(&data[start..]);
        }

        let digest = hasher.finalize();
        let md5_hex = hex::encode(digest);

        if !expected_md5.is_empty() {
            let declared = BASE64.decode(expected_md5).unwrap_or_default();
            if declared.as_slice() != digest.as_slice() {
                return Err(DriverError::BadDigest {
                    expected: expected_md5.to_owned(),
                    computed: md5_hex,
                });
            }
        }

        let stored = StoredObject {
            metadata: ObjectMetadata {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
                content_type: content_type.to_owned(),
                created: Utc::now(),
                md5: md5_hex,
                size: data.len() as u64,
            },
            data: data.freeze(),
        };
        let metadata = stored.metadata.clone();

        let entry = self
            .buckets
            .get(bucket)
            .ok_or_else(|| DriverError::BucketNotFound {
                bucket: bucket.to_owned(),
            })?;
        entry.objects.write().insert(key.to_owned(), stored);

        trace!(bucket, key, size = metadata.size, "stored object");
        Ok(metadata)
    }

    async fn get_object_metadata(
        &self,
        bucket: &str,
        key: &str,
        _prefix: &str,
    ) -> Result<ObjectMetadata, DriverError> {
        Ok(self.fetch(bucket, key)?.metadata)
    }

    async fn get_object(
        &self,
        writer: &mut BodyWriter,
        bucket: &str,
        key: &str,
    ) -> Result<u64, DriverError> {
        let stored = self.fetch(bucket, key)?;
        writer
            .write_all(&stored.data)
            .await
            .map_err(|e| DriverError::Internal(anyhow!("writing object body: {e}")))?;
        Ok(stored.data.len() as u64)
    }

    async fn get_partial_object(
        &self,
        writer: &mut BodyWriter,
        bucket: &str,
        key: &str,
        offset: u64,
        length: u64,
    ) -> Result<u64, DriverError> {
        let stored = self.fetch(bucket, key)?;

        let size = stored.data.len() as u64;
        let end = offset.checked_add(length).ok_or(DriverError::InvalidRange)?;
        if offset >= size || end > size {
            return Err(DriverError::InvalidRange);
        }

        let slice = stored.data.slice(offset as usize..end as usize);
        writer
            .write_all(&slice)
            .await
            .map_err(|e| DriverError::Internal(anyhow!("writing object body: {e}")))?;
        Ok(length)
    }
}

/// Walk a sorted key store applying marker, prefix, delimiter, and
/// `max_keys`, mutating `resources` with the truncation flag and common
/// prefixes.
fn list_from_btree(
    objects: &BTreeMap<String, StoredObject>,
    resources: &mut BucketResources,
) -> Vec<ObjectMetadata> {
    let use_delim = !resources.delimiter.is_empty();
    let mut result: Vec<ObjectMetadata> = Vec::new();
    let mut seen_prefixes = std::collections::HashSet::new();

    for (key, stored) in objects {
        // Skip keys at or before the marker.
        if !resources.marker.is_empty() && key.as_str() <= resources.marker.as_str() {
            continue;
        }

        if !resources.prefix.is_empty() && !key.starts_with(&resources.prefix) {
            continue;
        }

        // Delimiter-based rollup into common prefixes.
        if use_delim {
            let after_prefix = &key[resources.prefix.len()..];
            if let Some(pos) = after_prefix.find(&resources.delimiter) {
                let cp = format!(
                    "{}{}{}",
                    resources.prefix,
                    &after_prefix[..pos],
                    resources.delimiter
                );
                if seen_prefixes.insert(cp.clone()) {
                    resources.common_prefixes.push(cp);
                }
                continue;
            }
        }

        if result.len() >= resources.max_keys {
            resources.is_truncated = true;
            break;
        }

        result.push(stored.metadata.clone());
    }

    result
}
