//! Core data model shared by the driver contract and the HTTP layer.
//!
//! - [`BucketAcl`] -- the canned access tag a bucket carries
//! - [`BucketMetadata`] / [`ObjectMetadata`] -- what drivers store per entity
//! - [`BucketResources`] -- listing parameters and their echo-back flags

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default `max-keys` for object listings when the client omits the parameter.
pub const DEFAULT_MAX_KEYS: usize = 1000;

// ---------------------------------------------------------------------------
// BucketAcl
// ---------------------------------------------------------------------------

/// Canned bucket access tag.
///
/// This is the whole access-control surface: no grants, no policies. The tag
/// decides whether anonymous GET/HEAD requests may read objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BucketAcl {
    /// Only authenticated requests may read or write.
    #[default]
    Private,
    /// Anonymous requests may read objects.
    PublicRead,
    /// Anonymous requests may read and write objects.
    PublicReadWrite,
}

impl BucketAcl {
    /// The canonical wire form, as carried by the `x-amz-acl` header.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
            Self::PublicReadWrite => "public-read-write",
        }
    }

    /// Whether anonymous requests may read objects in this bucket.
    #[must_use]
    pub fn is_public_read(&self) -> bool {
        matches!(self, Self::PublicRead | Self::PublicReadWrite)
    }

    /// Whether anonymous requests may write objects into this bucket.
    #[must_use]
    pub fn is_public_write(&self) -> bool {
        matches!(self, Self::PublicReadWrite)
    }
}

impl fmt::Display for BucketAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`BucketAcl`] from an unrecognized tag.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unrecognized ACL: {0}")]
pub struct ParseAclError(pub String);

impl FromStr for BucketAcl {
    type Err = ParseAclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public-read" => Ok(Self::PublicRead),
            "public-read-write" => Ok(Self::PublicReadWrite),
            other => Err(ParseAclError(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Metadata a driver stores for each bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketMetadata {
    /// The bucket name, unique within the service.
    pub name: String,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// The canned access tag.
    pub acl: BucketAcl,
}

/// Metadata a driver stores for each object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// The bucket holding the object.
    pub bucket: String,
    /// The object key. May contain `/`.
    pub key: String,
    /// MIME type; `application/octet-stream` when the client sent none.
    pub content_type: String,
    /// Creation time. Served as `Last-Modified`.
    pub created: DateTime<Utc>,
    /// Hex-encoded MD5 digest of the stored bytes, unquoted.
    pub md5: String,
    /// Size of the stored bytes.
    pub size: u64,
}

impl ObjectMetadata {
    /// The quoted form of the MD5 digest, as served in the `ETag` header.
    #[must_use]
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.md5)
    }
}

// ---------------------------------------------------------------------------
// BucketResources
// ---------------------------------------------------------------------------

/// Parameters for listing objects within a bucket, and the flags the driver
/// sets on the way back (`is_truncated`, `common_prefixes`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketResources {
    /// Only keys beginning with this prefix are listed.
    pub prefix: String,
    /// Keys at or before this marker are skipped.
    pub marker: String,
    /// Keys are rolled up at the first occurrence of this delimiter after
    /// the prefix.
    pub delimiter: String,
    /// Maximum number of keys to return.
    pub max_keys: usize,
    /// Set by the driver: whether the listing stopped at `max_keys`.
    pub is_truncated: bool,
    /// Set by the driver: the rolled-up prefixes when a delimiter is used.
    pub common_prefixes: Vec<String>,
}

impl Default for BucketResources {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            marker: String::new(),
            delimiter: String::new(),
            max_keys: DEFAULT_MAX_KEYS,
            is_truncated: false,
            common_prefixes: Vec::new(),
        }
    }
}
