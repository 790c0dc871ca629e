//! Request routing: method x path x query to an S3 operation.
//!
//! The router parses the path as `/[<bucket>[/<key...>]]` (the whole
//! remainder after the bucket segment is the key, percent-decoded, and may
//! contain `/`) and inspects the query string for sub-resource keys. A
//! recognized sub-resource (`?acl`, `?policy`, `?uploads`, ...) preempts
//! routing: those operation variants are answered with `NotImplemented`
//! regardless of method. So are verbs outside the supported table.

use http::Method;
use percent_encoding::percent_decode_str;

use crate::error::{ApiError, ApiErrorCode};

/// Sub-resource query keys this service recognizes but does not implement.
const SUB_RESOURCES: &[&str] = &[
    "acl",
    "cors",
    "lifecycle",
    "location",
    "logging",
    "notification",
    "policy",
    "requestPayment",
    "tagging",
    "torrent",
    "uploadId",
    "uploads",
    "versioning",
    "versions",
    "website",
];

/// The operations the HTTP core implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `GET /` -- list all buckets.
    ListBuckets,
    /// `GET /{bucket}` -- list objects in a bucket.
    ListObjects,
    /// `HEAD /{bucket}` -- probe a bucket.
    HeadBucket,
    /// `PUT /{bucket}` -- create a bucket.
    CreateBucket,
    /// `GET /{bucket}/{key}` -- read an object, whole or by range.
    GetObject,
    /// `HEAD /{bucket}/{key}` -- read object headers.
    HeadObject,
    /// `PUT /{bucket}/{key}` -- store an object.
    CreateObject,
    /// Anything this service recognizes but does not support.
    NotImplemented,
}

impl Operation {
    /// The operation name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListBuckets => "ListBuckets",
            Self::ListObjects => "ListObjects",
            Self::HeadBucket => "HeadBucket",
            Self::CreateBucket => "CreateBucket",
            Self::GetObject => "GetObject",
            Self::HeadObject => "HeadObject",
            Self::CreateObject => "CreateObject",
            Self::NotImplemented => "NotImplemented",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of routing an HTTP request.
#[derive(Debug, Clone)]
pub struct RouteContext {
    /// The identified operation.
    pub operation: Operation,
    /// Bucket named by the path, when there is one.
    pub bucket: Option<String>,
    /// Object key named by the path, when there is one.
    pub key: Option<String>,
    /// Decoded query parameters.
    pub query: Vec<(String, String)>,
}

/// Routes requests under an optional mount prefix.
#[derive(Debug, Clone)]
pub struct Router {
    /// Path prefix the service is mounted at (empty for `/`).
    prefix: String,
}

impl Router {
    /// Create a router mounted at `prefix`.
    ///
    /// The prefix is stripped from incoming paths before bucket/key
    /// resolution; `""` and `"/"` both mean the root.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if prefix == "/" {
            prefix.clear();
        }
        Self { prefix }
    }

    /// Resolve a request to an operation plus bucket/key/query.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidArgument` [`ApiError`] if the path does not start
    /// with the configured mount prefix.
    pub fn resolve<B>(&self, req: &http::Request<B>) -> Result<RouteContext, ApiError> {
        let uri = req.uri();
        let path = uri.path();

        let path = if self.prefix.is_empty() {
            path
        } else {
            path.strip_prefix(self.prefix.as_str()).ok_or_else(|| {
                ApiError::invalid_argument("request path is outside the service mount prefix")
            })?
        };

        let query = split_query(uri.query().unwrap_or(""));
        let (bucket, key) = split_bucket_and_key(path);

        let operation = if query.iter().any(|(k, _)| SUB_RESOURCES.contains(&k.as_str())) {
            Operation::NotImplemented
        } else {
            identify_operation(req.method(), bucket.is_some(), key.is_some())
        };

        Ok(RouteContext {
            operation,
            bucket,
            key,
            query,
        })
    }
}

/// Split a request path into bucket and key.
///
/// The first segment names the bucket; everything after it, slashes
/// included, is the key. Both come back percent-decoded. A bare `/` yields
/// neither.
fn split_bucket_and_key(path: &str) -> (Option<String>, Option<String>) {
    let mut segments = path.trim_start_matches('/').splitn(2, '/');
    let bucket = segments.next().filter(|s| !s.is_empty());
    let key = segments.next().filter(|s| !s.is_empty());
    (bucket.map(decode_component), key.map(decode_component))
}

/// Percent-decode one path or query component.
fn decode_component(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Split a query string into decoded name/value pairs.
///
/// Bare keys (`?acl`) come back with an empty value.
fn split_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => (decode_component(name), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

/// The value of query parameter `name`, if present.
#[must_use]
pub fn query_value<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find_map(|(k, v)| (k == name).then_some(v.as_str()))
}

/// Map method and path shape onto an operation.
fn identify_operation(method: &Method, has_bucket: bool, has_key: bool) -> Operation {
    match (method, has_bucket, has_key) {
        (&Method::GET, false, false) => Operation::ListBuckets,
        (&Method::GET, true, false) => Operation::ListObjects,
        (&Method::HEAD, true, false) => Operation::HeadBucket,
        (&Method::PUT, true, false) => Operation::CreateBucket,
        (&Method::GET, true, true) => Operation::GetObject,
        (&Method::HEAD, true, true) => Operation::HeadObject,
        (&Method::PUT, true, true) => Operation::CreateObject,
        // DELETE, POST, and anything else the table does not cover.
        _ => Operation::NotImplemented,
    }
}

/// The error answered for any unimplemented operation variant.
#[must_use]
pub fn not_implemented_error(path: &str) -> ApiError {
    ApiError::new(ApiErrorCode::NotImplemented).with_resource(path)
}
