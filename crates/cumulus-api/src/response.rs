//! Response serialization: XML and JSON bodies, header assembly.
//!
//! All bodies follow the AWS S3 RestXml conventions:
//!
//! - Namespace: `http://s3.amazonaws.com/doc/2006-03-01/`
//! - Booleans: lowercase `true`/`false`
//! - Timestamps: ISO 8601 (`2006-02-03T16:45:09.000Z`)
//! - XML declaration: `<?xml version="1.0" encoding="UTF-8"?>`
//!
//! Content negotiation follows the first media range in `Accept`: exactly
//! `application/json` selects JSON, anything else selects XML. The JSON
//! documents are serialized from plain domain structs whose fields are
//! renamed to the XML element names, so no serializer-framework artifact can
//! appear in the output.

use std::io;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;

use cumulus_driver::{BucketMetadata, BucketResources, ObjectMetadata};

use crate::body::ResponseBody;
use crate::error::ApiError;

/// Namespace carried on every XML root element.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// `Server` header value.
pub const SERVER_NAME: &str = "Cumulus";

/// Owner reported in listings. Single-tenant service, so it is a constant.
const OWNER_ID: &str = "cumulus";

// ---------------------------------------------------------------------------
// Content negotiation
// ---------------------------------------------------------------------------

/// The serialization a response body uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentFormat {
    /// `application/xml` (the default).
    #[default]
    Xml,
    /// `application/json`, selected by the `Accept` header.
    Json,
}

impl ContentFormat {
    /// The `Content-Type` header value for this format.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Xml => "application/xml",
            Self::Json => "application/json",
        }
    }
}

/// Negotiate the response format from the `Accept` header.
///
/// Only the first media range counts; parameters (`;q=...`) are ignored.
#[must_use]
pub fn negotiate(headers: &http::HeaderMap) -> ContentFormat {
    let first = headers
        .get(http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.split(';').next().unwrap_or(v).trim());

    match first {
        Some("application/json") => ContentFormat::Json,
        _ => ContentFormat::Xml,
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Format a timestamp as ISO 8601 with milliseconds and `Z` suffix.
#[must_use]
pub fn format_iso8601(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Format a timestamp as an RFC 1123 HTTP date.
#[must_use]
pub fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

// ---------------------------------------------------------------------------
// Listing documents
// ---------------------------------------------------------------------------

/// `<Owner>` element.
#[derive(Debug, Clone, Serialize)]
pub struct Owner {
    /// `<ID>` element.
    #[serde(rename = "ID")]
    pub id: String,
    /// `<DisplayName>` element.
    #[serde(rename = "DisplayName")]
    pub display_name: String,
}

impl Default for Owner {
    fn default() -> Self {
        Self {
            id: OWNER_ID.to_owned(),
            display_name: OWNER_ID.to_owned(),
        }
    }
}

/// `<Bucket>` entry in a bucket listing.
#[derive(Debug, Clone, Serialize)]
pub struct BucketEntry {
    /// `<Name>` element.
    #[serde(rename = "Name")]
    pub name: String,
    /// `<CreationDate>` element, ISO 8601 UTC.
    #[serde(rename = "CreationDate")]
    pub creation_date: String,
}

/// `<Buckets>` wrapper around the repeated `<Bucket>` entries.
#[derive(Debug, Clone, Serialize)]
pub struct Buckets {
    /// The repeated `<Bucket>` elements.
    #[serde(rename = "Bucket")]
    pub bucket: Vec<BucketEntry>,
}

/// `<ListAllMyBucketsResult>` document.
#[derive(Debug, Clone, Serialize)]
pub struct ListAllMyBucketsResult {
    /// `<Owner>` element.
    #[serde(rename = "Owner")]
    pub owner: Owner,
    /// `<Buckets>` element.
    #[serde(rename = "Buckets")]
    pub buckets: Buckets,
}

impl ListAllMyBucketsResult {
    /// Build the document from driver bucket metadata.
    #[must_use]
    pub fn from_buckets(buckets: &[BucketMetadata]) -> Self {
        Self {
            owner: Owner::default(),
            buckets: Buckets {
                bucket: buckets
                    .iter()
                    .map(|b| BucketEntry {
                        name: b.name.clone(),
                        creation_date: format_iso8601(&b.created),
                    })
                    .collect(),
            },
        }
    }
}

/// `<Contents>` entry in an object listing.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectEntry {
    /// `<Key>` element.
    #[serde(rename = "Key")]
    pub key: String,
    /// `<LastModified>` element, ISO 8601 UTC.
    #[serde(rename = "LastModified")]
    pub last_modified: String,
    /// `<ETag>` element, quoted hex MD5.
    #[serde(rename = "ETag")]
    pub etag: String,
    /// `<Size>` element.
    #[serde(rename = "Size")]
    pub size: u64,
    /// `<StorageClass>` element. Always `STANDARD`.
    #[serde(rename = "StorageClass")]
    pub storage_class: &'static str,
    /// `<Owner>` element.
    #[serde(rename = "Owner")]
    pub owner: Owner,
}

/// `<CommonPrefixes>` entry.
#[derive(Debug, Clone, Serialize)]
pub struct CommonPrefixEntry {
    /// `<Prefix>` element.
    #[serde(rename = "Prefix")]
    pub prefix: String,
}

/// `<ListBucketResult>` document.
#[derive(Debug, Clone, Serialize)]
pub struct ListBucketResult {
    /// `<Name>` element: the bucket listed.
    #[serde(rename = "Name")]
    pub name: String,
    /// `<Prefix>` element, echoed from the request.
    #[serde(rename = "Prefix")]
    pub prefix: String,
    /// `<Marker>` element, echoed from the request.
    #[serde(rename = "Marker")]
    pub marker: String,
    /// `<MaxKeys>` element, echoed from the request.
    #[serde(rename = "MaxKeys")]
    pub max_keys: usize,
    /// `<Delimiter>` element, omitted when no delimiter was given.
    #[serde(rename = "Delimiter", skip_serializing_if = "String::is_empty")]
    pub delimiter: String,
    /// `<IsTruncated>` element.
    #[serde(rename = "IsTruncated")]
    pub is_truncated: bool,
    /// The repeated `<Contents>` elements.
    #[serde(rename = "Contents")]
    pub contents: Vec<ObjectEntry>,
    /// The repeated `<CommonPrefixes>` elements.
    #[serde(rename = "CommonPrefixes")]
    pub common_prefixes: Vec<CommonPrefixEntry>,
}

impl ListBucketResult {
    /// Build the document from the request resources and driver results.
    #[must_use]
    pub fn from_listing(
        bucket: &str,
        objects: &[ObjectMetadata],
        resources: &BucketResources,
    ) -> Self {
        Self {
            name: bucket.to_owned(),
            prefix: resources.prefix.clone(),
            marker: resources.marker.clone(),
            max_keys: resources.max_keys,
            delimiter: resources.delimiter.clone(),
            is_truncated: resources.is_truncated,
            contents: objects
                .iter()
                .map(|o| ObjectEntry {
                    key: o.key.clone(),
                    last_modified: format_iso8601(&o.created),
                    etag: o.etag(),
                    size: o.size,
                    storage_class: "STANDARD",
                    owner: Owner::default(),
                })
                .collect(),
            common_prefixes: resources
                .common_prefixes
                .iter()
                .map(|p| CommonPrefixEntry { prefix: p.clone() })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// XML serialization
// ---------------------------------------------------------------------------

/// An S3 XML document under construction: the declaration, a namespaced
/// root element, and whatever the caller emits in between.
struct XmlDocument {
    writer: Writer<Vec<u8>>,
    root: &'static str,
}

impl XmlDocument {
    /// Start a document: declaration plus the opened root element.
    fn open(root: &'static str) -> io::Result<Self> {
        let mut writer = Writer::new(Vec::with_capacity(512));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut start = BytesStart::new(root);
        start.push_attribute(("xmlns", S3_NAMESPACE));
        writer.write_event(Event::Start(start))?;

        Ok(Self { writer, root })
    }

    /// Emit an opening `<tag>`.
    fn open_element(&mut self, tag: &str) -> io::Result<()> {
        self.writer.write_event(Event::Start(BytesStart::new(tag)))
    }

    /// Emit a closing `</tag>`.
    fn close_element(&mut self, tag: &str) -> io::Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(tag)))
    }

    /// Emit `<tag>text</tag>` with the text escaped.
    fn text_element(&mut self, tag: &str, text: &str) -> io::Result<()> {
        self.open_element(tag)?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.close_element(tag)
    }

    /// Close the root element and hand back the document bytes.
    fn finish(mut self) -> io::Result<Vec<u8>> {
        self.writer.write_event(Event::End(BytesEnd::new(self.root)))?;
        Ok(self.writer.into_inner())
    }
}

/// Assemble a complete document.
///
/// Serialization into a `Vec` cannot fail unless there is a logic bug, in
/// which case the failure is logged and an empty body returned.
fn build_xml<F>(root: &'static str, fill: F) -> Vec<u8>
where
    F: FnOnce(&mut XmlDocument) -> io::Result<()>,
{
    let document = XmlDocument::open(root).and_then(|mut doc| {
        fill(&mut doc)?;
        doc.finish()
    });

    document.unwrap_or_else(|e| {
        tracing::error!(error = %e, root, "XML serialization failed");
        Vec::new()
    })
}

/// Emit a populated `<Owner>` element.
fn owner_elements(doc: &mut XmlDocument, owner: &Owner) -> io::Result<()> {
    doc.open_element("Owner")?;
    doc.text_element("ID", &owner.id)?;
    doc.text_element("DisplayName", &owner.display_name)?;
    doc.close_element("Owner")
}

impl ListAllMyBucketsResult {
    /// Serialize as `<ListAllMyBucketsResult>` XML.
    #[must_use]
    pub fn to_xml(&self) -> Vec<u8> {
        build_xml("ListAllMyBucketsResult", |doc| {
            owner_elements(doc, &self.owner)?;
            doc.open_element("Buckets")?;
            for bucket in &self.buckets.bucket {
                doc.open_element("Bucket")?;
                doc.text_element("Name", &bucket.name)?;
                doc.text_element("CreationDate", &bucket.creation_date)?;
                doc.close_element("Bucket")?;
            }
            doc.close_element("Buckets")
        })
    }
}

impl ListBucketResult {
    /// Serialize as `<ListBucketResult>` XML.
    #[must_use]
    pub fn to_xml(&self) -> Vec<u8> {
        build_xml("ListBucketResult", |doc| {
            doc.text_element("Name", &self.name)?;
            doc.text_element("Prefix", &self.prefix)?;
            doc.text_element("Marker", &self.marker)?;
            doc.text_element("MaxKeys", &self.max_keys.to_string())?;
            if !self.delimiter.is_empty() {
                doc.text_element("Delimiter", &self.delimiter)?;
            }
            let truncated = if self.is_truncated { "true" } else { "false" };
            doc.text_element("IsTruncated", truncated)?;

            for entry in &self.contents {
                doc.open_element("Contents")?;
                doc.text_element("Key", &entry.key)?;
                doc.text_element("LastModified", &entry.last_modified)?;
                doc.text_element("ETag", &entry.etag)?;
                doc.text_element("Size", &entry.size.to_string())?;
                doc.text_element("StorageClass", entry.storage_class)?;
                owner_elements(doc, &entry.owner)?;
                doc.close_element("Contents")?;
            }
            for cp in &self.common_prefixes {
                doc.open_element("CommonPrefixes")?;
                doc.text_element("Prefix", &cp.prefix)?;
                doc.close_element("CommonPrefixes")?;
            }
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Negotiated document responses
// ---------------------------------------------------------------------------

/// Build a 200 response carrying a listing document in the negotiated format.
#[must_use]
pub fn document_response<T>(document: &T, xml: Vec<u8>, format: ContentFormat) -> http::Response<ResponseBody>
where
    T: Serialize,
{
    let body = match format {
        ContentFormat::Xml => xml,
        ContentFormat::Json => serde_json::to_vec(document).unwrap_or_default(),
    };

    http::Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, format.content_type())
        .body(ResponseBody::from_bytes(body))
        .unwrap_or_else(|_| internal_fallback_response())
}

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

/// `<Error>` document. Flat, no outer wrapper.
#[derive(Debug, Serialize)]
struct ErrorDocument<'a> {
    #[serde(rename = "Code")]
    code: &'a str,
    #[serde(rename = "Message")]
    message: &'a str,
    #[serde(rename = "Resource", skip_serializing_if = "Option::is_none")]
    resource: Option<&'a str>,
    #[serde(rename = "RequestId")]
    request_id: &'a str,
}

/// Serialize an error as the S3 `<Error>` XML body.
#[must_use]
pub fn error_to_xml(
    code: &str,
    message: &str,
    resource: Option<&str>,
    request_id: &str,
) -> Vec<u8> {
    build_xml("Error", |doc| {
        doc.text_element("Code", code)?;
        doc.text_element("Message", message)?;
        if let Some(resource) = resource {
            doc.text_element("Resource", resource)?;
        }
        doc.text_element("RequestId", request_id)
    })
}

/// Convert an [`ApiError`] into an HTTP error response in the negotiated
/// format.
#[must_use]
pub fn error_to_response(
    err: &ApiError,
    request_id: &str,
    format: ContentFormat,
) -> http::Response<ResponseBody> {
    let document = ErrorDocument {
        code: err.code.as_str(),
        message: &err.message,
        resource: err.resource.as_deref(),
        request_id,
    };

    let body = match format {
        ContentFormat::Xml => error_to_xml(
            document.code,
            document.message,
            document.resource,
            request_id,
        ),
        ContentFormat::Json => serde_json::to_vec(&document).unwrap_or_default(),
    };

    http::Response::builder()
        .status(err.status_code())
        .header(http::header::CONTENT_TYPE, format.content_type())
        .body(ResponseBody::from_bytes(body))
        .unwrap_or_else(|_| internal_fallback_response())
}

/// Last-resort response when even the error response fails to build.
fn internal_fallback_response() -> http::Response<ResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::INTERNAL_SERVER_ERROR)
        .body(ResponseBody::empty())
        .expect("static response should be valid")
}

// ---------------------------------------------------------------------------
// Common headers
// ---------------------------------------------------------------------------

/// Add the headers every response carries: `Server`, `Date`, and
/// `x-amz-request-id`.
#[must_use]
pub fn add_common_headers(
    mut response: http::Response<ResponseBody>,
    request_id: &str,
) -> http::Response<ResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::header::HeaderValue::from_str(request_id) {
        headers.insert("x-amz-request-id", hv);
    }

    headers.insert(
        http::header::SERVER,
        http::header::HeaderValue::from_static(SERVER_NAME),
    );

    if let Ok(hv) = http::header::HeaderValue::from_str(&format_http_date(&Utc::now())) {
        headers.insert(http::header::DATE, hv);
    }

    response
}
