//! The S3 HTTP service: the full request pipeline behind a hyper `Service`.
//!
//! [`S3Service`] ties together routing, signature verification, dispatch, and
//! response shaping:
//!
//! 1. Request-id generation (carried in logs and `x-amz-request-id`)
//! 2. Routing via [`Router`] (mount-prefix strip, bucket/key/query)
//! 3. SigV2 authentication, with the anonymous-read carve-out for object GET/HEAD
//! 4. Dispatch to the operation handler
//! 5. Error shaping in the negotiated format (HEAD errors carry no body)
//! 6. Common response headers (`Server`, `Date`, `x-amz-request-id`)
//!
//! [`S3Service::handle`] is generic over the request body type, so tests
//! drive the full pipeline with `http_body_util::Full<Bytes>` and the server
//! runs it over `hyper::body::Incoming`.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cumulus_auth::sigv2::DEFAULT_MAX_SKEW;
use cumulus_auth::{verify_sigv2, CredentialProvider};
use cumulus_driver::Driver;

use crate::body::ResponseBody;
use crate::error::ApiError;
use crate::handlers::{self, HandlerContext};
use crate::response::{add_common_headers, error_to_response, negotiate};
use crate::router::{not_implemented_error, Operation, RouteContext, Router};

/// Configuration for the S3 HTTP service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Skip SigV2 verification entirely (development and tests only).
    pub skip_signature_validation: bool,
    /// Allowed difference between the request `Date` and server time.
    pub max_clock_skew: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            skip_signature_validation: false,
            max_clock_skew: DEFAULT_MAX_SKEW,
        }
    }
}

/// The S3-compatible HTTP service over a storage driver.
///
/// Mountable at any path prefix; cloning is cheap (the driver, credentials,
/// and config are shared).
pub struct S3Service<D> {
    driver: Arc<D>,
    router: Router,
    credentials: Arc<dyn CredentialProvider>,
    config: Arc<ServiceConfig>,
}

impl<D: Driver> S3Service<D> {
    /// Create a service mounted at `prefix` over `driver`.
    #[must_use]
    pub fn new(
        prefix: impl Into<String>,
        driver: D,
        credentials: Arc<dyn CredentialProvider>,
        config: ServiceConfig,
    ) -> Self {
        Self::from_shared(prefix, Arc::new(driver), credentials, config)
    }

    /// Create a service from an already shared driver.
    #[must_use]
    pub fn from_shared(
        prefix: impl Into<String>,
        driver: Arc<D>,
        credentials: Arc<dyn CredentialProvider>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            driver,
            router: Router::new(prefix),
            credentials,
            config: Arc::new(config),
        }
    }

    /// Process one request through the full pipeline.
    ///
    /// Never fails: every error becomes a well-formed S3 error response.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<ResponseBody>
    where
        B: http_body::Body<Data = Bytes> + Send + Unpin + 'static,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        let request_id = Uuid::new_v4().to_string();
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let format = negotiate(req.headers());

        debug!(%method, path = %path, request_id = %request_id, "processing request");

        let response = match self.process(req, &request_id).await {
            Ok(response) => response,
            Err(mut err) => {
                if err.resource.is_none() {
                    err = err.with_resource(&path);
                }
                debug!(
                    code = %err.code,
                    status = %err.status_code(),
                    request_id = %request_id,
                    "request failed"
                );
                error_to_response(&err, &request_id, format)
            }
        };

        // HEAD responses carry headers only, success or error.
        let mut response = response;
        if method == http::Method::HEAD {
            *response.body_mut() = ResponseBody::empty();
        }

        add_common_headers(response, &request_id)
    }

    /// Route, authenticate, and dispatch.
    async fn process<B>(
        &self,
        req: http::Request<B>,
        request_id: &str,
    ) -> Result<http::Response<ResponseBody>, ApiError>
    where
        B: http_body::Body<Data = Bytes> + Send + Unpin + 'static,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        let ctx = self.router.resolve(&req)?;

        info!(
            operation = %ctx.operation,
            bucket = ?ctx.bucket,
            key = ?ctx.key,
            request_id = %request_id,
            "routed request"
        );

        if ctx.operation == Operation::NotImplemented {
            return Err(not_implemented_error(req.uri().path()));
        }

        let (parts, body) = req.into_parts();

        let authenticated = self.authenticate(&parts, ctx.operation)?;
        let hctx = HandlerContext {
            authenticated,
            format: negotiate(&parts.headers),
        };

        self.dispatch(ctx, hctx, parts, body).await
    }

    /// Verify the request signature, or admit it anonymously where allowed.
    ///
    /// Returns whether the request is authenticated. Anonymous requests pass
    /// only for object reads; the handler then checks the bucket ACL.
    fn authenticate(
        &self,
        parts: &http::request::Parts,
        operation: Operation,
    ) -> Result<bool, ApiError> {
        if self.config.skip_signature_validation {
            return Ok(true);
        }

        if parts.headers.contains_key(http::header::AUTHORIZATION) {
            verify_sigv2(parts, self.credentials.as_ref(), self.config.max_clock_skew).map_err(
                |e| {
                    warn!(error = %e, "signature verification failed");
                    ApiError::from(e)
                },
            )?;
            return Ok(true);
        }

        match operation {
            Operation::GetObject | Operation::HeadObject => Ok(false),
            _ => Err(ApiError::access_denied()),
        }
    }

    /// Call the handler for the routed operation.
    async fn dispatch<B>(
        &self,
        ctx: RouteContext,
        hctx: HandlerContext,
        parts: http::request::Parts,
        body: B,
    ) -> Result<http::Response<ResponseBody>, ApiError>
    where
        B: http_body::Body<Data = Bytes> + Send + Unpin + 'static,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        let bucket = ctx.bucket.as_deref().unwrap_or_default();
        let key = ctx.key.as_deref().unwrap_or_default();

        match ctx.operation {
            Operation::ListBuckets => {
                handlers::bucket::list_buckets(self.driver.as_ref(), &hctx).await
            }
            Operation::ListObjects => {
                handlers::bucket::list_objects(self.driver.as_ref(), &hctx, bucket, &ctx.query)
                    .await
            }
            Operation::HeadBucket => handlers::bucket::head_bucket(self.driver.as_ref(), bucket).await,
            Operation::CreateBucket => {
                handlers::bucket::create_bucket(self.driver.as_ref(), &parts, bucket).await
            }
            Operation::CreateObject => {
                handlers::object::create_object(self.driver.as_ref(), &parts, body, bucket, key)
                    .await
            }
            Operation::GetObject => {
                handlers::object::get_object(&self.driver, &hctx, &parts, bucket, key, false).await
            }
            Operation::HeadObject => {
                handlers::object::get_object(&self.driver, &hctx, &parts, bucket, key, true).await
            }
            Operation::NotImplemented => Err(ApiError::not_implemented()),
        }
    }
}

impl<D: std::fmt::Debug> std::fmt::Debug for S3Service<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Service")
            .field("driver", &self.driver)
            .field("router", &self.router)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<D> Clone for S3Service<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            router: self.router.clone(),
            credentials: Arc::clone(&self.credentials),
            config: Arc::clone(&self.config),
        }
    }
}

impl<D: Driver> Service<http::Request<Incoming>> for S3Service<D> {
    type Response = http::Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
