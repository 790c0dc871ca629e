//! Cumulus server - minimalist S3-compatible object storage.
//!
//! Serves the S3 REST surface from `cumulus-api` over the in-memory driver,
//! with a JSON health endpoint for orchestration systems.
//!
//! # Usage
//!
//! ```text
//! CUMULUS_LISTEN=0.0.0.0:9000 cumulus-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CUMULUS_LISTEN` | `0.0.0.0:9000` | Bind address |
//! | `CUMULUS_PREFIX` | *(empty)* | Mount prefix for the S3 surface |
//! | `CUMULUS_ACCESS_KEY` | `cumulus` | Access key clients sign with |
//! | `CUMULUS_SECRET_KEY` | `cumulus-secret` | Matching secret key |
//! | `CUMULUS_SKIP_SIGNATURES` | `false` | Skip SigV2 verification |
//! | `CUMULUS_CLOCK_SKEW_SECS` | `900` | Allowed request date skew |
//! | `CUMULUS_HEADER_TIMEOUT_SECS` | `30` | Header read timeout |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod config;

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cumulus_api::{ResponseBody, S3Service, ServiceConfig};
use cumulus_auth::StaticCredentialProvider;
use cumulus_driver::MemoryDriver;

use crate::config::ServerConfig;

/// Crate version, surfaced through the health endpoint.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The JSON document the health endpoint serves.
fn health_response_body() -> Bytes {
    Bytes::from(format!(
        r#"{{"services":{{"s3":"running"}},"edition":"cumulus","version":"{VERSION}"}}"#,
    ))
}

/// Routes health probes to a static JSON body and everything else to the
/// S3 service.
#[derive(Clone)]
struct HealthCheckService {
    s3: S3Service<MemoryDriver>,
}

impl Service<Request<Incoming>> for HealthCheckService {
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let is_probe = req.method() == http::Method::GET
            && matches!(req.uri().path(), "/health" | "/_health");

        if is_probe {
            return Box::pin(async {
                let response = Response::builder()
                    .status(StatusCode::OK)
                    .header("content-type", "application/json")
                    .body(ResponseBody::from_bytes(health_response_body()))
                    .expect("static health response should be valid");
                Ok(response)
            });
        }

        self.s3.call(req)
    }
}

/// Set up the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the `LOG_LEVEL` config value becomes
/// the filter directive.
fn setup_logging(default_filter: &str) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) => {
            EnvFilter::try_new(&directives).with_context(|| format!("bad RUST_LOG: {directives}"))?
        }
        Err(_) => EnvFilter::try_new(default_filter)
            .with_context(|| format!("bad LOG_LEVEL filter: {default_filter}"))?,
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Build the request-handling service from configuration.
fn build_service(config: &ServerConfig) -> HealthCheckService {
    let credentials = Arc::new(StaticCredentialProvider::new(vec![(
        config.access_key.clone(),
        config.secret_key.clone(),
    )]));

    let s3 = S3Service::new(
        config.prefix.clone(),
        MemoryDriver::new(),
        credentials,
        ServiceConfig {
            skip_signature_validation: config.skip_signatures,
            max_clock_skew: config.clock_skew,
        },
    );

    HealthCheckService { s3 }
}

/// Accept connections until ctrl-c, then drain in-flight requests.
async fn run_until_shutdown(
    listener: TcpListener,
    service: HealthCheckService,
    config: &ServerConfig,
) -> Result<()> {
    let mut connection_builder = HttpConnBuilder::new(TokioExecutor::new());
    connection_builder
        .http1()
        .header_read_timeout(config.header_read_timeout);

    let drain = hyper_util::server::graceful::GracefulShutdown::new();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
            _ = &mut ctrl_c => break,
        };

        let connection =
            connection_builder.serve_connection(TokioIo::new(stream), service.clone());
        let connection = drain.watch(connection.into_owned());

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(remote = %remote, error = %e, "connection closed with error");
            }
        });
    }

    info!("shutdown requested, draining in-flight requests");
    drain.shutdown().await;
    info!("drained, exiting");

    Ok(())
}

/// Probe a running server's health endpoint over a raw TCP connection.
///
/// Used by the `--health-check` mode for container HEALTHCHECK probes.
async fn probe_health(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .with_context(|| format!("health probe cannot reach {addr}"))?;

    let probe = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(probe.as_bytes()).await?;
    stream.shutdown().await?;

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await?;

    let healthy = raw.starts_with("HTTP/1.1 200") && raw.contains("\"s3\":\"running\"");
    anyhow::ensure!(healthy, "unexpected health response from {addr}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env();

    // `cumulus-server --health-check` probes an already-running instance
    // and reports health through the exit code.
    if std::env::args().any(|arg| arg == "--health-check") {
        let target = config.listen.replace("0.0.0.0", "127.0.0.1");
        if probe_health(&target).await.is_err() {
            std::process::exit(1);
        }
        return Ok(());
    }

    setup_logging(&config.log_level)?;

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("cannot parse bind address {}", config.listen))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;

    info!(
        %addr,
        prefix = %config.prefix,
        skip_signatures = config.skip_signatures,
        version = VERSION,
        "cumulus server listening",
    );

    run_until_shutdown(listener, build_service(&config), &config).await
}
