//! Prometheus-backed metrics and HTTP exporter.
//!
//! Grounded on the teacher's `metrics/prometheus.rs` (same
//! `MetricsRegistry`/`run_prometheus_http_server`/`handle_request` shape,
//! same `hyper` 1.x exporter), with the gauges/counters repurposed from
//! ML-verification metrics to chain-domain ones.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    body::Incoming, header, server::conn::http1, service::service_fn, Method, Request, Response,
    StatusCode,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{self, Encoder, Gauge, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

/// Chain-domain Prometheus metrics.
#[derive(Clone)]
pub struct ChainMetrics {
    /// Latency of `Block::validate`, in seconds.
    pub block_validation_seconds: prometheus::Histogram,
    /// Total blocks inserted into the live tree.
    pub blocks_imported: IntCounter,
    /// Total blocks rejected by structural or creator validation.
    pub blocks_rejected: IntCounter,
    /// Total judgements recorded (own and received).
    pub judgements_tallied: IntCounter,
    /// Total subtree relocations caused by a deny quorum.
    pub branches_relocated: IntCounter,
    /// Current depth of the dangling-block queue.
    pub dangling_queue_depth: Gauge,
}

impl ChainMetrics {
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let block_validation_seconds = prometheus::Histogram::with_opts(
            HistogramOpts::new(
                "chain_block_validation_seconds",
                "Time to run structural block validation, in seconds",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(block_validation_seconds.clone()))?;

        let blocks_imported = IntCounter::with_opts(Opts::new(
            "chain_blocks_imported_total",
            "Total blocks inserted into the live tree",
        ))?;
        registry.register(Box::new(blocks_imported.clone()))?;

        let blocks_rejected = IntCounter::with_opts(Opts::new(
            "chain_blocks_rejected_total",
            "Total blocks rejected by structural or creator validation",
        ))?;
        registry.register(Box::new(blocks_rejected.clone()))?;

        let judgements_tallied = IntCounter::with_opts(Opts::new(
            "chain_judgements_tallied_total",
            "Total judgements recorded against any block",
        ))?;
        registry.register(Box::new(judgements_tallied.clone()))?;

        let branches_relocated = IntCounter::with_opts(Opts::new(
            "chain_branches_relocated_total",
            "Total subtree relocations caused by a deny quorum",
        ))?;
        registry.register(Box::new(branches_relocated.clone()))?;

        let dangling_queue_depth = Gauge::with_opts(Opts::new(
            "chain_dangling_queue_depth",
            "Current number of blocks waiting on a missing parent",
        ))?;
        registry.register(Box::new(dangling_queue_depth.clone()))?;

        Ok(Self {
            block_validation_seconds,
            blocks_imported,
            blocks_rejected,
            judgements_tallied,
            branches_relocated,
            dangling_queue_depth,
        })
    }
}

/// Wrapper around a Prometheus registry and the chain metrics.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub chain: ChainMetrics,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("chain".to_string()), None)?;
        let chain = ChainMetrics::register(&registry)?;
        Ok(Self { registry, chain })
    }

    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server exposing `GET /metrics` in Prometheus text format.
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!(error = %err, "metrics HTTP server connection error");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}
