//! RAID Health Exporter
//!
//! Serves HPE Smart Array and SMART disk health as Prometheus metrics.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │  HTTP scrape │───▶│  Collector   │───▶│   Exporter   │
//! │  (/metrics)  │    │ ssacli/smart │    │   (gauges)   │
//! └──────────────┘    └──────────────┘    └──────────────┘
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use raid_health_exporter::error::{Error, Result};
use raid_health_exporter::{exporter, Collector, CollectorConfig};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Prometheus exporter for ssacli and smartctl
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:9633")]
    listen: String,

    /// URL path for surfacing collected metrics
    #[arg(long, env = "METRICS_PATH", default_value = "/metrics")]
    path: String,

    /// Path to the raid controller device (e.g. /dev/sda or /dev/sg0)
    #[arg(long, env = "DEVICE", default_value = "/dev/sda")]
    device: String,

    /// Device for one controller slot, as SLOT=DEVICE (repeatable)
    #[arg(
        long = "slot-device",
        env = "SLOT_DEVICES",
        value_delimiter = ',',
        value_parser = parse_slot_device
    )]
    slot_devices: Vec<(String, String)>,

    /// ssacli binary
    #[arg(long, env = "SSACLI_BIN", default_value = "ssacli")]
    ssacli: String,

    /// smartctl binary
    #[arg(long, env = "SMARTCTL_BIN", default_value = "smartctl")]
    smartctl: String,

    /// Timeout for each external command in seconds
    #[arg(long, env = "COMMAND_TIMEOUT_SECONDS", default_value = "30")]
    command_timeout_seconds: u64,

    /// Read all drives of a slot with a single `show detail` call
    #[arg(long, env = "BULK_DETAIL")]
    bulk_detail: bool,

    /// Skip smartctl collection
    #[arg(long, env = "NO_SMART")]
    no_smart: bool,

    /// Collect once, print the snapshot as JSON and exit
    #[arg(long)]
    once: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            ssacli_path: self.ssacli.clone(),
            smartctl_path: self.smartctl.clone(),
            device_path: self.device.clone(),
            slot_devices: self.slot_devices.iter().cloned().collect(),
            command_timeout: Duration::from_secs(self.command_timeout_seconds),
            bulk_detail: self.bulk_detail,
            smart_enabled: !self.no_smart,
        }
    }
}

fn parse_slot_device(value: &str) -> std::result::Result<(String, String), String> {
    match value.split_once('=') {
        Some((slot, device)) if !slot.trim().is_empty() && !device.trim().is_empty() => {
            Ok((slot.trim().to_string(), device.trim().to_string()))
        }
        _ => Err(format!("expected SLOT=DEVICE, got {value:?}")),
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    if !args.path.starts_with('/') {
        return Err(Error::Config(format!(
            "metrics path must start with '/': {}",
            args.path
        )));
    }

    let collector = Collector::new(args.collector_config());

    if args.once {
        let snapshot = collector.collect().await;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    info!("Starting RAID health exporter");
    info!("  Controller device: {}", args.device);
    for (slot, device) in &args.slot_devices {
        info!("  Slot {} device: {}", slot, device);
    }
    info!("  Metrics path: {}", args.path);
    info!("  Bulk detail: {}", args.bulk_detail);
    info!("  SMART enabled: {}", !args.no_smart);

    let state = Arc::new(AppState {
        collector,
        metrics_path: args.path.clone(),
        device: args.device.clone(),
    });

    run_server(&args.listen, state).await
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "hyper_util=warn"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// HTTP Server
// =============================================================================

struct AppState {
    collector: Collector,
    metrics_path: String,
    device: String,
}

async fn run_server(addr: &str, state: Arc<AppState>) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Config(format!("Invalid listen address {addr}: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind {addr}: {e}")))?;

    info!("Beginning to serve on {}", addr);

    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| Error::Internal(format!("Accept error: {e}")))?;

        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle(req, state.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!(%peer, "Connection error: {}", e);
            }
        });
    }
}

async fn handle(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();

    let response = if path == state.metrics_path {
        let snapshot = state.collector.collect().await;
        match exporter::render(&snapshot) {
            Ok(body) => respond(StatusCode::OK, &exporter::content_type(), body),
            Err(e) => {
                error!("Failed to render metrics: {}", e);
                respond(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "text/plain",
                    format!("failed to render metrics: {e}"),
                )
            }
        }
    } else {
        match path.as_str() {
            "/" => respond(
                StatusCode::OK,
                "text/html; charset=utf-8",
                landing_page(&state.metrics_path, &state.device),
            ),
            "/healthz" => respond(StatusCode::OK, "text/plain", "ok".to_string()),
            _ => respond(StatusCode::NOT_FOUND, "text/plain", "not found".to_string()),
        }
    };
    Ok(response)
}

fn respond(status: StatusCode, content_type: &str, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    let value = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("text/plain"));
    response.headers_mut().insert(CONTENT_TYPE, value);
    response
}

fn landing_page(metrics_path: &str, device: &str) -> String {
    format!(
        "<html>
<head><title>Smartctl &amp; SSACLI Exporter</title></head>
<body>
<h1>Smartctl &amp; SSACLI Exporter</h1>
<p><a href='{metrics_path}'>Metrics</a></p>
<p>Controller Device: {device}</p>
</body>
</html>
"
    )
}
