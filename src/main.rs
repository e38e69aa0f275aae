//! QR Scan CLI
//!
//! Command-line interface for decoding QR codes from image files or from a
//! camera.

use clap::{Parser, Subcommand};
use qrscan::{
    capture::{Camera, CameraError, CameraProvider, Frame, MockCamera},
    config::ScannerConfig,
    metrics::MetricsRegistry,
    session::{ScanMode, ScannerSession, SessionUpdate},
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "qrscan", version, about = "Decode QR codes from images or a camera")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a QR code from an image file.
    Decode {
        /// PNG, JPEG, WebP, GIF or BMP file.
        file: PathBuf,
    },
    /// Scan with a camera until a code is found or Ctrl-C is pressed.
    Camera {
        /// Replay this image as a simulated camera.
        #[arg(long)]
        mock_image: Option<PathBuf>,

        /// Serve Prometheus metrics on this port.
        #[arg(long)]
        metrics_port: Option<u16>,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("QR Scan v{}", qrscan::VERSION);

    let config = match &cli.config {
        Some(path) => match ScannerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ScannerConfig::default(),
    };

    match cli.command {
        Command::Decode { file } => decode(&config, &file),
        Command::Camera {
            mock_image,
            metrics_port,
        } => camera(config, mock_image.as_deref(), metrics_port),
    }
}

fn decode(config: &ScannerConfig, file: &Path) -> ExitCode {
    let bytes = match std::fs::read(file) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read {}: {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let cameras: Arc<dyn CameraProvider> = Arc::new(|| -> Box<dyn Camera + Send> {
        Box::new(MockCamera::failing(CameraError::Unsupported(
            "decode never opens a camera".into(),
        )))
    });
    let mut session = ScannerSession::new(config.clone(), cameras, None);
    if let Err(e) = session.start(ScanMode::Upload) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match session.submit_image(&bytes) {
        Ok(result) => {
            println!("{}", result.text());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn camera(
    config: ScannerConfig,
    mock_image: Option<&Path>,
    metrics_port: Option<u16>,
) -> ExitCode {
    let cameras = match camera_provider(mock_image) {
        Ok(cameras) => cameras,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Arc::new(Notify::new());
    {
        let shutdown = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || shutdown.notify_one()) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    runtime.block_on(async move {
        let mut session = ScannerSession::new(config, cameras, None);

        // Dropping the sender stops the exporter when this block returns.
        let (_stop_metrics, metrics_stopped) = tokio::sync::oneshot::channel::<()>();
        if let Some(port) = metrics_port {
            match MetricsRegistry::new() {
                Ok(registry) => {
                    serve_metrics(port, registry.clone(), metrics_stopped);
                    session = session.with_metrics(registry);
                }
                Err(e) => warn!("Metrics disabled: {}", e),
            }
        }

        if let Err(e) = session.start(ScanMode::Camera) {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
        info!("Point the camera at a QR code (Ctrl-C to stop)");

        loop {
            let update = tokio::select! {
                update = session.next_event() => Some(update),
                _ = shutdown.notified() => None,
            };
            let Some(update) = update else {
                info!("Interrupted, releasing camera");
                session.shutdown();
                return ExitCode::FAILURE;
            };

            match update {
                SessionUpdate::Result(result) => {
                    println!("{}", result.text());
                    if let Some(link) = result.link() {
                        info!(link, "Payload is a web link");
                    }
                    return ExitCode::SUCCESS;
                }
                SessionUpdate::Failed { error, .. } => {
                    eprintln!("{}", error);
                    return ExitCode::FAILURE;
                }
                SessionUpdate::Transient(error) => warn!(error = %error, "Frame skipped"),
                SessionUpdate::Ignored => {}
            }
        }
    })
}

fn camera_provider(mock_image: Option<&Path>) -> Result<Arc<dyn CameraProvider>, String> {
    if let Some(path) = mock_image {
        let image = image::open(path)
            .map_err(|e| format!("Failed to load {}: {}", path.display(), e))?;
        let frame = Frame::from_image(&image, 0);
        info!(path = %path.display(), "Using simulated camera");
        let provider: Arc<dyn CameraProvider> = Arc::new(move || -> Box<dyn Camera + Send> {
            Box::new(MockCamera::with_frames(vec![frame.clone()]))
        });
        return Ok(provider);
    }

    #[cfg(feature = "camera")]
    let provider: Arc<dyn CameraProvider> = Arc::new(|| -> Box<dyn Camera + Send> {
        Box::new(qrscan::capture::DeviceCamera::new())
    });

    #[cfg(not(feature = "camera"))]
    let provider: Arc<dyn CameraProvider> = Arc::new(|| -> Box<dyn Camera + Send> {
        Box::new(MockCamera::failing(CameraError::Unsupported(
            "built without the `camera` feature; use --mock-image".into(),
        )))
    });

    Ok(provider)
}

#[cfg(feature = "metrics")]
fn serve_metrics(
    port: u16,
    registry: MetricsRegistry,
    stop: tokio::sync::oneshot::Receiver<()>,
) {
    use qrscan::metrics::{MetricsServer, MetricsServerConfig};

    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    tokio::spawn(async move {
        let shutdown = async move {
            let _ = stop.await;
        };
        if let Err(e) = server.run_until(shutdown).await {
            warn!("Metrics server stopped: {}", e);
        }
    });
}

#[cfg(not(feature = "metrics"))]
fn serve_metrics(
    port: u16,
    _registry: MetricsRegistry,
    _stop: tokio::sync::oneshot::Receiver<()>,
) {
    warn!(port, "Built without the `metrics` feature; not serving metrics");
}
