//! diagramsnet - diagrams.net rendering service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use diagramsnet_browser::BrowserConnector;
use diagramsnet_core::{OutputFormat, RenderTask};
use diagramsnet_server::{create_router, AppState, WorkerArgs};
use diagramsnet_worker::{Worker, WorkerConfig};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// diagramsnet - render diagrams.net diagrams to SVG and PNG
#[derive(Parser)]
#[command(name = "diagramsnet")]
#[command(about = "Render diagrams.net diagrams with a remote browser", long_about = None)]
struct Cli {
    #[command(flatten)]
    worker: WorkerArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve conversions over HTTP
    Serve {
        /// HTTP bind address
        #[arg(long, env = "DIAGRAMSNET_HTTP_ADDR", default_value = "0.0.0.0:8005")]
        http_addr: SocketAddr,
    },

    /// Convert a single diagram file
    Convert {
        /// Diagram source file
        input: PathBuf,

        /// Produce PNG instead of SVG
        #[arg(long)]
        png: bool,

        /// Fetch and inline remote images
        #[arg(long = "unsafe")]
        allow_remote_images: bool,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("diagramsnet=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = cli.worker.worker_config();
    let worker = Worker::new(config.clone(), connector(&config)?);

    match cli.command {
        Commands::Serve { http_addr } => serve(worker, http_addr).await?,
        Commands::Convert {
            input,
            png,
            allow_remote_images,
            output,
        } => {
            let format = if png {
                OutputFormat::Png
            } else {
                OutputFormat::Svg
            };
            convert(worker, input, format, allow_remote_images, output).await?
        }
    }

    Ok(())
}

#[cfg(feature = "chrome")]
fn connector(
    config: &WorkerConfig,
) -> Result<Arc<dyn BrowserConnector>, Box<dyn std::error::Error>> {
    Ok(Arc::new(diagramsnet_browser::chrome::ChromeConnector::for_deadline(
        config.convert_timeout,
    )))
}

#[cfg(not(feature = "chrome"))]
fn connector(
    _config: &WorkerConfig,
) -> Result<Arc<dyn BrowserConnector>, Box<dyn std::error::Error>> {
    Err("diagramsnet was built without a browser backend; enable the `chrome` feature".into())
}

async fn serve(worker: Worker, http_addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        http_addr = %http_addr,
        browser_endpoint = %worker.config().browser_endpoint,
        page_url = %worker.config().page_url,
        convert_timeout_ms = worker.config().convert_timeout.as_millis() as u64,
        "Starting diagramsnet"
    );

    let router = create_router(AppState::new(worker));
    let listener = TcpListener::bind(http_addr).await?;
    info!("HTTP server listening on {}", http_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn convert(
    worker: Worker,
    input: PathBuf,
    format: OutputFormat,
    allow_remote_images: bool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = tokio::fs::read_to_string(&input)
        .await
        .map_err(|e| format!("Failed to read '{}': {}", input.display(), e))?;
    let task = RenderTask::new(source, format)?.with_unsafe(allow_remote_images);

    let result = match worker.convert(&task).await {
        Ok(result) => result,
        Err(e) => return Err(format!("{}: {}", e.title(), e).into()),
    };

    match output {
        Some(path) => {
            tokio::fs::write(&path, result.into_bytes())
                .await
                .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
            info!(path = %path.display(), "Wrote converted diagram");
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&result.into_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
