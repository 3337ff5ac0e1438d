//! PageLens command-line entry point.
//!
//! `serve` wires every client explicitly — credentials, token source,
//! Firestore, identity, Vision — and hands them to the gateway, so a
//! misconfiguration dies at startup instead of on the first request.
//! `batch` drives the sequential client-side batch flow against a running
//! gateway; `status` probes its health endpoint.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use pagelens_client::{perform_batch_ocr, sort_by_capture_time, ApiClient, ImageUpload};
use pagelens_config::Config;
use pagelens_core::TextRecognizer;
use pagelens_gateway::{start_server, AppState, AuthContext};
use pagelens_gcp::{ServiceAccountKey, TokenSource, CLOUD_PLATFORM_SCOPE};
use pagelens_identity::IdentityClient;
use pagelens_logging::init_logger;
use pagelens_store::FirestoreClient;
use pagelens_vision::VisionClient;

#[derive(Parser)]
#[command(name = "pagelens")]
#[command(about = "PageLens — book-page OCR gateway")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the OCR gateway server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Check a running gateway's health
    Status,
    /// Run a sequential batch of images through a running gateway
    Batch {
        /// Image files, submitted oldest-modified first
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Gateway base URL
        #[arg(long, default_value = "http://localhost:8080")]
        url: String,
        /// Bearer token for the gateway
        #[arg(long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    init_logger(config.log_dir.as_deref(), &config.log_level);

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { port } => {
            let config = Config { port: port.unwrap_or(config.port), ..config };
            run_server(config).await?;
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            let url = format!("http://localhost:{}/api/health", config.port);
            match client.get(&url).send().await {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => println!("pagelens gateway is not running on port {}", config.port),
            }
        }
        Commands::Batch { images, url, token } => {
            run_batch(images, url, token).await?;
        }
    }
    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    config.validate()?;
    info!("starting pagelens gateway: {}", config.summary());

    let http = reqwest::Client::new();
    let key = ServiceAccountKey::resolve(
        config.google_client_email.as_deref(),
        config.google_private_key.as_deref(),
        config.google_credentials_path.as_deref(),
    )?;
    let tokens = Arc::new(TokenSource::new(http.clone(), key, CLOUD_PLATFORM_SCOPE));

    let recognizer: Arc<dyn TextRecognizer> =
        Arc::new(VisionClient::new(http.clone(), tokens.clone()));

    let auth = if config.require_auth {
        let project_id = config
            .google_project_id
            .as_deref()
            .context("GOOGLE_PROJECT_ID is not set")?;
        let api_key = config
            .firebase_web_api_key
            .clone()
            .context("FIREBASE_WEB_API_KEY is not set")?;
        Some(AuthContext {
            verifier: Arc::new(IdentityClient::new(http.clone(), api_key)),
            store: Arc::new(FirestoreClient::new(http.clone(), tokens, project_id)),
        })
    } else {
        info!("auth enforcement disabled; serving extraction only");
        None
    };

    let state = Arc::new(AppState { recognizer, auth });
    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .context("invalid bind address")?;
    start_server(addr, state).await
}

async fn run_batch(paths: Vec<PathBuf>, url: String, token: Option<String>) -> Result<()> {
    let mut images = Vec::with_capacity(paths.len());
    for path in &paths {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read image {}", path.display()))?;
        let captured_at: Option<DateTime<Utc>> = std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::from);
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        images.push(ImageUpload { filename, bytes, captured_at });
    }
    sort_by_capture_time(&mut images);

    let mut client = ApiClient::new(reqwest::Client::new(), url);
    if let Some(token) = token {
        client = client.with_bearer_token(token);
    }

    let result = perform_batch_ocr(&client, &images).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
