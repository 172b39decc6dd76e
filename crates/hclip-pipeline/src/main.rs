//! Command-line runner: process one source URL and print the manifest.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hclip_models::SourceRequest;
use hclip_pipeline::{HighlightPipeline, PipelineConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    dotenvy::dotenv().ok();
    init_tracing();

    let Some(url) = std::env::args().nth(1) else {
        eprintln!("usage: hclip-run <video-url>");
        return ExitCode::from(2);
    };

    let config = PipelineConfig::from_env();
    info!("Pipeline config: {:?}", config);

    let pipeline = HighlightPipeline::from_config(config);
    if !pipeline.has_language_model() {
        info!("No GEMINI_API_KEY/GOOGLE_API_KEY set, moments will use the fallback list");
    }

    match pipeline.process(&SourceRequest::new(url)).await {
        Ok(output) => match serde_json::to_string_pretty(&output.manifest) {
            Ok(json) => {
                println!("{}", json);
                info!(
                    request_id = %output.request_id,
                    dir = %pipeline.scratch().root().join(output.request_id.to_string()).display(),
                    "Clips written"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to serialize manifest: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("{}", e);
            if e.is_client_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// JSON logs when `LOG_FORMAT=json`, colored human-readable logs otherwise.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hclip=info,info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
}
