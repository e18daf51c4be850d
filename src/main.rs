//! Stylegen - stylized image generation CLI.

mod adapters;
mod boundary;
mod cassette;
mod cli;
mod codec;
mod config;
mod context;
mod dispatch;
mod error;
mod normalize;
mod output;
mod params;
mod pipeline;
mod ports;
mod prompt;
mod request;

use std::io::Read;
use std::path::Path;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::boundary::CanonicalResponse;
use crate::cli::Cli;
use crate::config::Config;
use crate::context::{RecordingSession, ServiceContext};
use crate::error::PipelineError;
use crate::normalize::ImageRef;
use crate::output::{inline_extension, resolve_output_path, save_image};
use crate::pipeline::Pipeline;
use crate::request::GenerationRequest;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "stylegen=debug" } else { "stylegen=warn" };
    let filter = EnvFilter::try_from_env("STYLEGEN_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<(), PipelineError> {
    let config_path = config::discover_config_path(cli.config.as_deref());
    let config = Config::load(&config_path).map_err(PipelineError::Config)?;
    tracing::debug!(config = %config_path.display(), "configuration loaded");

    if let Some(ref source) = cli.request {
        return handle_request(source, &config).await;
    }

    let request = cli.to_request()?;
    let prompts = config.prompt_config();
    if !cli.describe {
        dispatch::check_input(&request, &prompts)?;
    }

    let (ctx, recording) = open_context(&config)?;
    let pipeline = Pipeline::new(ctx.provider, prompts, config.pipeline.clone());

    let outcome = if cli.describe {
        describe(&pipeline, &request).await
    } else {
        generate(&pipeline, &request, cli.output.as_deref()).await
    };

    // The recording adapter holds the other reference to the recorder.
    drop(pipeline);
    if let Some(session) = recording {
        match session.finish() {
            Ok(path) => eprintln!("Cassette saved: {}", path.display()),
            Err(e) => eprintln!("Warning: failed to save cassette: {e}"),
        }
    }

    outcome
}

/// Live, recording, or replaying, from `STYLEGEN_REPLAY` / `STYLEGEN_REC`.
fn open_context(
    config: &Config,
) -> Result<(ServiceContext, Option<RecordingSession>), PipelineError> {
    if let Ok(cassette) = std::env::var("STYLEGEN_REPLAY") {
        return Ok((ServiceContext::replaying(Path::new(&cassette))?, None));
    }
    let recording = std::env::var("STYLEGEN_REC").is_ok_and(|v| v == "true" || v == "1");
    if recording {
        let (ctx, session) = ServiceContext::recording(config)?;
        Ok((ctx, Some(session)))
    } else {
        Ok((ServiceContext::live(config)?, None))
    }
}

async fn handle_request(source: &str, config: &Config) -> Result<(), PipelineError> {
    let body = if source == "-" {
        let mut body = String::new();
        std::io::stdin().read_to_string(&mut body)?;
        body
    } else {
        std::fs::read_to_string(source)?
    };

    // Bad bodies and missing input are answered without a provider.
    let prompts = config.prompt_config();
    let precheck = boundary::parse_inbound("POST", &body)
        .and_then(|request| dispatch::check_input(&request, &prompts));
    let response = match precheck {
        Err(e) => CanonicalResponse::error(&e),
        Ok(()) => {
            let (ctx, recording) = open_context(config)?;
            let pipeline = Pipeline::new(ctx.provider, prompts, config.pipeline.clone());
            let response = pipeline.handle("POST", &body).await;
            drop(pipeline);
            if let Some(session) = recording {
                if let Err(e) = session.finish() {
                    eprintln!("Warning: failed to save cassette: {e}");
                }
            }
            response
        }
    };

    println!("{}", response.body);
    if response.status == 200 {
        Ok(())
    } else {
        let status = response.status;
        Err(PipelineError::InvalidArgument(format!("request failed with status {status}")))
    }
}

/// Completes on Ctrl-C; never completes if the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn describe(
    pipeline: &Pipeline,
    request: &GenerationRequest,
) -> Result<(), PipelineError> {
    let source = request
        .source_image
        .as_ref()
        .ok_or_else(|| PipelineError::InvalidArgument("--describe needs --image".into()))?;
    let tags = pipeline.describe(source).await?;
    println!("{tags}");
    Ok(())
}

async fn generate(
    pipeline: &Pipeline,
    request: &GenerationRequest,
    output: Option<&str>,
) -> Result<(), PipelineError> {
    let result = pipeline.generate_until(request, interrupted()).await?;
    let total = result.count();

    for (i, image) in result.images().iter().enumerate() {
        match image {
            ImageRef::Url(url) => println!("{url}"),
            ImageRef::Inline(reference) => {
                let ext = inline_extension(reference)?;
                let path = resolve_output_path(output, &request.instruction, ext, i, total);
                save_image(reference, &path)?;
                eprintln!("Saved: {}", path.display());
            }
        }
    }
    Ok(())
}
