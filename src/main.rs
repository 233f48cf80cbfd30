use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use yt_transcript::output::{self, MISSING_VIDEO_ID};
use yt_transcript::provider::YoutubeProvider;
use yt_transcript::{Cli, Config, TranscriptError, TranscriptResolver, TranscriptResult};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse_lenient();
    init_tracing(cli.verbose, cli.log_json);

    if let Some(error) = &cli.parse_error {
        tracing::warn!("Arguments not understood ({}), using the first one as video id", error);
    }

    // Checked before anything touches the config or the network.
    let Some(video_id) = cli.video_id().map(str::to_string) else {
        emit(&TranscriptResult::failure(MISSING_VIDEO_ID));
        return ExitCode::FAILURE;
    };

    let result = match build_resolver(&cli) {
        Ok(resolver) => Arc::new(resolver).resolve_guarded(video_id).await,
        Err(err) => TranscriptError::Unexpected(format!("{:#}", err)).into(),
    };

    tracing::debug!("Transcript lookup finished, success: {}", result.is_success());

    // Provider failures are reported in the JSON payload, not through the exit status.
    if emit(&result) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "yt_transcript=debug,get_transcript=debug"
    } else {
        "yt_transcript=warn,get_transcript=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // stdout is reserved for the JSON result
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn build_resolver(cli: &Cli) -> Result<TranscriptResolver<YoutubeProvider>> {
    let config = Config::load(cli.config.as_deref()).context("Invalid configuration")?;
    let provider =
        YoutubeProvider::new(&config.provider).context("Failed to create HTTP client")?;

    let language = cli
        .language
        .clone()
        .unwrap_or(config.transcript.preferred_language);

    Ok(TranscriptResolver::new(provider).with_language(language))
}

fn emit(result: &TranscriptResult) -> bool {
    match output::print_to_console(result) {
        Ok(()) => true,
        Err(err) => {
            tracing::error!("Failed to write result: {:#}", err);
            false
        }
    }
}
