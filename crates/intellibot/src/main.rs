//! The `intellibot` command-line assistant.

#[macro_use]
extern crate tracing;

use std::io::{self, IsTerminal as _};
use std::process::ExitCode;

use intellibot::SessionBuilder;
use intellibot::config::{self, Config, ConfigError};
use intellibot::repl::Repl;
use intellibot_openai_model::OpenAIProvider;
use tokio::io::BufReader;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot use the model backend: {0}")]
    Backend(#[from] intellibot_openai_model::Error),
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load `.env` first so that it can set `RUST_LOG`.
    let dotenv = config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match run(dotenv).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    dotenv: Result<Option<std::path::PathBuf>, ConfigError>,
) -> Result<(), Error> {
    if let Some(path) = dotenv? {
        debug!("loaded environment from {}", path.display());
    }
    let config = Config::from_env()?;
    let provider = OpenAIProvider::new(config.openai_config());
    info!(
        "using model `{}` at {}",
        provider.config().model(),
        provider.config().base_url()
    );
    provider.check_credentials().await?;

    let interactive = io::stdout().is_terminal();
    let repl = Repl::new(
        SessionBuilder::with_model_provider(provider),
        BufReader::new(tokio::io::stdin()),
        io::stdout(),
    )
    .with_spinner(interactive && io::stderr().is_terminal())
    .with_colors(interactive);
    repl.run().await?;

    Ok(())
}
