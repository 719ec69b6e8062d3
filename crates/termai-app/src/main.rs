//! termai binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialise tracing on stderr
//! 3. Build the backend client, dispatcher and context store
//! 4. Run one session and map its result to the exit status

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use termai_action::{ui, Dispatcher, StdinPrompter};
use termai_app::{Backend, BackendDiagnoser, CliArgs, ProcessBackend, SessionDriver, SessionOutcome};
use termai_context::ContextStore;
use termai_core::config::TermaiConfig;
use termai_core::error::TermaiError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    let config_path = args.resolve_config_path();

    // Peek at the file for its log level; the real load below logs through tracing.
    let peeked = TermaiConfig::load(&config_path).ok();
    let level = args.resolve_log_level(peeked.as_ref().map(|c| c.general.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)))
        .init();

    if args.init_config {
        return init_config(&config_path);
    }

    let mut config = TermaiConfig::load_or_default(&config_path);
    if let Some(ref dir) = args.context_dir {
        config.context.dir = Some(dir.to_string_lossy().into_owned());
    }

    match run(&args, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Session failed");
            ui::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &CliArgs, config: &TermaiConfig) -> Result<(), TermaiError> {
    let store = ContextStore::from_config(&config.context);
    if args.show_context {
        let previous = store.load()?;
        if !previous.is_empty() {
            println!("{}", previous);
        }
        return Ok(());
    }

    let cwd = args.resolve_working_dir();
    let backend: Arc<dyn Backend> = Arc::new(ProcessBackend::from_config(&config.backend));

    if args.complete {
        for suggestion in backend.complete(&args.query_text(), &cwd).await? {
            println!("{}", suggestion);
        }
        return Ok(());
    }

    tracing::info!(cwd = %cwd.display(), context_dir = %store.dir().display(), "Starting session");
    let dispatcher = Dispatcher::from_config(config, cwd.clone(), Arc::new(StdinPrompter))?
        .with_diagnoser(Arc::new(BackendDiagnoser::new(Arc::clone(&backend), cwd.clone())));
    let driver = SessionDriver::new(backend, dispatcher, store, cwd);

    match driver.run(&args.query_text()).await? {
        SessionOutcome::NoActions => {}
        SessionOutcome::Completed(report) => {
            tracing::info!(
                succeeded = report.succeeded(),
                failed = report.failed(),
                skipped = report.skipped(),
                "Session complete"
            );
        }
    }
    Ok(())
}

fn init_config(path: &std::path::Path) -> ExitCode {
    if path.exists() {
        ui::warn(&format!("{} already exists, leaving it untouched", path.display()));
        return ExitCode::SUCCESS;
    }
    match TermaiConfig::default().save(path) {
        Ok(()) => {
            ui::status(&format!("wrote {}", path.display()));
            ExitCode::SUCCESS
        }
        Err(e) => {
            ui::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
