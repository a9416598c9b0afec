//! gh-harvest CLI
//!
//! Interactive entry point: one config file, then a query prompt on the
//! controlling terminal.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gh_harvest::{
    error::Result,
    hooks::{Hooks, filter_from_config},
    models::Config,
    pipeline::{Session, SessionSettings},
    services::GithubClient,
    storage::{Ledger, QueryHistory},
    utils::{log as console, terminal},
};

/// gh-harvest - review code-search matches and capture repositories
#[derive(Parser, Debug)]
#[command(
    name = "gh-harvest",
    version,
    about = "Interactive review and capture of GitHub code-search matches"
)]
struct Cli {
    /// Path to the TOML configuration file
    config: PathBuf,

    /// Show debug output on the console
    #[arg(short, long)]
    verbose: bool,
}

/// Send the `log` facade to the log file, appending across runs.
fn init_logging(config: &Config) -> Result<PathBuf> {
    let path = config.log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .target(env_logger::Target::Pipe(Box::new(file)))
    .format_timestamp_secs()
    .init();
    Ok(path)
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;
    config.validate()?;
    fs::create_dir_all(&config.collection.output_root)?;

    let log_path = init_logging(&config)?;
    console::init(if cli.verbose { "debug" } else { "info" });
    log::info!("gh-harvest starting with {}", cli.config.display());
    console::summary("Configuration", &config.describe());

    let ledger = Ledger::load(&config.collection.output_root)?;
    let history = QueryHistory::load(&config.collection.output_root)?;
    console::info(&format!(
        "Loaded {} captured repositories and {} past queries",
        ledger.len(),
        history.len()
    ));

    let host = GithubClient::new(&config.github)?;
    let mut hooks = Hooks::default();
    if let Some(filter) = filter_from_config(&config.filter) {
        hooks = hooks.with_file_filter(filter);
    }

    let settings = SessionSettings::from_config(&config, terminal::viewport_height());
    let mut session = Session::new(host, ledger, history, hooks, settings);
    let summary = session
        .run(&mut terminal::TerminalInput, &mut io::stdout())
        .await?;

    console::success(&format!(
        "Session finished: {} queries, {} repositories captured (log: {})",
        summary.passes.len(),
        summary.captured_count(),
        log_path.display()
    ));
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:?}");
            eprintln!("gh-harvest: {e}");
            ExitCode::FAILURE
        }
    }
}
