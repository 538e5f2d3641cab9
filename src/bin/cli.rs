//! Schedule crawler CLI
//!
//! Fetches one team's schedule and logs a line per game.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use schedule_crawler::{
    error::Result,
    models::Config,
    pipeline::{self, RunContext, ScheduleRun},
    utils::http::HttpTransport,
};

/// Schedule crawler - scrape a team's games from the schedule page
#[derive(Parser, Debug)]
#[command(
    name = "schedule-crawler",
    version,
    about = "Scrape a team's game schedule from an ASP.NET postback page"
)]
struct Cli {
    /// Team name exactly as listed on the schedule page (default: config `default_team`)
    #[arg(short, long)]
    team: Option<String>,

    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Print the games as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Schedule crawler starting...");

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let stage = e.stage().unwrap_or("Startup");
            let message = e.to_string();
            log::error!(stage = stage, error = message.as_str(); "Schedule run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = Config::load_or_default(&cli.config);
    config.validate()?;

    let team = cli
        .team
        .clone()
        .unwrap_or_else(|| config.default_team.clone());
    let transport = Arc::new(HttpTransport::new(&config.http)?);
    let ctx = RunContext::new(config, transport);

    let run = pipeline::run_schedule(&ctx, &team).await?;
    report(&run);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&run.games)?);
    }
    Ok(())
}

fn report(run: &ScheduleRun) {
    log::info!(
        "Season {} ({}), team '{}' ({})",
        run.season.label(),
        run.season.value(),
        run.team,
        run.team_selection.value()
    );
    if run.games.is_empty() {
        log::warn!("No games listed for '{}'", run.team);
    }
    for game in &run.games {
        let start_time = game.start_time.to_rfc3339();
        log::info!(
            start_time = start_time.as_str(),
            opponent = game.opponent.as_str(),
            location = game.location.as_str();
            "{}", game
        );
    }
}
