mod args;
mod presenter;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use hubsync_core::Config;
use hubsync_engine::{Credentials, Logic, MemoryPreferences};
use hubsync_github::GitHubSource;

use crate::args::Args;
use crate::presenter::ConsolePresenter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, validation) = Config::load_validated(args.config.as_deref())?;
    let level = if args.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    hubsync_core::init(level)?;

    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }

    let source = Arc::new(GitHubSource::from_config(&config)?);
    let presenter = Arc::new(ConsolePresenter::new(args.panels()));
    let logic = Logic::new(source, presenter.clone(), Arc::new(MemoryPreferences::new()));

    if let Some(user) = &args.user {
        let Some(token) = config.github.effective_token() else {
            anyhow::bail!("--user needs a token in the config file or GITHUB_TOKEN");
        };
        if !logic.login(&Credentials::new(user.as_str(), token)).await {
            anyhow::bail!("Login failed for {}", user);
        }
    }

    if !logic.open_primary_repository(&args.repo).await {
        anyhow::bail!("Could not open {}", args.repo);
    }
    logic.filter_sort_refresh(&presenter.expressions()).await;

    let interval = args.interval.unwrap_or(config.sync.refresh_interval_secs);
    if args.once || interval == 0 {
        return Ok(());
    }

    tracing::info!("HubSync started, refreshing every {}s", interval);
    let mut ticker = tokio::time::interval(Duration::from_secs(interval));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                return Ok(());
            }
            _ = ticker.tick() => {
                logic.refresh().await;
            }
        }
    }
}
