//! Command line entry point for Outpost.
//!
//! Outpost drives a browser strategy game account through its page
//! interface: it scans village slots, applies construction presets and runs
//! the settlement workflow (culture points, residence, settlers, plot
//! search, settle) until it either founds a new village or blocks on
//! something only game time can fix.
//!
//! # Architecture
//!
//! ```text
//! clap command --> outpost-core workflow --> GameClient --> HttpFetcher --> game server
//!                        |
//!                        +--> ProgressSink (stderr printer) / TaskRecorder (log or JSON lines)
//! ```
//!
//! The session cookie comes from `OUTPOST_SESSION_COOKIE`; logging in is
//! left to the operator.

mod commands;
mod config;
mod error;
mod http;
mod recorder;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use outpost_core::client::GameClient;
use outpost_core::progress::{ChannelSink, ProgressSink};
use outpost_core::record::{LogRecorder, TaskRecorder};
use outpost_types::Coordinate;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::PlotOptions;
use crate::config::RunnerConfig;
use crate::http::HttpFetcher;
use crate::recorder::JsonLinesRecorder;

/// Settlement-growth orchestrator for a browser strategy game.
#[derive(Debug, Parser)]
#[command(name = "outpost", version, about)]
struct Cli {
    /// Path of the YAML configuration.
    #[arg(long, short, global = true, env = "OUTPOST_CONFIG")]
    config: Option<PathBuf>,

    /// Village id to make active before the command runs, see `outpost villages`.
    #[arg(long, global = true, env = "OUTPOST_VILLAGE")]
    village: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read every slot and print what stands on it.
    Scan {
        /// Scan resource fields instead of building slots.
        #[arg(long)]
        resources: bool,
    },
    /// Show the actions a preset would take, without executing them.
    Plan {
        /// Preset key, see `outpost presets`.
        preset: String,
    },
    /// Apply a preset to the active village.
    Apply {
        /// Preset key, see `outpost presets`.
        preset: String,
    },
    /// Upgrade every occupied slot to a uniform level.
    Upgrade {
        /// Level to reach.
        level: u32,
        /// Upgrade resource fields instead of building slots.
        #[arg(long)]
        resources: bool,
    },
    /// Search for empty plots around the home village.
    Plots {
        /// Number of plots to report.
        #[arg(long, default_value_t = 5)]
        count: usize,
        /// Largest ring to search.
        #[arg(long)]
        radius: Option<u32>,
        /// Search center x (requires --y).
        #[arg(long, requires = "y", allow_hyphen_values = true)]
        x: Option<i32>,
        /// Search center y (requires --x).
        #[arg(long, requires = "x", allow_hyphen_values = true)]
        y: Option<i32>,
    },
    /// Run the settlement workflow once.
    Settle,
    /// List the villages on the account profile.
    Villages,
    /// List the configured presets.
    Presets,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the session has expired
/// or a command fails fatally.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut runner = RunnerConfig::from_env()?;
    init_logging(runner.log_json);
    if cli.config.is_some() {
        runner.config_path.clone_from(&cli.config);
    }

    let mut config = runner.load_outpost_config()?;
    info!(
        base_url = config.server.base_url,
        presets = config.presets.len(),
        "configuration loaded"
    );

    if matches!(cli.command, Command::Presets) {
        commands::list_presets(&config);
        return Ok(());
    }

    let fetcher = HttpFetcher::new(&config.server, &runner.require_cookie()?)?;
    let client = GameClient::new(fetcher, config.server.clone());
    let mut recorder = task_recorder(&runner);

    if matches!(cli.command, Command::Villages) {
        commands::list_villages(&client).await?;
        return Ok(());
    }
    if let Some(village_id) = cli.village {
        commands::select_village(&client, &mut config, village_id).await?;
    }

    let (mut sink, mut events) = ChannelSink::new();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Some(line) = commands::describe(&event) {
                eprintln!("{line}");
            }
        }
    });

    let progress: &mut dyn ProgressSink = &mut sink;
    let recorder: &mut dyn TaskRecorder = recorder.as_mut();
    let result = match cli.command {
        Command::Scan { resources } => {
            commands::scan(&client, &config, resources, progress, recorder).await
        }
        Command::Plan { preset } => commands::plan(&client, &config, &preset, progress).await,
        Command::Apply { preset } => {
            commands::apply(&client, &config, &preset, progress, recorder).await
        }
        Command::Upgrade { level, resources } => {
            commands::upgrade(&client, &config, level, resources, progress, recorder).await
        }
        Command::Plots {
            count,
            radius,
            x,
            y,
        } => {
            let options = PlotOptions {
                count,
                radius,
                center: x.zip(y).map(|(x, y)| Coordinate::new(x, y)),
            };
            commands::find_plots(&client, &config, options, progress, recorder).await
        }
        Command::Settle => commands::settle(&client, &config, progress, recorder).await,
        Command::Villages | Command::Presets => Ok(()),
    };

    drop(sink);
    if let Err(e) = printer.await {
        warn!(error = %e, "progress printer stopped abnormally");
    }

    result?;
    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn task_recorder(runner: &RunnerConfig) -> Box<dyn TaskRecorder> {
    let Some(path) = &runner.record_path else {
        return Box::new(LogRecorder);
    };
    match JsonLinesRecorder::open(path) {
        Ok(recorder) => {
            info!(path = %path.display(), "recording tasks");
            Box::new(recorder)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot open task record file, logging instead");
            Box::new(LogRecorder)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn plots_accepts_negative_center() {
        let cli = Cli::try_parse_from(["outpost", "plots", "--x", "-12", "--y", "7"]);
        assert!(matches!(
            cli.map(|cli| cli.command),
            Ok(Command::Plots {
                x: Some(-12),
                y: Some(7),
                count: 5,
                radius: None
            })
        ));
    }

    #[test]
    fn plots_center_needs_both_axes() {
        assert!(Cli::try_parse_from(["outpost", "plots", "--x", "3"]).is_err());
    }

    #[test]
    fn village_option_is_global() {
        let cli = Cli::try_parse_from(["outpost", "settle", "--village", "1002"]).unwrap();
        assert_eq!(cli.village, Some(1002));
        assert!(matches!(cli.command, Command::Settle));

        let cli = Cli::try_parse_from(["outpost", "--village", "1002", "apply", "farm"]).unwrap();
        assert_eq!(cli.village, Some(1002));
    }

    #[test]
    fn village_id_must_be_numeric() {
        assert!(Cli::try_parse_from(["outpost", "scan", "--village", "Outpost"]).is_err());
    }

    #[test]
    fn villages_takes_no_arguments() {
        let cli = Cli::try_parse_from(["outpost", "villages"]);
        assert!(matches!(cli.map(|c| c.command), Ok(Command::Villages)));
    }

    #[test]
    fn apply_takes_a_preset_key() {
        let cli = Cli::try_parse_from(["outpost", "apply", "farm"]);
        assert!(matches!(cli.map(|c| c.command), Ok(Command::Apply { preset }) if preset == "farm"));
    }
}
