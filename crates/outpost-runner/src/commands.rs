//! Command implementations.
//!
//! Each command prints a human-readable report to stdout. Progress goes to
//! stderr through the printer task started in `main`.

use outpost_core::client::GameClient;
use outpost_core::config::OutpostConfig;
use outpost_core::executor::Executor;
use outpost_core::orchestrator::SettlementOrchestrator;
use outpost_core::plots::{self, PlotSearch};
use outpost_core::progress::{ProgressEvent, ProgressSink};
use outpost_core::record::{TaskKind, TaskRecorder};
use outpost_core::scanner;
use outpost_types::{Coordinate, ExecutionOutcome, ExecutionResult, Occupancy, Preset, WorkflowState};

use crate::error::RunnerError;
use crate::http::HttpFetcher;

/// Client type used by every network command.
pub type Client = GameClient<HttpFetcher>;

/// Options of the `plots` command.
#[derive(Debug, Clone, Copy)]
pub struct PlotOptions {
    /// Plots to report.
    pub count: usize,
    /// Ring limit, defaulting to the configured search radius.
    pub radius: Option<u32>,
    /// Search center, defaulting to the home village.
    pub center: Option<Coordinate>,
}

/// Look up a preset by its command-line key.
pub fn preset<'c>(config: &'c OutpostConfig, key: &str) -> Result<&'c Preset, RunnerError> {
    config
        .presets
        .get(key)
        .ok_or_else(|| RunnerError::UnknownPreset(key.to_owned()))
}

/// `presets`: list the configured presets.
pub fn list_presets(config: &OutpostConfig) {
    for (key, preset) in &config.presets {
        println!("{key:<14} {} ({} structures)", preset.name, preset.total_count());
        if !preset.description.is_empty() {
            println!("{:<14} {}", "", preset.description);
        }
        if let Some(target) = preset.resource_target {
            println!("{:<14}   resource fields to level {target}", "");
        }
        for req in &preset.structures {
            println!("{:<14}   {} x{} to level {}", "", req.structure, req.count, req.level);
        }
    }
}

/// `villages`: list the villages on the account profile.
pub async fn list_villages(client: &Client) -> Result<(), RunnerError> {
    for village in client.villages().await? {
        println!(
            "{:<8} {:<12} {}",
            village.village_id,
            village.coordinate.to_string(),
            village.name
        );
    }
    Ok(())
}

/// Make `village_id` the active village. Plot searches and settling then
/// center on it unless `settling.home` is configured.
pub async fn select_village(
    client: &Client,
    config: &mut OutpostConfig,
    village_id: u32,
) -> Result<(), RunnerError> {
    let village = client.switch_village(village_id).await?;
    if config.settling.home.is_none() {
        config.settling.home = Some(village.coordinate);
    }
    eprintln!("active village: {} ({})", village.name, village.coordinate);
    Ok(())
}

/// `scan`: read building slots, or resource fields with `resources`.
pub async fn scan(
    client: &Client,
    config: &OutpostConfig,
    resources: bool,
    progress: &mut dyn ProgressSink,
    recorder: &mut dyn TaskRecorder,
) -> Result<(), RunnerError> {
    let range = if resources {
        config.village.resource_fields()
    } else {
        config.village.building_slots()
    };
    recorder.record_task(TaskKind::Scan, count(range.clone().count()));
    let slots = scanner::scan(client, range, progress).await?;
    let (empty, occupied, unknown) = slots.tally();
    recorder.record_outcome(
        TaskKind::Scan,
        count(slots.len()),
        count(empty.saturating_add(occupied)),
    );

    for slot in slots.iter() {
        match slot.occupancy {
            Occupancy::Empty => println!("{:>3}  empty", slot.position.get()),
            Occupancy::Unknown => println!("{:>3}  unreadable", slot.position.get()),
            Occupancy::Occupied => println!(
                "{:>3}  {} level {}{}",
                slot.position.get(),
                slot.name.as_deref().unwrap_or("?"),
                slot.level,
                if slot.upgrade.is_some() { "" } else { " (no upgrade available)" }
            ),
        }
    }
    println!("{empty} empty, {occupied} occupied, {unknown} unreadable");
    Ok(())
}

/// `plan`: show what applying a preset would do.
pub async fn plan(
    client: &Client,
    config: &OutpostConfig,
    key: &str,
    progress: &mut dyn ProgressSink,
) -> Result<(), RunnerError> {
    let preset = preset(config, key)?;
    let plan = Executor::new(client, config)
        .plan_preset(preset, progress)
        .await?;
    println!("{}:", preset.name);
    for action in plan.actions() {
        println!("  {action}");
    }
    Ok(())
}

/// `apply`: apply a preset.
pub async fn apply(
    client: &Client,
    config: &OutpostConfig,
    key: &str,
    progress: &mut dyn ProgressSink,
    recorder: &mut dyn TaskRecorder,
) -> Result<(), RunnerError> {
    let preset = preset(config, key)?;
    let report = Executor::new(client, config)
        .apply_preset(preset, progress, recorder)
        .await?;
    for result in report.results() {
        print_result(result);
    }
    println!(
        "{}: {}/{} actions complete (run {})",
        report.preset,
        report.completed(),
        report.total(),
        report.run_id
    );
    Ok(())
}

/// `upgrade`: raise every occupied slot to `level`.
pub async fn upgrade(
    client: &Client,
    config: &OutpostConfig,
    level: u32,
    resources: bool,
    progress: &mut dyn ProgressSink,
    recorder: &mut dyn TaskRecorder,
) -> Result<(), RunnerError> {
    let range = if resources {
        config.village.resource_fields()
    } else {
        config.village.building_slots()
    };
    let results = Executor::new(client, config)
        .upgrade_existing(range, level, progress, recorder)
        .await?;
    if results.is_empty() {
        println!("everything is already at level {level} or above");
    }
    for result in &results {
        print_result(result);
    }
    Ok(())
}

/// `plots`: list empty plots around a center.
pub async fn find_plots(
    client: &Client,
    config: &OutpostConfig,
    options: PlotOptions,
    progress: &mut dyn ProgressSink,
    recorder: &mut dyn TaskRecorder,
) -> Result<(), RunnerError> {
    let center = match options.center.or(config.settling.home) {
        Some(center) => center,
        None => home_village(client).await?,
    };
    let search = PlotSearch {
        center,
        radius: options.radius.unwrap_or(config.settling.search_radius),
        max_spots: options.count,
        max_candidates: config.settling.max_candidates,
    };

    recorder.record_task(TaskKind::PlotSearch, count(options.count));
    let found = plots::find_empty_plots(client, config.map, search, progress).await?;
    recorder.record_outcome(TaskKind::PlotSearch, count(options.count), count(found.plots.len()));

    for plot in &found.plots {
        println!(
            "{:<12} distance {:>3}  tile {}",
            plot.coordinate.to_string(),
            plot.coordinate.chebyshev(center),
            plot.id
        );
    }
    println!(
        "{} empty plot(s) around {center} ({} tiles probed)",
        found.plots.len(),
        found.probed
    );
    Ok(())
}

/// `settle`: run the settlement workflow once.
pub async fn settle(
    client: &Client,
    config: &OutpostConfig,
    progress: &mut dyn ProgressSink,
    recorder: &mut dyn TaskRecorder,
) -> Result<(), RunnerError> {
    let outcome = SettlementOrchestrator::new(client, config)
        .run(progress, recorder)
        .await?;
    for state in &outcome.trail {
        println!("  {state}");
    }
    match (outcome.final_state(), outcome.settled_at) {
        (Some(WorkflowState::Done), Some(at)) => println!("settled at {at}"),
        (Some(WorkflowState::Blocked(reason)), _) => {
            println!("blocked: {reason}");
            println!("run again once the situation has changed");
        }
        _ => {}
    }
    Ok(())
}

/// Render a progress event as one line, `None` for events not worth
/// showing.
pub fn describe(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::ScanStarted { first, last } => {
            Some(format!("scanning slots {first}..={last}"))
        }
        ProgressEvent::SlotScanned(_) => None,
        ProgressEvent::ScanFinished {
            empty,
            occupied,
            unknown,
        } => Some(format!(
            "scan finished: {empty} empty, {occupied} occupied, {unknown} unreadable"
        )),
        ProgressEvent::ActionStarted(action) => Some(format!("-> {action}")),
        ProgressEvent::UpgradeStep {
            position,
            from_level,
        } => Some(format!("   slot {position}: upgrading from level {from_level}")),
        ProgressEvent::ActionFinished(_) => None,
        ProgressEvent::PlotSearch { probed, found } => {
            Some(format!("probed {probed} tiles, {found} empty"))
        }
        ProgressEvent::PlotFound(at) => Some(format!("empty plot at {at}")),
        ProgressEvent::StateEntered(state) => Some(format!("[{state}]")),
    }
}

fn print_result(result: &ExecutionResult) {
    let status = match &result.outcome {
        ExecutionOutcome::Complete => String::from("done"),
        ExecutionOutcome::Partial { reason } => format!("partial: {reason}"),
        ExecutionOutcome::Failed { reason } => format!("failed: {reason}"),
        ExecutionOutcome::Skipped { reason } => format!("skipped: {reason}"),
    };
    println!(
        "{} -> level {} after {} step(s), {status}",
        result.action, result.final_level, result.steps
    );
}

async fn home_village(client: &Client) -> Result<Coordinate, RunnerError> {
    let villages = client.villages().await?;
    villages
        .first()
        .map(|village| village.coordinate)
        .ok_or_else(|| RunnerError::Config(String::from(
            "the profile lists no villages; pass --x and --y or set settling.home",
        )))
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
