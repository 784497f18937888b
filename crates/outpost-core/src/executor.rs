//! Construction execution.
//!
//! Runs plan actions against the game. Every upgrade step re-reads the
//! slot first: upgrade links carry a single-use token, so a link is only
//! ever followed straight after the page it came from.

use std::ops::RangeInclusive;

use outpost_types::{
    ExecutionOutcome, ExecutionResult, Occupancy, PlanAction, Preset, RunId, SlotMap,
    SlotPosition, StructureType,
};
use tracing::{info, warn};

use crate::client::GameClient;
use crate::config::OutpostConfig;
use crate::error::CoreError;
use crate::fetch::{PageFetcher, Submission};
use crate::planner;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::record::{TaskKind, TaskRecorder};
use crate::scanner;

/// Resource and building plans for one preset against the current village.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetPlan {
    /// Resource field upgrades, empty when the preset leaves fields alone.
    pub resource_actions: Vec<PlanAction>,
    /// Structure actions in requirement order.
    pub building_actions: Vec<PlanAction>,
}

impl PresetPlan {
    /// All actions, resource fields first.
    pub fn actions(&self) -> impl Iterator<Item = &PlanAction> {
        self.resource_actions.iter().chain(&self.building_actions)
    }
}

/// Results of applying one preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetReport {
    /// Run identifier, shared with log lines.
    pub run_id: RunId,
    /// Preset display name.
    pub preset: String,
    /// Resource field results.
    pub resource_results: Vec<ExecutionResult>,
    /// Structure results.
    pub building_results: Vec<ExecutionResult>,
}

impl PresetReport {
    /// All results, resource fields first.
    pub fn results(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.resource_results.iter().chain(&self.building_results)
    }

    /// Number of actions that reached their target.
    pub fn completed(&self) -> usize {
        self.results().filter(|r| r.outcome.is_complete()).count()
    }

    /// Total number of actions.
    pub fn total(&self) -> usize {
        self.resource_results
            .len()
            .saturating_add(self.building_results.len())
    }
}

/// Executes plan actions through a [`GameClient`].
pub struct Executor<'a, F> {
    client: &'a GameClient<F>,
    config: &'a OutpostConfig,
}

impl<'a, F: PageFetcher> Executor<'a, F> {
    /// Create an executor.
    pub const fn new(client: &'a GameClient<F>, config: &'a OutpostConfig) -> Self {
        Self { client, config }
    }

    /// Execute one action.
    ///
    /// Returns `Err` only for fatal errors. Rejected or failing requests
    /// are reported as [`ExecutionOutcome::Failed`].
    pub async fn execute(
        &self,
        action: &PlanAction,
        progress: &mut dyn ProgressSink,
    ) -> Result<ExecutionResult, CoreError> {
        progress.emit(ProgressEvent::ActionStarted(action.clone()));
        let result = match action {
            PlanAction::Infeasible { reason, .. } => ExecutionResult {
                action: action.clone(),
                final_level: 0,
                steps: 0,
                outcome: ExecutionOutcome::Skipped {
                    reason: reason.clone(),
                },
            },
            PlanAction::Construct {
                position,
                structure,
                target_level,
            } => {
                self.construct_then_upgrade(action, *position, structure, *target_level, progress)
                    .await?
            }
            PlanAction::Reuse {
                position,
                structure,
                target_level,
            } => {
                let (final_level, steps, outcome) = self
                    .upgrade_loop(*position, structure, *target_level, progress)
                    .await?;
                ExecutionResult {
                    action: action.clone(),
                    final_level,
                    steps,
                    outcome,
                }
            }
        };

        info!(
            action = %result.action,
            final_level = result.final_level,
            steps = result.steps,
            outcome = ?result.outcome,
            "action finished"
        );
        progress.emit(ProgressEvent::ActionFinished(result.clone()));
        Ok(result)
    }

    /// Execute actions in order.
    pub async fn execute_all(
        &self,
        actions: &[PlanAction],
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<ExecutionResult>, CoreError> {
        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            results.push(self.execute(action, progress).await?);
        }
        Ok(results)
    }

    /// Scan the village and plan `preset` without executing anything.
    pub async fn plan_preset(
        &self,
        preset: &Preset,
        progress: &mut dyn ProgressSink,
    ) -> Result<PresetPlan, CoreError> {
        let resource_actions = match preset.resource_target {
            Some(target) => {
                let fields =
                    scanner::scan(self.client, self.config.village.resource_fields(), progress)
                        .await?;
                planner::plan_upgrades(target, &fields)
            }
            None => Vec::new(),
        };
        let buildings =
            scanner::scan(self.client, self.config.village.building_slots(), progress).await?;
        let building_actions = planner::plan(&preset.structures, &buildings);
        Ok(PresetPlan {
            resource_actions,
            building_actions,
        })
    }

    /// Apply a preset: raise resource fields to the preset's target, then
    /// build and upgrade the preset's structures.
    pub async fn apply_preset(
        &self,
        preset: &Preset,
        progress: &mut dyn ProgressSink,
        recorder: &mut dyn TaskRecorder,
    ) -> Result<PresetReport, CoreError> {
        let run_id = RunId::new();
        info!(%run_id, preset = %preset.name, "applying preset");

        let plan = self.plan_preset(preset, progress).await?;
        let requested = count(plan.actions().count());
        recorder.record_task(TaskKind::Preset, requested);

        let resource_results = self.execute_all(&plan.resource_actions, progress).await?;
        let building_results = self.execute_all(&plan.building_actions, progress).await?;

        let report = PresetReport {
            run_id,
            preset: preset.name.clone(),
            resource_results,
            building_results,
        };
        recorder.record_outcome(TaskKind::Preset, requested, count(report.completed()));
        info!(
            %run_id,
            completed = report.completed(),
            total = report.total(),
            "preset applied"
        );
        Ok(report)
    }

    /// Upgrade every occupied slot in `range` to `target`.
    pub async fn upgrade_existing(
        &self,
        range: RangeInclusive<u32>,
        target: u32,
        progress: &mut dyn ProgressSink,
        recorder: &mut dyn TaskRecorder,
    ) -> Result<Vec<ExecutionResult>, CoreError> {
        let slots: SlotMap = scanner::scan(self.client, range, progress).await?;
        let actions = planner::plan_upgrades(target, &slots);
        let requested = count(actions.len());
        recorder.record_task(TaskKind::Upgrade, requested);

        let results = self.execute_all(&actions, progress).await?;
        let completed = results.iter().filter(|r| r.outcome.is_complete()).count();
        recorder.record_outcome(TaskKind::Upgrade, requested, count(completed));
        Ok(results)
    }

    async fn construct_then_upgrade(
        &self,
        action: &PlanAction,
        position: SlotPosition,
        structure: &StructureType,
        target_level: u32,
        progress: &mut dyn ProgressSink,
    ) -> Result<ExecutionResult, CoreError> {
        let failed = |reason: String| ExecutionResult {
            action: action.clone(),
            final_level: 0,
            steps: 0,
            outcome: ExecutionOutcome::Failed { reason },
        };

        let Some(building_id) = self.config.building_id(structure.name()) else {
            return Ok(failed(format!("no building id configured for {structure}")));
        };

        let page = match self.client.slot(position).await {
            Ok(page) => page,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => return Ok(failed(format!("could not read slot {position}: {err}"))),
        };
        if page.slot.occupancy != Occupancy::Empty {
            let holding = page.slot.name.as_deref().unwrap_or("something unreadable");
            return Ok(failed(format!("slot {position} is not empty (holds {holding})")));
        }
        let Some(link) = page.construct_link(building_id) else {
            return Ok(failed(format!(
                "{structure} (id {building_id}) cannot be built on slot {position} right now"
            )));
        };

        let submission = Submission::FollowLink {
            href: link.href.clone(),
        };
        match self.client.perform(&submission).await {
            Ok(_) => info!(%position, %structure, building_id, "construction queued"),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => return Ok(failed(format!("construct request failed: {err}"))),
        }

        if target_level <= 1 {
            return Ok(ExecutionResult {
                action: action.clone(),
                final_level: 1,
                steps: 0,
                outcome: ExecutionOutcome::Complete,
            });
        }

        let (final_level, steps, outcome) = self
            .upgrade_loop(position, structure, target_level, progress)
            .await?;
        Ok(ExecutionResult {
            action: action.clone(),
            final_level,
            steps,
            outcome,
        })
    }

    /// Step `position` towards `target`, one fresh token per step.
    ///
    /// Returns `(final_level, steps, outcome)`.
    async fn upgrade_loop(
        &self,
        position: SlotPosition,
        structure: &StructureType,
        target: u32,
        progress: &mut dyn ProgressSink,
    ) -> Result<(u32, u32, ExecutionOutcome), CoreError> {
        let max_steps = self.config.executor.max_upgrade_steps;
        let mut steps: u32 = 0;
        let mut level: u32 = 0;

        loop {
            let page = match self.client.slot(position).await {
                Ok(page) => page,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    let reason = format!("could not read slot {position}: {err}");
                    return Ok((level, steps, ExecutionOutcome::Failed { reason }));
                }
            };
            if page.slot.occupancy != Occupancy::Occupied {
                let reason = format!("slot {position} no longer holds {structure}");
                return Ok((level, steps, ExecutionOutcome::Failed { reason }));
            }

            level = page.slot.level;
            if level >= target {
                return Ok((level, steps, ExecutionOutcome::Complete));
            }
            if steps >= max_steps {
                let reason = format!("stopped after {steps} steps at level {level}");
                return Ok((level, steps, ExecutionOutcome::Partial { reason }));
            }
            let Some(token) = page.slot.upgrade else {
                let reason = format!("no upgrade available at level {level}; try again later");
                return Ok((level, steps, ExecutionOutcome::Partial { reason }));
            };

            let submission = Submission::FollowLink {
                href: token.href().to_owned(),
            };
            if let Err(err) = self.client.perform(&submission).await {
                if err.is_fatal() {
                    return Err(err);
                }
                warn!(%position, level, error = %err, "upgrade request failed");
                let reason = format!("upgrade request failed at level {level}: {err}");
                return Ok((level, steps, ExecutionOutcome::Failed { reason }));
            }
            steps = steps.saturating_add(1);
            progress.emit(ProgressEvent::UpgradeStep {
                position,
                from_level: level,
            });
        }
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
