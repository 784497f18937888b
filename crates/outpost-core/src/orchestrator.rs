//! Settlement workflow.
//!
//! One run walks the expansion checklist in order: culture points, a
//! residence, settlers, a free plot, and finally the settle request. The
//! first unmet precondition gets one corrective action (a celebration, a
//! construction, a training order) and the run stops in
//! [`WorkflowState::Blocked`] with a reason, because the fix needs game
//! time to take effect. Nothing is carried between runs; calling
//! [`SettlementOrchestrator::run`] again re-reads everything.

use outpost_types::{
    Coordinate, CulturePointState, ExecutionOutcome, Occupancy, PlanAction, RunId, SlotMap,
    SlotPosition, StructureType, WorkflowOutcome, WorkflowState,
};
use tracing::{info, warn};

use crate::client::GameClient;
use crate::config::OutpostConfig;
use crate::culture::CultureModel;
use crate::document::ResidencePage;
use crate::error::CoreError;
use crate::executor::Executor;
use crate::fetch::{PageFetcher, PageRequest, Submission};
use crate::plots::{self, PlotSearch};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::record::{TaskKind, TaskRecorder};
use crate::scanner;

/// Trail of one run.
struct Run {
    id: RunId,
    trail: Vec<WorkflowState>,
}

impl Run {
    fn enter(&mut self, state: WorkflowState, progress: &mut dyn ProgressSink) {
        info!(run_id = %self.id, state = %state, "workflow state");
        progress.emit(ProgressEvent::StateEntered(state.clone()));
        self.trail.push(state);
    }

    fn block(&mut self, reason: String, progress: &mut dyn ProgressSink) {
        self.enter(WorkflowState::Blocked(reason), progress);
    }
}

/// Drives the settlement workflow for one session.
pub struct SettlementOrchestrator<'a, F> {
    client: &'a GameClient<F>,
    config: &'a OutpostConfig,
    culture: CultureModel,
}

impl<'a, F: PageFetcher> SettlementOrchestrator<'a, F> {
    /// Create an orchestrator.
    pub fn new(client: &'a GameClient<F>, config: &'a OutpostConfig) -> Self {
        Self {
            client,
            config,
            culture: CultureModel::new(&config.culture),
        }
    }

    /// Run the workflow until it settles or blocks.
    ///
    /// Only fatal errors (an expired session) are returned as `Err`; every
    /// other problem ends the run in [`WorkflowState::Blocked`].
    pub async fn run(
        &self,
        progress: &mut dyn ProgressSink,
        recorder: &mut dyn TaskRecorder,
    ) -> Result<WorkflowOutcome, CoreError> {
        let mut run = Run {
            id: RunId::new(),
            trail: Vec::new(),
        };
        info!(run_id = %run.id, "settlement workflow starting");

        let settled_at = self.drive(&mut run, progress, recorder).await?;
        Ok(WorkflowOutcome {
            run_id: run.id,
            trail: run.trail,
            settled_at,
        })
    }

    async fn drive(
        &self,
        run: &mut Run,
        progress: &mut dyn ProgressSink,
        recorder: &mut dyn TaskRecorder,
    ) -> Result<Option<Coordinate>, CoreError> {
        self.client.ensure_session()?;

        run.enter(WorkflowState::CheckingCulturePoints, progress);
        let culture = match self.culture.current_state(self.client).await {
            Ok(state) => state,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                run.block(format!("could not read culture points: {err}"), progress);
                return Ok(None);
            }
        };
        let required = self.culture.required_for_next(culture.owned);
        info!(
            current = culture.current,
            required,
            owned = culture.owned,
            "culture points"
        );

        let settling = &self.config.settling;
        if culture.current < required {
            run.enter(WorkflowState::Celebrating, progress);
            let reason = self.celebrate(culture, required, progress, recorder).await?;
            run.block(reason, progress);
            return Ok(None);
        }

        run.enter(WorkflowState::CheckingResidence, progress);
        let buildings =
            scanner::scan(self.client, self.config.village.building_slots(), progress).await?;
        let Some(residence) = self.find_residence(&buildings) else {
            run.enter(WorkflowState::BuildingResidence, progress);
            let reason = self.build_residence(&buildings, progress, recorder).await?;
            run.block(reason, progress);
            return Ok(None);
        };

        run.enter(WorkflowState::CheckingSettlers, progress);
        let page = match self.client.residence(residence).await {
            Ok(page) => page,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                run.block(format!("could not read residence at slot {residence}: {err}"), progress);
                return Ok(None);
            }
        };
        if page.settlers < settling.settlers_required {
            run.enter(WorkflowState::TrainingSettlers, progress);
            let reason = self.train_settlers(residence, &page, recorder).await?;
            run.block(reason, progress);
            return Ok(None);
        }

        run.enter(WorkflowState::SearchingPlot, progress);
        let home = match self.home().await {
            Ok(home) => home,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                run.block(format!("could not determine home village: {err}"), progress);
                return Ok(None);
            }
        };
        recorder.record_task(TaskKind::PlotSearch, 1);
        let search = PlotSearch {
            center: home,
            radius: settling.search_radius,
            max_spots: 1,
            max_candidates: settling.max_candidates,
        };
        let found = plots::find_empty_plots(self.client, self.config.map, search, progress).await?;
        recorder.record_outcome(TaskKind::PlotSearch, 1, u32::from(!found.plots.is_empty()));
        let Some(plot) = found.plots.into_iter().next() else {
            run.block(
                format!(
                    "no empty plot found within radius {} of {home} ({} tiles probed)",
                    settling.search_radius, found.probed
                ),
                progress,
            );
            return Ok(None);
        };

        run.enter(WorkflowState::Settling, progress);
        let Some(settle) = plot.settle else {
            run.block(
                format!(
                    "settle request failed: tile {} offers no settle action",
                    plot.coordinate
                ),
                progress,
            );
            return Ok(None);
        };
        recorder.record_task(TaskKind::Settle, 1);
        match self.client.perform(&settle).await {
            Ok(_) => {
                recorder.record_outcome(TaskKind::Settle, 1, 1);
                info!(run_id = %run.id, plot = %plot.coordinate, "settlers sent");
                run.enter(WorkflowState::Done, progress);
                Ok(Some(plot.coordinate))
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                recorder.record_outcome(TaskKind::Settle, 1, 0);
                run.block(
                    format!("settle request failed at {}: {err}", plot.coordinate),
                    progress,
                );
                Ok(None)
            }
        }
    }

    /// Start a celebration and explain why the run has to wait.
    async fn celebrate(
        &self,
        culture: CulturePointState,
        required: u64,
        progress: &mut dyn ProgressSink,
        recorder: &mut dyn TaskRecorder,
    ) -> Result<String, CoreError> {
        let standing = format!("culture points {}/{required}", culture.current);
        let town_hall_name = &self.config.settling.town_hall_name;

        let buildings =
            scanner::scan(self.client, self.config.village.building_slots(), progress).await?;
        let Some(town_hall) = buildings.find_named(town_hall_name).map(|s| s.position) else {
            return Ok(format!(
                "{standing}; no {town_hall_name} to hold a celebration, build one first"
            ));
        };

        let action = match self.client.celebration(town_hall).await {
            Ok(Some(action)) => action,
            Ok(None) => {
                return Ok(format!(
                    "awaiting celebration: {standing}; none can be started now \
                     (one is running or resources are short)"
                ));
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => return Ok(format!("{standing}; could not read {town_hall_name}: {err}")),
        };

        recorder.record_task(TaskKind::Celebrate, 1);
        match self.client.perform(&action).await {
            Ok(_) => {
                recorder.record_outcome(TaskKind::Celebrate, 1, 1);
                info!(%town_hall, "celebration started");
                Ok(format!("awaiting celebration: {standing}"))
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                recorder.record_outcome(TaskKind::Celebrate, 1, 0);
                warn!(%town_hall, error = %err, "celebration request failed");
                Ok(format!("{standing}; celebration request failed: {err}"))
            }
        }
    }

    /// Lowest slot holding any residence-equivalent structure.
    fn find_residence(&self, buildings: &SlotMap) -> Option<SlotPosition> {
        let names = &self.config.settling.residence_names;
        buildings
            .iter()
            .filter(|slot| slot.occupancy == Occupancy::Occupied)
            .find(|slot| names.iter().any(|name| slot.name_matches(name)))
            .map(|slot| slot.position)
    }

    /// Queue a residence in the lowest empty slot.
    async fn build_residence(
        &self,
        buildings: &SlotMap,
        progress: &mut dyn ProgressSink,
        recorder: &mut dyn TaskRecorder,
    ) -> Result<String, CoreError> {
        let Some(position) = buildings.empty_positions().first().copied() else {
            return Ok(String::from("no empty slot to build a residence in"));
        };
        let structure = self
            .config
            .settling
            .residence_names
            .first()
            .map_or_else(|| StructureType::new("Residence"), StructureType::new);

        recorder.record_task(TaskKind::Construct, 1);
        let action = PlanAction::Construct {
            position,
            structure,
            target_level: 1,
        };
        let result = Executor::new(self.client, self.config)
            .execute(&action, progress)
            .await?;
        match result.outcome {
            ExecutionOutcome::Complete => {
                recorder.record_outcome(TaskKind::Construct, 1, 1);
                Ok(format!("awaiting residence construction at slot {position}"))
            }
            ExecutionOutcome::Partial { reason }
            | ExecutionOutcome::Failed { reason }
            | ExecutionOutcome::Skipped { reason } => {
                recorder.record_outcome(TaskKind::Construct, 1, 0);
                Ok(format!("residence construction at slot {position} failed: {reason}"))
            }
        }
    }

    /// Order training for the missing settlers.
    async fn train_settlers(
        &self,
        residence: SlotPosition,
        page: &ResidencePage,
        recorder: &mut dyn TaskRecorder,
    ) -> Result<String, CoreError> {
        let needed = self.config.settling.settlers_required;
        let shortfall = needed.saturating_sub(page.settlers);
        let field = page
            .settler_field
            .clone()
            .unwrap_or_else(|| self.config.settling.settler_field.clone());
        let offered_form = page.form_action.is_some();
        let action = page.form_action.clone().unwrap_or_else(|| {
            self.client
                .server()
                .pages
                .path_for(&PageRequest::Slot(residence))
        });
        if !offered_form {
            warn!(%residence, %action, "residence page has no training form, posting the fallback form");
        }

        let mut fields = page.hidden_fields.clone();
        fields.push((field, shortfall.to_string()));
        fields.push((String::from("s1.x"), String::from("50")));
        fields.push((String::from("s1.y"), String::from("10")));

        recorder.record_task(TaskKind::TrainSettlers, shortfall);
        match self
            .client
            .perform(&Submission::PostForm {
                action: action.clone(),
                fields,
            })
            .await
        {
            Ok(_) => {
                recorder.record_outcome(TaskKind::TrainSettlers, shortfall, shortfall);
                info!(%residence, shortfall, offered_form, "settler training requested");
                if offered_form {
                    Ok(format!(
                        "awaiting settler training: {}/{needed} settlers, {shortfall} queued",
                        page.settlers
                    ))
                } else {
                    Ok(format!(
                        "awaiting settler training: {}/{needed} settlers; the residence page \
                         offered no training form, so {shortfall} were requested through the \
                         fallback form at {action} (check the residence level)",
                        page.settlers
                    ))
                }
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                recorder.record_outcome(TaskKind::TrainSettlers, shortfall, 0);
                Ok(format!("settler training request failed: {err}"))
            }
        }
    }

    /// Center of the plot search: configured, else the first village.
    async fn home(&self) -> Result<Coordinate, CoreError> {
        if let Some(home) = self.config.settling.home {
            return Ok(home);
        }
        self.client
            .villages()
            .await?
            .first()
            .map(|village| village.coordinate)
            .ok_or_else(|| CoreError::LayoutMismatch(String::from("profile lists no villages")))
    }
}
