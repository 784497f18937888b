//! Integration tests for construction execution and preset application.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

mod common;

use common::{FakeGame, FakeSlot, config};
use outpost_core::client::GameClient;
use outpost_core::config::OutpostConfig;
use outpost_core::executor::Executor;
use outpost_core::fetch::FetchError;
use outpost_core::progress::{NoOpSink, ProgressEvent, VecSink};
use outpost_core::record::{MemoryRecorder, TaskKind};
use outpost_types::{
    ExecutionOutcome, PlanAction, Preset, SlotPosition, StructureRequirement, StructureType,
};

fn construct(position: u32, structure: &str, target_level: u32) -> PlanAction {
    PlanAction::Construct {
        position: SlotPosition(position),
        structure: StructureType::new(structure),
        target_level,
    }
}

fn reuse(position: u32, structure: &str, target_level: u32) -> PlanAction {
    PlanAction::Reuse {
        position: SlotPosition(position),
        structure: StructureType::new(structure),
        target_level,
    }
}

#[tokio::test(start_paused = true)]
async fn construct_follows_the_matching_link() {
    let config = config();
    let client = GameClient::new(FakeGame::new(), config.server.clone());
    let executor = Executor::new(&client, &config);

    let result = executor
        .execute(&construct(19, "Main Building", 1), &mut NoOpSink)
        .await
        .unwrap();

    assert_eq!(result.outcome, ExecutionOutcome::Complete);
    assert_eq!(result.final_level, 1);
    assert_eq!(
        client.fetcher().requests_matching("FOLLOW"),
        vec![String::from("FOLLOW build.php?id=19&b=15&k=c19")]
    );
    assert_eq!(client.fetcher().slot(19).name.as_deref(), Some("Main Building"));
}

#[tokio::test(start_paused = true)]
async fn construct_continues_into_upgrades() {
    let config = config();
    let client = GameClient::new(FakeGame::new(), config.server.clone());
    let mut sink = VecSink::default();

    let result = Executor::new(&client, &config)
        .execute(&construct(20, "Warehouse", 5), &mut sink)
        .await
        .unwrap();

    assert_eq!(result.outcome, ExecutionOutcome::Complete);
    assert_eq!(result.final_level, 5);
    assert_eq!(result.steps, 4);
    let steps = sink
        .events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::UpgradeStep { .. }))
        .count();
    assert_eq!(steps, 4);
}

#[tokio::test(start_paused = true)]
async fn upgrade_refetches_token_before_every_step() {
    let config = config();
    let game = FakeGame::new().with(|world| {
        world.slots.insert(30, FakeSlot::occupied("Warehouse", 3));
    });
    let client = GameClient::new(game, config.server.clone());

    let result = Executor::new(&client, &config)
        .execute(&reuse(30, "Warehouse", 6), &mut NoOpSink)
        .await
        .unwrap();

    assert_eq!(result.outcome, ExecutionOutcome::Complete);
    assert_eq!((result.final_level, result.steps), (6, 3));
    assert_eq!(
        client.fetcher().requests(),
        vec![
            "GET build.php?id=30",
            "FOLLOW build.php?id=30&k=u30l3",
            "GET build.php?id=30",
            "FOLLOW build.php?id=30&k=u30l4",
            "GET build.php?id=30",
            "FOLLOW build.php?id=30&k=u30l5",
            "GET build.php?id=30",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn missing_token_stops_with_partial() {
    let config = config();
    let game = FakeGame::new().with(|world| {
        world.slots.insert(
            30,
            FakeSlot {
                max_level: 4,
                ..FakeSlot::occupied("Granary", 2)
            },
        );
    });
    let client = GameClient::new(game, config.server.clone());

    let result = Executor::new(&client, &config)
        .execute(&reuse(30, "Granary", 10), &mut NoOpSink)
        .await
        .unwrap();

    assert_eq!(result.final_level, 4);
    assert_eq!(result.steps, 2);
    assert!(
        matches!(&result.outcome, ExecutionOutcome::Partial { reason } if reason.contains("try again later"))
    );
}

#[tokio::test(start_paused = true)]
async fn step_ceiling_bounds_the_loop() {
    let mut config = config();
    config.executor.max_upgrade_steps = 2;
    let game = FakeGame::new().with(|world| {
        world.slots.insert(31, FakeSlot::occupied("Stable", 1));
    });
    let client = GameClient::new(game, config.server.clone());

    let result = Executor::new(&client, &config)
        .execute(&reuse(31, "Stable", 10), &mut NoOpSink)
        .await
        .unwrap();

    assert_eq!((result.final_level, result.steps), (3, 2));
    assert!(matches!(result.outcome, ExecutionOutcome::Partial { .. }));
}

#[tokio::test(start_paused = true)]
async fn construct_on_occupied_slot_fails_without_request() {
    let config = config();
    let game = FakeGame::new().with(|world| {
        world.slots.insert(19, FakeSlot::occupied("Barracks", 1));
    });
    let client = GameClient::new(game, config.server.clone());

    let result = Executor::new(&client, &config)
        .execute(&construct(19, "Main Building", 1), &mut NoOpSink)
        .await
        .unwrap();

    assert!(
        matches!(&result.outcome, ExecutionOutcome::Failed { reason } if reason.contains("not empty"))
    );
    assert!(client.fetcher().requests_matching("FOLLOW").is_empty());
}

#[tokio::test(start_paused = true)]
async fn unknown_structure_type_fails() {
    let config = config();
    let client = GameClient::new(FakeGame::new(), config.server.clone());

    let result = Executor::new(&client, &config)
        .execute(&construct(19, "Wonder of the World", 1), &mut NoOpSink)
        .await
        .unwrap();

    assert!(
        matches!(&result.outcome, ExecutionOutcome::Failed { reason } if reason.contains("no building id"))
    );
    assert!(client.fetcher().requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rejected_upgrade_is_failed_not_retried() {
    let config = config();
    let game = FakeGame::new().with(|world| {
        world.slots.insert(30, FakeSlot::occupied("Warehouse", 3));
        world.failures.insert(
            String::from("build.php?id=30&k=u30l3"),
            [FetchError::Transport(String::from("reset"))].into(),
        );
    });
    let client = GameClient::new(game, config.server.clone());

    let result = Executor::new(&client, &config)
        .execute(&reuse(30, "Warehouse", 6), &mut NoOpSink)
        .await
        .unwrap();

    assert!(matches!(result.outcome, ExecutionOutcome::Failed { .. }));
    assert_eq!(client.fetcher().requests_matching("FOLLOW").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn infeasible_actions_are_skipped() {
    let config = config();
    let client = GameClient::new(FakeGame::new(), config.server.clone());
    let action = PlanAction::Infeasible {
        structure: StructureType::new("Granary"),
        reason: String::from("no empty slot for Granary"),
    };

    let result = Executor::new(&client, &config)
        .execute(&action, &mut NoOpSink)
        .await
        .unwrap();

    assert!(matches!(result.outcome, ExecutionOutcome::Skipped { .. }));
    assert!(client.fetcher().requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn apply_preset_runs_fields_then_buildings() {
    let config = config();
    let client = GameClient::new(FakeGame::new(), config.server.clone());
    let preset = Preset {
        name: String::from("Test"),
        description: String::new(),
        resource_target: Some(2),
        structures: vec![
            StructureRequirement::new("Warehouse", 2).times(2),
            StructureRequirement::new("Main Building", 1),
        ],
    };
    let mut recorder = MemoryRecorder::default();

    let report = Executor::new(&client, &config)
        .apply_preset(&preset, &mut NoOpSink, &mut recorder)
        .await
        .unwrap();

    assert_eq!(report.resource_results.len(), 18);
    assert_eq!(report.building_results.len(), 3);
    assert_eq!(report.completed(), 21);
    assert_eq!(report.total(), 21);
    assert_eq!(client.fetcher().slot(1).level, 2);
    assert_eq!(client.fetcher().slot(19).name.as_deref(), Some("Warehouse"));
    assert_eq!(client.fetcher().slot(20).level, 2);
    assert_eq!(client.fetcher().slot(21).name.as_deref(), Some("Main Building"));
    assert_eq!(recorder.tasks, vec![(TaskKind::Preset, 21)]);
    assert_eq!(recorder.outcomes, vec![(TaskKind::Preset, 21, 21)]);
}

#[tokio::test(start_paused = true)]
async fn oversubscribed_builtin_preset_reports_infeasible() {
    let config = OutpostConfig {
        server: common::fast_server(),
        ..OutpostConfig::default()
    };
    let game = FakeGame::new().with(|world| {
        for position in 19..=36 {
            world.slots.insert(position, FakeSlot::occupied("Cranny", 1));
        }
    });
    let client = GameClient::new(game, config.server.clone());
    let farm = config.presets.get("farm").unwrap();

    let plan = Executor::new(&client, &config)
        .plan_preset(farm, &mut NoOpSink)
        .await
        .unwrap();

    let infeasible = plan
        .building_actions
        .iter()
        .filter(|a| matches!(a, PlanAction::Infeasible { .. }))
        .count();
    assert_eq!(plan.building_actions.len(), 22);
    assert_eq!(infeasible, 18);
    assert!(client.fetcher().requests_matching("FOLLOW").is_empty());
}

#[tokio::test(start_paused = true)]
async fn upgrade_existing_skips_empty_slots() {
    let config = config();
    let game = FakeGame::new().with(|world| {
        world.slots.insert(22, FakeSlot::occupied("Academy", 1));
        world.slots.insert(23, FakeSlot::occupied("Smithy", 4));
    });
    let client = GameClient::new(game, config.server.clone());
    let mut recorder = MemoryRecorder::default();

    let results = Executor::new(&client, &config)
        .upgrade_existing(19..=40, 3, &mut NoOpSink, &mut recorder)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].final_level, 3);
    assert_eq!(client.fetcher().slot(23).level, 4);
    assert_eq!(recorder.outcomes, vec![(TaskKind::Upgrade, 1, 1)]);
}
