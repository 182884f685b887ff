use std::sync::Arc;

use chrono::Duration;
use schedule_core::AppConfig;
use schedule_domain::sources::{ObjectiveTriggerKind, RecurrenceFrequency, RecurrenceRule};
use schedule_domain::{ScheduleStrategyInput, SourceModule};
use schedule_strategies::{
    ObjectiveScheduleStrategy, ReminderScheduleStrategy, ScheduleStrategy, ScheduleStrategyFactory, ScheduleTaskFactory,
    StrategySettings, WorkItemScheduleStrategy,
};
use schedule_testing_utils::{
    assert_contains_exactly, init_test_logging, input_for, test_now, ObjectiveSnapshotBuilder,
    ReminderSnapshotBuilder, WorkItemSnapshotBuilder,
};

fn objective_input(days: i64) -> ScheduleStrategyInput {
    input_for(
        ObjectiveSnapshotBuilder::new("g-1")
            .with_duration_days(test_now(), days)
            .into_entity(),
    )
}

#[test]
fn scenario_short_objective_twice_daily() {
    let task = ScheduleTaskFactory::from_config(&AppConfig::default())
        .create_from_source_entity(&objective_input(10))
        .unwrap();
    assert_eq!(task.schedule().cron_expression(), "0 0 9,20 * * *");
}

#[test]
fn scenario_long_objective_weekly_monday() {
    let task = ScheduleTaskFactory::from_config(&AppConfig::default())
        .create_from_source_entity(&objective_input(400))
        .unwrap();
    assert_eq!(task.schedule().cron_expression(), "0 0 9 * * 1");
}

#[test]
fn scenario_one_time_fixed_time_reminder() {
    let input = input_for(ReminderSnapshotBuilder::new("r-1").one_time().fixed_time(8, 30).into_entity());
    let task = ScheduleTaskFactory::from_config(&AppConfig::default())
        .create_from_source_entity(&input)
        .unwrap();
    assert_eq!(task.schedule().cron_expression(), "0 30 8 * * *");
    assert_eq!(task.schedule().max_executions(), Some(1));
}

#[test]
fn scenario_interval_reminders() {
    let factory = ScheduleTaskFactory::from_config(&AppConfig::default());

    let every_20 = factory
        .create_from_source_entity(&input_for(ReminderSnapshotBuilder::new("r-20").interval(20).into_entity()))
        .unwrap();
    assert_eq!(every_20.schedule().cron_expression(), "0 0,20,40 * * * *");

    let every_45 = factory
        .create_from_source_entity(&input_for(ReminderSnapshotBuilder::new("r-45").interval(45).into_entity()))
        .unwrap();
    assert_eq!(every_45.schedule().cron_expression(), "0 0/45 * * * *");
}

#[test]
fn scenario_unregistered_module_lists_registered() {
    let mut registry = ScheduleStrategyFactory::new();
    registry.register_strategy(Arc::new(ObjectiveScheduleStrategy::default()));
    registry.register_strategy(Arc::new(ReminderScheduleStrategy::default()));
    let factory = ScheduleTaskFactory::new(Arc::new(registry), Default::default());

    assert!(!factory.supports_source_module(SourceModule::WorkItem));
    let error = factory
        .create_from_source_entity(&input_for(WorkItemSnapshotBuilder::new("w-1").into_entity()))
        .unwrap_err();

    assert_eq!(error.code(), "STRATEGY_NOT_FOUND");
    assert!(!error.is_retryable());
    assert_eq!(
        error.context()["availableModules"],
        serde_json::json!(["OBJECTIVE", "REMINDER"])
    );
}

#[test]
fn scenario_batch_skips_ineligible_input() {
    init_test_logging();
    let factory = ScheduleTaskFactory::from_config(&AppConfig::default());

    let inputs = vec![
        objective_input(10),
        input_for(WorkItemSnapshotBuilder::new("w-1").into_entity()),
        input_for(ReminderSnapshotBuilder::new("r-3").disabled().into_entity()),
        input_for(ReminderSnapshotBuilder::new("r-4").interval(20).into_entity()),
        input_for(ReminderSnapshotBuilder::new("r-5").one_time().into_entity()),
    ];

    let tasks = factory.create_batch(&inputs);
    let ids: Vec<&str> = tasks.iter().map(|task| task.source_entity_id()).collect();
    assert_contains_exactly(&ids, &["g-1", "w-1", "r-4", "r-5"]);
}

#[test]
fn batch_survives_extreme_trigger_values() {
    init_test_logging();
    let factory = ScheduleTaskFactory::from_config(&AppConfig::default());

    let mut impossible_date = RecurrenceRule::new(RecurrenceFrequency::Yearly);
    impossible_date.day_of_month = Some(31);
    impossible_date.month = Some(4);

    let inputs = vec![
        input_for(
            ObjectiveSnapshotBuilder::new("g-far")
                .with_duration_days(test_now(), 60)
                .with_triggers(vec![(ObjectiveTriggerKind::RemainingDays, 200_000_000)])
                .into_entity(),
        ),
        input_for(
            ObjectiveSnapshotBuilder::new("g-percent")
                .with_duration_days(test_now(), 3650)
                .with_triggers(vec![
                    (ObjectiveTriggerKind::TimeProgressPercentage, 100_000_000),
                    (ObjectiveTriggerKind::TimeProgressPercentage, 250),
                ])
                .into_entity(),
        ),
        input_for(WorkItemSnapshotBuilder::new("w-bad").with_recurrence(impossible_date).into_entity()),
        input_for(ReminderSnapshotBuilder::new("r-1").interval(u32::MAX).into_entity()),
        input_for(ReminderSnapshotBuilder::new("r-2").into_entity()),
    ];

    let tasks = factory.create_batch(&inputs);
    let ids: Vec<&str> = tasks.iter().map(|task| task.source_entity_id()).collect();
    assert_contains_exactly(&ids, &["g-far", "g-percent", "r-1", "r-2"]);

    assert!(tasks[0].metadata().payload_value("triggers").unwrap().as_array().unwrap().is_empty());
    let percent_triggers = tasks[1].metadata().payload_value("triggers").unwrap().as_array().unwrap();
    assert_eq!(percent_triggers.len(), 1);
    assert_eq!(percent_triggers[0]["value"], serde_json::json!(250));
    assert_eq!(tasks[2].schedule().cron_expression(), "0 0 * * * *");
}

#[test]
fn ineligible_entities_never_yield_a_schedule() {
    let strategies: Vec<Box<dyn ScheduleStrategy>> = vec![
        Box::new(ObjectiveScheduleStrategy::default()),
        Box::new(WorkItemScheduleStrategy::default()),
        Box::new(ReminderScheduleStrategy::default()),
    ];
    let entities = vec![
        ObjectiveSnapshotBuilder::new("g-1").with_reminders_disabled().into_entity(),
        ObjectiveSnapshotBuilder::new("g-2")
            .with_triggers(vec![])
            .with_disabled_trigger(ObjectiveTriggerKind::RemainingDays, 1)
            .into_entity(),
        WorkItemSnapshotBuilder::new("w-1").one_time().into_entity(),
        WorkItemSnapshotBuilder::new("w-2").without_recurrence().into_entity(),
        ReminderSnapshotBuilder::new("r-1").without_trigger().into_entity(),
        ReminderSnapshotBuilder::new("r-2").disabled().into_entity(),
    ];

    for strategy in &strategies {
        for entity in &entities {
            if strategy.should_create_schedule(entity) {
                continue;
            }
            let input = input_for(entity.clone()).with_source_module(strategy.source_module());
            let error = strategy.create_schedule(&input).unwrap_err();
            assert!(error.is_expected(), "{} accepted {:?}", strategy.name(), entity);
        }
    }
}

#[test]
fn create_schedule_is_idempotent_for_every_strategy() {
    let settings = StrategySettings::default();
    let cases: Vec<(Box<dyn ScheduleStrategy>, ScheduleStrategyInput)> = vec![
        (
            Box::new(ObjectiveScheduleStrategy::new(settings.clone())),
            objective_input(45),
        ),
        (
            Box::new(WorkItemScheduleStrategy::new(settings.clone())),
            input_for(WorkItemSnapshotBuilder::new("w-1").into_entity()),
        ),
        (
            Box::new(ReminderScheduleStrategy::new(settings)),
            input_for(ReminderSnapshotBuilder::new("r-1").interval(45).into_entity()),
        ),
    ];

    for (strategy, input) in cases {
        let first = strategy.create_schedule(&input).unwrap();
        let second = strategy.create_schedule(&input).unwrap();
        assert_eq!(first, second, "{}", strategy.name());
    }
}

#[test]
fn objective_triggers_are_recomputed_against_evaluation_time() {
    let strategy = ObjectiveScheduleStrategy::default();
    let input = objective_input(60);
    let early = strategy.create_schedule(&input).unwrap();

    // 50% 触发点在第30天，之后再评估时应被丢弃
    let later = strategy
        .create_schedule(&input.clone().at(test_now() + Duration::days(31)))
        .unwrap();

    assert_eq!(early.metadata.payload_value("triggers").unwrap().as_array().unwrap().len(), 1);
    assert!(later.metadata.payload_value("triggers").unwrap().as_array().unwrap().is_empty());
    assert_eq!(early.schedule_config, later.schedule_config);
}
