use std::sync::Arc;

use reminder_scheduler::domain::sources::ReminderStatus;
use reminder_scheduler::{
    AppConfig, DomainEvent, ScheduleExecutionEngine, ScheduleSyncService, ScheduleTaskFactory,
    ScheduleTaskRepository, SourceModule, SyncOutcome,
};
use schedule_testing_utils::{
    init_test_logging, input_for, EngineCall, InMemoryExecutionEngine, InMemoryScheduleTaskRepository,
    ObjectiveSnapshotBuilder, ReminderSnapshotBuilder, WorkItemSnapshotBuilder,
};

struct Harness {
    service: ScheduleSyncService,
    repository: Arc<InMemoryScheduleTaskRepository>,
    engine: Arc<InMemoryExecutionEngine>,
}

async fn harness() -> Harness {
    init_test_logging();
    let repository = Arc::new(InMemoryScheduleTaskRepository::new());
    let engine = Arc::new(InMemoryExecutionEngine::new());
    engine.start(Vec::new()).await.unwrap();

    let service = ScheduleSyncService::new(
        Arc::new(ScheduleTaskFactory::from_config(&AppConfig::default())),
        repository.clone(),
        engine.clone(),
    );
    Harness {
        service,
        repository,
        engine,
    }
}

#[tokio::test]
async fn test_new_eligible_entity_is_persisted_and_registered() {
    let h = harness().await;
    let input = input_for(ReminderSnapshotBuilder::new("r-1").fixed_time(8, 30).into_entity());

    let outcome = h.service.on_entity_changed(&input).await.unwrap();
    let SyncOutcome::Created(task_uuid) = outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };

    let stored = h.repository.find_by_uuid(task_uuid).await.unwrap().unwrap();
    assert_eq!(stored.schedule().cron_expression(), "0 30 8 * * *");
    assert!(stored.pending_events().is_empty());
    assert!(h.engine.contains(task_uuid).await);
    assert_eq!(h.repository.outbox()[0].event_type(), "TaskCreated");
}

#[tokio::test]
async fn test_ineligible_new_entity_is_skipped() {
    let h = harness().await;
    let input = input_for(ReminderSnapshotBuilder::new("r-1").disabled().into_entity());

    assert_eq!(h.service.on_entity_changed(&input).await.unwrap(), SyncOutcome::Skipped);
    assert_eq!(h.repository.count(), 0);
    assert!(h.engine.get_active_tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_changed_entity_updates_existing_task() {
    let h = harness().await;
    let created = h
        .service
        .on_entity_changed(&input_for(ReminderSnapshotBuilder::new("r-1").interval(20).into_entity()))
        .await
        .unwrap();

    let updated = h
        .service
        .on_entity_changed(&input_for(ReminderSnapshotBuilder::new("r-1").interval(45).into_entity()))
        .await
        .unwrap();

    let (SyncOutcome::Created(first), SyncOutcome::Updated(second)) = (created, updated) else {
        panic!("unexpected outcomes: {created:?} / {updated:?}");
    };
    assert_eq!(first, second);
    assert_eq!(h.repository.count(), 1);

    let in_engine = h.engine.task(first).await.unwrap();
    assert_eq!(in_engine.schedule().cron_expression(), "0 0/45 * * * *");
    let outbox_types: Vec<String> = h
        .repository
        .outbox()
        .iter()
        .map(|event| event.event_type().to_string())
        .collect();
    assert!(outbox_types.contains(&"ScheduleUpdated".to_string()));
}

#[tokio::test]
async fn test_entity_no_longer_eligible_removes_task() {
    let h = harness().await;
    let SyncOutcome::Created(task_uuid) = h
        .service
        .on_entity_changed(&input_for(ReminderSnapshotBuilder::new("r-1").into_entity()))
        .await
        .unwrap()
    else {
        panic!("task was not created");
    };

    let completed = ReminderSnapshotBuilder::new("r-1")
        .with_status(ReminderStatus::Completed)
        .into_entity();
    let outcome = h.service.on_entity_changed(&input_for(completed)).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Removed(task_uuid));
    assert_eq!(h.repository.count(), 0);
    assert!(!h.engine.contains(task_uuid).await);
    assert!(h
        .repository
        .outbox()
        .iter()
        .any(|event| event.event_type() == "TaskRemoved"));
}

#[tokio::test]
async fn test_deleted_entity_removes_task() {
    let h = harness().await;
    h.service
        .on_entity_changed(&input_for(ObjectiveSnapshotBuilder::new("g-1").into_entity()))
        .await
        .unwrap();

    let outcome = h
        .service
        .on_entity_deleted(SourceModule::Objective, "g-1")
        .await
        .unwrap();
    assert!(matches!(outcome, SyncOutcome::Removed(_)));
    assert_eq!(h.repository.count(), 0);

    let again = h
        .service
        .on_entity_deleted(SourceModule::Objective, "g-1")
        .await
        .unwrap();
    assert_eq!(again, SyncOutcome::Skipped);
}

#[tokio::test]
async fn test_sync_batch_is_best_effort() {
    let h = harness().await;
    let inputs = vec![
        input_for(ObjectiveSnapshotBuilder::new("g-1").into_entity()),
        input_for(WorkItemSnapshotBuilder::new("w-1").into_entity()),
        input_for(ReminderSnapshotBuilder::new("r-bad").interval(0).into_entity()),
        input_for(ReminderSnapshotBuilder::new("r-off").disabled().into_entity()),
        input_for(ReminderSnapshotBuilder::new("r-ok").into_entity()),
    ];

    let report = h.service.sync_batch(&inputs).await;

    assert_eq!(report.created, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "r-bad");
    assert_eq!(report.failed[0].1.code(), "TASK_CREATION_FAILED");
    assert_eq!(report.engine_failures, 0);
    assert_eq!(h.engine.get_active_tasks().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_pause_resume_and_run_now() {
    let h = harness().await;
    let SyncOutcome::Created(task_uuid) = h
        .service
        .on_entity_changed(&input_for(ReminderSnapshotBuilder::new("r-1").one_time().into_entity()))
        .await
        .unwrap()
    else {
        panic!("task was not created");
    };

    h.service.pause(task_uuid).await.unwrap();
    assert!(!h.repository.find_by_uuid(task_uuid).await.unwrap().unwrap().is_enabled());
    assert_eq!(h.engine.is_paused(task_uuid).await, Some(true));

    h.service.resume(task_uuid).await.unwrap();
    assert_eq!(h.engine.is_paused(task_uuid).await, Some(false));

    // 一次性提醒执行一次后由引擎移除
    h.service.run_now(task_uuid).await.unwrap();
    assert!(!h.engine.contains(task_uuid).await);
    assert!(h.engine.calls().await.contains(&EngineCall::Run(task_uuid)));
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let h = harness().await;
    let error = h.service.run_now(uuid::Uuid::new_v4()).await.unwrap_err();
    assert_eq!(error.code(), "TASK_NOT_FOUND");
}
