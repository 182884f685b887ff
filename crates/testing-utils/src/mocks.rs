//! In-memory implementations of the domain ports
//!
//! These doubles can be used for unit and integration testing without a
//! real persistence layer or execution engine.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use schedule_core::CronScheduler;
use schedule_domain::{
    ExecutionStatus, ScheduleExecutionEngine, ScheduleTask, ScheduleTaskEvent, ScheduleTaskRepository,
    SourceModule,
};
use schedule_errors::{EngineOperation, ScheduleError, ScheduleResult};

/// In-memory `ScheduleTaskRepository`
///
/// Enforces one task per (source module, source entity id) and copies each
/// saved task's pending events into an outbox, as a transactional store would.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScheduleTaskRepository {
    tasks: Arc<Mutex<HashMap<Uuid, ScheduleTask>>>,
    outbox: Arc<Mutex<Vec<ScheduleTaskEvent>>>,
}

impl InMemoryScheduleTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<ScheduleTask> {
        self.tasks.lock().unwrap().values().cloned().collect()
    }

    /// Events written together with saved tasks
    pub fn outbox(&self) -> Vec<ScheduleTaskEvent> {
        self.outbox.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScheduleTaskRepository for InMemoryScheduleTaskRepository {
    async fn save(&self, task: &ScheduleTask) -> ScheduleResult<()> {
        let mut tasks = self.tasks.lock().unwrap();
        let duplicate = tasks.values().any(|existing| {
            existing.uuid() != task.uuid()
                && existing.source_module() == task.source_module()
                && existing.source_entity_id() == task.source_entity_id()
        });
        if duplicate {
            return Err(ScheduleError::invalid_config(
                "sourceEntityId",
                format!(
                    "来源实体已存在调度任务: {}/{}",
                    task.source_module(),
                    task.source_entity_id()
                ),
            ));
        }

        tasks.insert(task.uuid(), task.clone());
        self.outbox
            .lock()
            .unwrap()
            .extend(task.pending_events().iter().cloned());
        Ok(())
    }

    async fn find_by_uuid(&self, task_uuid: Uuid) -> ScheduleResult<Option<ScheduleTask>> {
        Ok(self.tasks.lock().unwrap().get(&task_uuid).cloned())
    }

    async fn find_by_source(
        &self,
        source_module: SourceModule,
        source_entity_id: &str,
    ) -> ScheduleResult<Option<ScheduleTask>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .find(|task| task.source_module() == source_module && task.source_entity_id() == source_entity_id)
            .cloned())
    }

    async fn find_by_account(&self, account_uuid: &str) -> ScheduleResult<Vec<ScheduleTask>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|task| task.account_uuid() == account_uuid)
            .cloned()
            .collect())
    }

    async fn delete(&self, task_uuid: Uuid) -> ScheduleResult<bool> {
        Ok(self.tasks.lock().unwrap().remove(&task_uuid).is_some())
    }
}

/// Engine calls recorded by [`InMemoryExecutionEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Start(usize),
    Stop,
    Add(Uuid),
    Remove(Uuid),
    Pause(Uuid),
    Resume(Uuid),
    Run(Uuid),
}

#[derive(Debug, Clone)]
struct EngineEntry {
    task: ScheduleTask,
    paused: bool,
}

#[derive(Debug, Default)]
struct EngineState {
    running: bool,
    entries: HashMap<Uuid, EngineEntry>,
    failing: HashSet<Uuid>,
    calls: Vec<EngineCall>,
}

/// In-memory `ScheduleExecutionEngine`
///
/// Does not fire anything on its own; `run_task` executes synchronously,
/// updates the task's execution history and drops tasks whose execution cap
/// has been reached.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExecutionEngine {
    state: Arc<RwLock<EngineState>>,
}

impl InMemoryExecutionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn calls(&self) -> Vec<EngineCall> {
        self.state.read().await.calls.clone()
    }

    pub async fn task(&self, task_uuid: Uuid) -> Option<ScheduleTask> {
        self.state
            .read()
            .await
            .entries
            .get(&task_uuid)
            .map(|entry| entry.task.clone())
    }

    pub async fn contains(&self, task_uuid: Uuid) -> bool {
        self.state.read().await.entries.contains_key(&task_uuid)
    }

    pub async fn is_paused(&self, task_uuid: Uuid) -> Option<bool> {
        self.state
            .read()
            .await
            .entries
            .get(&task_uuid)
            .map(|entry| entry.paused)
    }

    /// Make subsequent `run_task` calls for this task fail
    pub async fn fail_runs_of(&self, task_uuid: Uuid) {
        self.state.write().await.failing.insert(task_uuid);
    }

    fn prepare(mut task: ScheduleTask) -> ScheduleTask {
        let next_run_at = CronScheduler::new(task.schedule().cron_expression())
            .ok()
            .and_then(|scheduler| scheduler.next_execution_time(Utc::now()));
        task.schedule_next_run(next_run_at);
        task
    }

    fn ensure_running(state: &EngineState, operation: EngineOperation) -> ScheduleResult<()> {
        if state.running {
            Ok(())
        } else {
            Err(ScheduleError::engine(operation, "执行引擎未运行"))
        }
    }
}

#[async_trait]
impl ScheduleExecutionEngine for InMemoryExecutionEngine {
    async fn start(&self, initial_tasks: Vec<ScheduleTask>) -> ScheduleResult<()> {
        let mut state = self.state.write().await;
        if state.running {
            return Err(ScheduleError::engine(EngineOperation::Start, "执行引擎已在运行"));
        }
        state.calls.push(EngineCall::Start(initial_tasks.len()));
        state.running = true;
        for task in initial_tasks {
            let paused = !task.is_enabled();
            state.entries.insert(
                task.uuid(),
                EngineEntry {
                    task: Self::prepare(task),
                    paused,
                },
            );
        }
        Ok(())
    }

    async fn stop(&self) -> ScheduleResult<()> {
        let mut state = self.state.write().await;
        state.calls.push(EngineCall::Stop);
        state.running = false;
        Ok(())
    }

    async fn add_task(&self, task: ScheduleTask) -> ScheduleResult<()> {
        let mut state = self.state.write().await;
        Self::ensure_running(&state, EngineOperation::AddTask)?;
        state.calls.push(EngineCall::Add(task.uuid()));
        let paused = !task.is_enabled();
        state.entries.insert(
            task.uuid(),
            EngineEntry {
                task: Self::prepare(task),
                paused,
            },
        );
        Ok(())
    }

    async fn remove_task(&self, task_uuid: Uuid) -> ScheduleResult<()> {
        let mut state = self.state.write().await;
        Self::ensure_running(&state, EngineOperation::RemoveTask)?;
        state.calls.push(EngineCall::Remove(task_uuid));
        state
            .entries
            .remove(&task_uuid)
            .map(|_| ())
            .ok_or_else(|| ScheduleError::task_not_found(task_uuid.to_string()))
    }

    async fn pause_task(&self, task_uuid: Uuid) -> ScheduleResult<()> {
        let mut state = self.state.write().await;
        Self::ensure_running(&state, EngineOperation::PauseTask)?;
        state.calls.push(EngineCall::Pause(task_uuid));
        let entry = state
            .entries
            .get_mut(&task_uuid)
            .ok_or_else(|| ScheduleError::task_not_found(task_uuid.to_string()))?;
        entry.paused = true;
        Ok(())
    }

    async fn resume_task(&self, task_uuid: Uuid) -> ScheduleResult<()> {
        let mut state = self.state.write().await;
        Self::ensure_running(&state, EngineOperation::ResumeTask)?;
        state.calls.push(EngineCall::Resume(task_uuid));
        let entry = state
            .entries
            .get_mut(&task_uuid)
            .ok_or_else(|| ScheduleError::task_not_found(task_uuid.to_string()))?;
        entry.paused = false;
        Ok(())
    }

    async fn run_task(&self, task_uuid: Uuid) -> ScheduleResult<()> {
        let mut state = self.state.write().await;
        Self::ensure_running(&state, EngineOperation::RunTask)?;
        state.calls.push(EngineCall::Run(task_uuid));

        let failing = state.failing.contains(&task_uuid);
        let entry = state
            .entries
            .get_mut(&task_uuid)
            .ok_or_else(|| ScheduleError::task_not_found(task_uuid.to_string()))?;

        let now = Utc::now();
        let next_run_at = CronScheduler::new(entry.task.schedule().cron_expression())
            .ok()
            .and_then(|scheduler| scheduler.next_execution_time(now));
        let status = if failing {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Success
        };
        entry.task.record_execution(status, 0, now, next_run_at);

        if failing {
            let attempt = entry.task.execution_info().consecutive_failures;
            return Err(ScheduleError::task_execution(
                task_uuid.to_string(),
                Uuid::new_v4().to_string(),
                attempt,
                "模拟执行失败",
            ));
        }

        if entry.task.has_reached_execution_limit() {
            state.entries.remove(&task_uuid);
        }
        Ok(())
    }

    async fn get_active_tasks(&self) -> ScheduleResult<Vec<ScheduleTask>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .values()
            .filter(|entry| !entry.paused)
            .map(|entry| entry.task.clone())
            .collect())
    }

    async fn is_engine_running(&self) -> bool {
        self.state.read().await.running
    }
}
