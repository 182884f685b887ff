use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;


/// 错误严重程度提示，由调用方决定如何转换为用户可见的响应
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 执行引擎生命周期操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineOperation {
    Start,
    Stop,
    AddTask,
    RemoveTask,
    PauseTask,
    ResumeTask,
    RunTask,
}

impl EngineOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineOperation::Start => "start",
            EngineOperation::Stop => "stop",
            EngineOperation::AddTask => "add_task",
            EngineOperation::RemoveTask => "remove_task",
            EngineOperation::PauseTask => "pause_task",
            EngineOperation::ResumeTask => "resume_task",
            EngineOperation::RunTask => "run_task",
        }
    }
}

impl fmt::Display for EngineOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("未找到来源模块的调度策略: {source_module}")]
    StrategyNotFound {
        source_module: String,
        available_modules: Vec<String>,
    },
    #[error("来源实体无需调度: {source_module}/{source_entity_id} - {reason}")]
    EntityNoScheduleRequired {
        source_module: String,
        source_entity_id: String,
        reason: String,
    },
    #[error("无效的调度配置: {field} - {message}")]
    InvalidScheduleConfig { field: String, message: String },
    #[error("调度任务未找到: {task_uuid}")]
    TaskNotFound { task_uuid: String },
    #[error("创建调度任务失败: {source_module}/{source_entity_id} (步骤: {step})")]
    TaskCreation {
        source_module: String,
        source_entity_id: String,
        step: String,
        entity_snapshot: Value,
        #[source]
        source: Box<ScheduleError>,
    },
    #[error("更新调度任务失败: {task_uuid} (步骤: {step})")]
    TaskUpdate {
        task_uuid: String,
        step: String,
        #[source]
        source: Box<ScheduleError>,
    },
    #[error("删除调度任务失败: {task_uuid}")]
    TaskDeletion {
        task_uuid: String,
        #[source]
        source: Box<ScheduleError>,
    },
    #[error("调度任务执行失败: {task_uuid} (执行ID: {execution_id}, 第{attempt}次尝试) - {message}")]
    TaskExecution {
        task_uuid: String,
        execution_id: String,
        attempt: u32,
        message: String,
    },
    #[error("执行引擎操作失败: {operation} - {message}")]
    Engine {
        operation: EngineOperation,
        message: String,
    },
    #[error("无效的CRON表达式: {expr} - {message}")]
    InvalidCronExpression { expr: String, message: String },
    #[error("重试策略错误: {0}")]
    RetryPolicy(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

impl ScheduleError {
    pub fn strategy_not_found<S: Into<String>>(source_module: S, available_modules: Vec<String>) -> Self {
        Self::StrategyNotFound {
            source_module: source_module.into(),
            available_modules,
        }
    }
    pub fn no_schedule_required<M, I, R>(source_module: M, source_entity_id: I, reason: R) -> Self
    where
        M: Into<String>,
        I: Into<String>,
        R: Into<String>,
    {
        Self::EntityNoScheduleRequired {
            source_module: source_module.into(),
            source_entity_id: source_entity_id.into(),
            reason: reason.into(),
        }
    }
    pub fn invalid_config<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::InvalidScheduleConfig {
            field: field.into(),
            message: message.into(),
        }
    }
    pub fn task_not_found<S: Into<String>>(task_uuid: S) -> Self {
        Self::TaskNotFound {
            task_uuid: task_uuid.into(),
        }
    }
    pub fn task_creation<M, I, S>(
        source_module: M,
        source_entity_id: I,
        step: S,
        entity_snapshot: Value,
        source: ScheduleError,
    ) -> Self
    where
        M: Into<String>,
        I: Into<String>,
        S: Into<String>,
    {
        Self::TaskCreation {
            source_module: source_module.into(),
            source_entity_id: source_entity_id.into(),
            step: step.into(),
            entity_snapshot,
            source: Box::new(source),
        }
    }
    pub fn task_update<T: Into<String>, S: Into<String>>(task_uuid: T, step: S, source: ScheduleError) -> Self {
        Self::TaskUpdate {
            task_uuid: task_uuid.into(),
            step: step.into(),
            source: Box::new(source),
        }
    }
    pub fn task_deletion<T: Into<String>>(task_uuid: T, source: ScheduleError) -> Self {
        Self::TaskDeletion {
            task_uuid: task_uuid.into(),
            source: Box::new(source),
        }
    }
    pub fn task_execution<T, E, S>(task_uuid: T, execution_id: E, attempt: u32, message: S) -> Self
    where
        T: Into<String>,
        E: Into<String>,
        S: Into<String>,
    {
        Self::TaskExecution {
            task_uuid: task_uuid.into(),
            execution_id: execution_id.into(),
            attempt,
            message: message.into(),
        }
    }
    pub fn engine<S: Into<String>>(operation: EngineOperation, message: S) -> Self {
        Self::Engine {
            operation,
            message: message.into(),
        }
    }
    pub fn invalid_cron<E: Into<String>, S: Into<String>>(expr: E, message: S) -> Self {
        Self::InvalidCronExpression {
            expr: expr.into(),
            message: message.into(),
        }
    }
    pub fn retry_policy<S: Into<String>>(msg: S) -> Self {
        Self::RetryPolicy(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// 稳定的错误码，供调用方做分支判断和日志聚合
    pub fn code(&self) -> &'static str {
        match self {
            ScheduleError::StrategyNotFound { .. } => "STRATEGY_NOT_FOUND",
            ScheduleError::EntityNoScheduleRequired { .. } => "ENTITY_NO_SCHEDULE_REQUIRED",
            ScheduleError::InvalidScheduleConfig { .. } => "INVALID_SCHEDULE_CONFIG",
            ScheduleError::TaskNotFound { .. } => "TASK_NOT_FOUND",
            ScheduleError::TaskCreation { .. } => "TASK_CREATION_FAILED",
            ScheduleError::TaskUpdate { .. } => "TASK_UPDATE_FAILED",
            ScheduleError::TaskDeletion { .. } => "TASK_DELETION_FAILED",
            ScheduleError::TaskExecution { .. } => "TASK_EXECUTION_FAILED",
            ScheduleError::Engine { .. } => "ENGINE_ERROR",
            ScheduleError::InvalidCronExpression { .. } => "INVALID_CRON_EXPRESSION",
            ScheduleError::RetryPolicy(_) => "RETRY_POLICY_ERROR",
            ScheduleError::Configuration(_) => "CONFIGURATION_ERROR",
            ScheduleError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ScheduleError::EntityNoScheduleRequired { .. } => ErrorSeverity::Info,
            ScheduleError::InvalidScheduleConfig { .. }
            | ScheduleError::TaskNotFound { .. }
            | ScheduleError::InvalidCronExpression { .. }
            | ScheduleError::RetryPolicy(_) => ErrorSeverity::Warning,
            ScheduleError::TaskCreation { .. }
            | ScheduleError::TaskUpdate { .. }
            | ScheduleError::TaskDeletion { .. }
            | ScheduleError::TaskExecution { .. }
            | ScheduleError::Serialization(_) => ErrorSeverity::Error,
            ScheduleError::StrategyNotFound { .. }
            | ScheduleError::Engine { .. }
            | ScheduleError::Configuration(_) => ErrorSeverity::Critical,
        }
    }

    /// 结构化上下文，包装类错误会嵌套原始错误的上下文
    pub fn context(&self) -> Value {
        match self {
            ScheduleError::StrategyNotFound {
                source_module,
                available_modules,
            } => json!({
                "sourceModule": source_module,
                "availableModules": available_modules,
            }),
            ScheduleError::EntityNoScheduleRequired {
                source_module,
                source_entity_id,
                reason,
            } => json!({
                "sourceModule": source_module,
                "sourceEntityId": source_entity_id,
                "reason": reason,
            }),
            ScheduleError::InvalidScheduleConfig { field, message } => {
                json!({ "field": field, "message": message })
            }
            ScheduleError::TaskNotFound { task_uuid } => json!({ "taskUuid": task_uuid }),
            ScheduleError::TaskCreation {
                source_module,
                source_entity_id,
                step,
                entity_snapshot,
                source,
            } => json!({
                "sourceModule": source_module,
                "sourceEntityId": source_entity_id,
                "step": step,
                "entitySnapshot": entity_snapshot,
                "originalError": source.trace(),
            }),
            ScheduleError::TaskUpdate {
                task_uuid,
                step,
                source,
            } => json!({
                "taskUuid": task_uuid,
                "step": step,
                "originalError": source.trace(),
            }),
            ScheduleError::TaskDeletion { task_uuid, source } => json!({
                "taskUuid": task_uuid,
                "originalError": source.trace(),
            }),
            ScheduleError::TaskExecution {
                task_uuid,
                execution_id,
                attempt,
                message,
            } => json!({
                "taskUuid": task_uuid,
                "executionId": execution_id,
                "attempt": attempt,
                "message": message,
            }),
            ScheduleError::Engine { operation, message } => {
                json!({ "operation": operation.as_str(), "message": message })
            }
            ScheduleError::InvalidCronExpression { expr, message } => {
                json!({ "expression": expr, "message": message })
            }
            ScheduleError::RetryPolicy(message)
            | ScheduleError::Configuration(message)
            | ScheduleError::Serialization(message) => json!({ "message": message }),
        }
    }

    fn trace(&self) -> Value {
        json!({
            "code": self.code(),
            "message": self.to_string(),
            "context": self.context(),
        })
    }

    pub fn operation(&self) -> Option<&str> {
        match self {
            ScheduleError::TaskCreation { .. } => Some("create_from_source_entity"),
            ScheduleError::TaskUpdate { .. } => Some("update_from_source_entity"),
            ScheduleError::TaskDeletion { .. } => Some("delete"),
            ScheduleError::TaskExecution { .. } => Some("execute"),
            ScheduleError::Engine { operation, .. } => Some(operation.as_str()),
            _ => None,
        }
    }

    pub fn step(&self) -> Option<&str> {
        match self {
            ScheduleError::TaskCreation { step, .. } | ScheduleError::TaskUpdate { step, .. } => {
                Some(step)
            }
            _ => None,
        }
    }

    /// 原始错误（仅包装类错误存在）
    pub fn original_error(&self) -> Option<&ScheduleError> {
        match self {
            ScheduleError::TaskCreation { source, .. }
            | ScheduleError::TaskUpdate { source, .. }
            | ScheduleError::TaskDeletion { source, .. } => Some(source),
            _ => None,
        }
    }

    /// 预期内的业务分支，调用方不应按错误级别记录
    pub fn is_expected(&self) -> bool {
        matches!(self, ScheduleError::EntityNoScheduleRequired { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ScheduleError::TaskExecution { .. } | ScheduleError::Engine { .. } => true,
            ScheduleError::TaskCreation { source, .. }
            | ScheduleError::TaskUpdate { source, .. }
            | ScheduleError::TaskDeletion { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ScheduleError {
    fn from(err: serde_json::Error) -> Self {
        ScheduleError::Serialization(err.to_string())
    }
}
