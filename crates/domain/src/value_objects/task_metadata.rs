use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use schedule_errors::{ScheduleError, ScheduleResult};

/// payload 允许的最大键数量
pub const MAX_PAYLOAD_KEYS: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskPriority {
    #[serde(rename = "LOW")]
    Low,
    #[default]
    #[serde(rename = "NORMAL")]
    Normal,
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "URGENT")]
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Normal => "NORMAL",
            TaskPriority::High => "HIGH",
            TaskPriority::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(TaskPriority::Low),
            "NORMAL" => Ok(TaskPriority::Normal),
            "HIGH" => Ok(TaskPriority::High),
            "URGENT" => Ok(TaskPriority::Urgent),
            _ => Err(ScheduleError::Serialization(format!(
                "Invalid task priority: {s}"
            ))),
        }
    }
}

/// 任务元数据：优先级、标签、超时与关联来源实体的 payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TaskMetadataData")]
pub struct TaskMetadata {
    priority: TaskPriority,
    tags: Vec<String>,
    /// 执行超时（毫秒），由执行引擎解释
    timeout: Option<u64>,
    payload: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskMetadataData {
    #[serde(default)]
    priority: TaskPriority,
    #[serde(default)]
    tags: Vec<String>,
    timeout: Option<u64>,
    #[serde(default)]
    payload: BTreeMap<String, Value>,
}

/// 重复标签按首次出现去重，payload 超限时拒绝
impl TryFrom<TaskMetadataData> for TaskMetadata {
    type Error = ScheduleError;

    fn try_from(data: TaskMetadataData) -> Result<Self, Self::Error> {
        TaskMetadata::new(data.priority)
            .with_tags(data.tags)
            .with_timeout(data.timeout)
            .with_payload(data.payload)
    }
}

impl TaskMetadata {
    pub fn new(priority: TaskPriority) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn timeout(&self) -> Option<u64> {
        self.timeout
    }

    pub fn payload(&self) -> &BTreeMap<String, Value> {
        &self.payload
    }

    pub fn payload_value(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn with_priority(&self, priority: TaskPriority) -> Self {
        Self {
            priority,
            ..self.clone()
        }
    }

    pub fn with_timeout(&self, timeout: Option<u64>) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    /// 追加标签；已存在时返回等值实例
    pub fn add_tag<S: Into<String>>(&self, tag: S) -> Self {
        let tag = tag.into();
        let mut metadata = self.clone();
        if !metadata.has_tag(&tag) {
            metadata.tags.push(tag);
        }
        metadata
    }

    pub fn with_tags<I, S>(&self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        tags.into_iter()
            .fold(self.clone(), |metadata, tag| metadata.add_tag(tag))
    }

    pub fn remove_tag(&self, tag: &str) -> Self {
        let mut metadata = self.clone();
        metadata.tags.retain(|t| t != tag);
        metadata
    }

    pub fn with_payload(&self, payload: BTreeMap<String, Value>) -> ScheduleResult<Self> {
        Self::check_payload_size(payload.len())?;
        Ok(Self {
            payload,
            ..self.clone()
        })
    }

    pub fn with_payload_entry<K: Into<String>>(&self, key: K, value: Value) -> ScheduleResult<Self> {
        let mut payload = self.payload.clone();
        payload.insert(key.into(), value);
        self.with_payload(payload)
    }

    fn check_payload_size(len: usize) -> ScheduleResult<()> {
        if len > MAX_PAYLOAD_KEYS {
            return Err(ScheduleError::invalid_config(
                "metadata.payload",
                format!("payload 键数量 {len} 超过上限 {MAX_PAYLOAD_KEYS}"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_add_tag_is_idempotent() {
        let metadata = TaskMetadata::new(TaskPriority::High).add_tag("reminder");
        let again = metadata.add_tag("reminder");

        assert_eq!(metadata, again);
        assert_eq!(again.tags(), &["reminder".to_string()]);
    }

    #[test]
    fn test_tags_keep_insertion_order() {
        let metadata = TaskMetadata::default().with_tags(["objective", "reminder", "objective", "weekly"]);
        assert_eq!(metadata.tags(), &["objective", "reminder", "weekly"]);

        let removed = metadata.remove_tag("reminder");
        assert_eq!(removed.tags(), &["objective", "weekly"]);
        assert!(metadata.has_tag("reminder"));
    }

    #[test]
    fn test_payload_is_capped() {
        let full: BTreeMap<String, Value> = (0..MAX_PAYLOAD_KEYS)
            .map(|i| (format!("key{i}"), json!(i)))
            .collect();

        let metadata = TaskMetadata::default().with_payload(full).unwrap();
        assert_eq!(metadata.payload().len(), MAX_PAYLOAD_KEYS);

        let error = metadata.with_payload_entry("overflow", json!(true)).unwrap_err();
        assert_eq!(error.code(), "INVALID_SCHEDULE_CONFIG");

        // 覆盖已有键不会增加数量
        assert!(metadata.with_payload_entry("key0", json!("replaced")).is_ok());
    }

    #[test]
    fn test_deserialize_enforces_invariants() {
        let parsed: TaskMetadata = serde_json::from_value(json!({
            "priority": "HIGH",
            "tags": ["a", "a", "b"],
            "payload": { "k": 1 },
        }))
        .unwrap();
        assert_eq!(parsed.tags(), &["a", "b"]);
        assert_eq!(parsed.priority(), TaskPriority::High);

        let oversized: serde_json::Map<String, Value> = (0..MAX_PAYLOAD_KEYS + 50)
            .map(|i| (format!("key{i}"), json!(i)))
            .collect();
        let result = serde_json::from_value::<TaskMetadata>(json!({
            "priority": "LOW",
            "tags": [],
            "payload": oversized,
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_default_priority_is_normal() {
        assert_eq!(TaskMetadata::default().priority(), TaskPriority::Normal);
        assert!(TaskPriority::Urgent > TaskPriority::High);
        assert_eq!("URGENT".parse::<TaskPriority>().unwrap(), TaskPriority::Urgent);
    }

    #[test]
    fn test_serialized_shape() {
        let metadata = TaskMetadata::new(TaskPriority::Low)
            .with_timeout(Some(30_000))
            .add_tag("work-item")
            .with_payload_entry("sourceEntityId", json!("w-1"))
            .unwrap();

        assert_eq!(
            serde_json::to_value(&metadata).unwrap(),
            json!({
                "priority": "LOW",
                "tags": ["work-item"],
                "timeout": 30000,
                "payload": { "sourceEntityId": "w-1" },
            })
        );
    }
}
