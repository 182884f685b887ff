//! 来源实体快照
//!
//! 应用层在实体创建/更新时提供的只读快照。策略只读取快照，不回查来源模块。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use schedule_errors::{ScheduleError, ScheduleResult};

use crate::entities::SourceModule;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// 一天中的时刻，序列化为 `"HH:MM"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> ScheduleResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::invalid_config(
                "timeOfDay",
                format!("无效的时刻: {hour}:{minute}"),
            ));
        }
        Ok(Self { hour, minute })
    }

    /// 按一天的分钟数取模构造，负数会回绕到前一天
    pub fn from_minute_of_day(minutes: i64) -> Self {
        let minutes = minutes.rem_euclid(MINUTES_PER_DAY as i64) as u32;
        Self {
            hour: minutes / 60,
            minute: minutes % 60,
        }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn minute_of_day(&self) -> u32 {
        self.hour * 60 + self.minute
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::invalid_config("timeOfDay", format!("无法解析的时刻: {s}"));
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = hour.parse().map_err(|_| invalid())?;
        let minute = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportanceLevel {
    Vital,
    Important,
    Moderate,
    Minor,
    Trivial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    Critical,
    High,
    Medium,
    Low,
    None,
}

// ---------------------------------------------------------------------------
// 目标（Objective）
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectiveTriggerKind {
    /// 时间进度达到百分比
    TimeProgressPercentage,
    /// 距离截止剩余天数
    RemainingDays,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveReminderTrigger {
    pub kind: ObjectiveTriggerKind,
    pub value: u32,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveReminderConfig {
    pub enabled: bool,
    #[serde(default)]
    pub triggers: Vec<ObjectiveReminderTrigger>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveSnapshot {
    pub uuid: String,
    pub title: String,
    pub description: Option<String>,
    pub importance: ImportanceLevel,
    pub urgency: UrgencyLevel,
    pub start_date: Option<DateTime<Utc>>,
    pub target_date: Option<DateTime<Utc>>,
    pub reminder_config: Option<ObjectiveReminderConfig>,
}

impl ObjectiveSnapshot {
    /// 目标总时长（整天数，向下取整）；缺少起止时间或区间非正时未知
    pub fn duration_days(&self) -> Option<i64> {
        match (self.start_date, self.target_date) {
            (Some(start), Some(target)) if target > start => Some((target - start).num_days()),
            _ => None,
        }
    }

    pub fn enabled_triggers(&self) -> impl Iterator<Item = &ObjectiveReminderTrigger> {
        self.reminder_config
            .iter()
            .filter(|config| config.enabled)
            .flat_map(|config| config.triggers.iter())
            .filter(|trigger| trigger.enabled)
    }
}

// ---------------------------------------------------------------------------
// 工作项（WorkItem）
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkItemKind {
    OneTime,
    Recurring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

fn default_interval() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub frequency: RecurrenceFrequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// 0=周日..6=周六
    #[serde(default)]
    pub days_of_week: Vec<u32>,
    /// 每月/每年重复的锚定日
    pub day_of_month: Option<u32>,
    /// 每年重复的锚定月份
    pub month: Option<u32>,
    /// 总发生次数上限
    pub occurrences: Option<u32>,
}

impl RecurrenceRule {
    pub fn new(frequency: RecurrenceFrequency) -> Self {
        Self {
            frequency,
            interval: default_interval(),
            days_of_week: Vec::new(),
            day_of_month: None,
            month: None,
            occurrences: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OffsetUnit {
    Minutes,
    Hours,
    Days,
}

impl OffsetUnit {
    pub fn to_minutes(&self) -> u32 {
        match self {
            OffsetUnit::Minutes => 1,
            OffsetUnit::Hours => 60,
            OffsetUnit::Days => MINUTES_PER_DAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkItemReminderTrigger {
    /// 绝对时刻
    Absolute { time: TimeOfDay },
    /// 相对工作项时间点提前
    Relative { value: u32, unit: OffsetUnit },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemReminderConfig {
    pub enabled: bool,
    #[serde(default)]
    pub triggers: Vec<WorkItemReminderTrigger>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemSnapshot {
    pub uuid: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: WorkItemKind,
    pub importance: ImportanceLevel,
    pub urgency: UrgencyLevel,
    /// 工作项配置的时间点
    pub time_point: Option<TimeOfDay>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub recurrence_rule: Option<RecurrenceRule>,
    pub reminder_config: Option<WorkItemReminderConfig>,
}

// ---------------------------------------------------------------------------
// 提醒（Reminder）
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderType {
    OneTime,
    Recurring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// CRON周字段取值（0=周日..6=周六）
    pub fn cron_index(&self) -> u32 {
        match self {
            DayOfWeek::Sunday => 0,
            DayOfWeek::Monday => 1,
            DayOfWeek::Tuesday => 2,
            DayOfWeek::Wednesday => 3,
            DayOfWeek::Thursday => 4,
            DayOfWeek::Friday => 5,
            DayOfWeek::Saturday => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderTrigger {
    FixedTime { time: TimeOfDay },
    /// 每隔 N 分钟
    Interval { minutes: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderRecurrence {
    Daily,
    Weekly { weekdays: Vec<DayOfWeek> },
    CustomDays { weekdays: Vec<DayOfWeek> },
}

impl ReminderRecurrence {
    pub fn weekdays(&self) -> &[DayOfWeek] {
        match self {
            ReminderRecurrence::Daily => &[],
            ReminderRecurrence::Weekly { weekdays } | ReminderRecurrence::CustomDays { weekdays } => {
                weekdays
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSnapshot {
    pub uuid: String,
    pub title: String,
    pub description: Option<String>,
    pub reminder_type: ReminderType,
    pub status: ReminderStatus,
    pub self_enabled: bool,
    pub importance: ImportanceLevel,
    pub trigger: Option<ReminderTrigger>,
    pub recurrence: Option<ReminderRecurrence>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------

/// 来源实体快照的封闭联合
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "module", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceEntity {
    Objective(ObjectiveSnapshot),
    WorkItem(WorkItemSnapshot),
    Reminder(ReminderSnapshot),
}

impl SourceEntity {
    pub fn source_module(&self) -> SourceModule {
        match self {
            SourceEntity::Objective(_) => SourceModule::Objective,
            SourceEntity::WorkItem(_) => SourceModule::WorkItem,
            SourceEntity::Reminder(_) => SourceModule::Reminder,
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            SourceEntity::Objective(objective) => &objective.uuid,
            SourceEntity::WorkItem(work_item) => &work_item.uuid,
            SourceEntity::Reminder(reminder) => &reminder.uuid,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            SourceEntity::Objective(objective) => &objective.title,
            SourceEntity::WorkItem(work_item) => &work_item.title,
            SourceEntity::Reminder(reminder) => &reminder.title,
        }
    }
}

impl From<ObjectiveSnapshot> for SourceEntity {
    fn from(value: ObjectiveSnapshot) -> Self {
        SourceEntity::Objective(value)
    }
}

impl From<WorkItemSnapshot> for SourceEntity {
    fn from(value: WorkItemSnapshot) -> Self {
        SourceEntity::WorkItem(value)
    }
}

impl From<ReminderSnapshot> for SourceEntity {
    fn from(value: ReminderSnapshot) -> Self {
        SourceEntity::Reminder(value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_time_of_day_parsing() {
        let time: TimeOfDay = "08:30".parse().unwrap();
        assert_eq!(time.hour(), 8);
        assert_eq!(time.minute(), 30);
        assert_eq!(time.minute_of_day(), 510);
        assert_eq!(time.to_string(), "08:30");

        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("8".parse::<TimeOfDay>().is_err());
        assert!("ab:cd".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_time_of_day_wraps_modulo_day() {
        assert_eq!(TimeOfDay::from_minute_of_day(-30), TimeOfDay::new(23, 30).unwrap());
        assert_eq!(TimeOfDay::from_minute_of_day(1440 + 61), TimeOfDay::new(1, 1).unwrap());
    }

    #[test]
    fn test_time_of_day_serde() {
        let time = TimeOfDay::new(9, 5).unwrap();
        assert_eq!(serde_json::to_value(time).unwrap(), json!("09:05"));
        let parsed: TimeOfDay = serde_json::from_value(json!("21:45")).unwrap();
        assert_eq!(parsed, TimeOfDay::new(21, 45).unwrap());
    }

    #[test]
    fn test_objective_duration_days() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut objective = ObjectiveSnapshot {
            uuid: "g-1".to_string(),
            title: "Ship v1".to_string(),
            description: None,
            importance: ImportanceLevel::Important,
            urgency: UrgencyLevel::Medium,
            start_date: Some(start),
            target_date: Some(start + Duration::days(45)),
            reminder_config: None,
        };
        assert_eq!(objective.duration_days(), Some(45));

        objective.target_date = Some(start - Duration::days(1));
        assert_eq!(objective.duration_days(), None);

        objective.start_date = None;
        assert_eq!(objective.duration_days(), None);
    }

    #[test]
    fn test_day_of_week_cron_index() {
        assert_eq!(DayOfWeek::Sunday.cron_index(), 0);
        assert_eq!(DayOfWeek::Monday.cron_index(), 1);
        assert_eq!(DayOfWeek::Saturday.cron_index(), 6);
    }

    #[test]
    fn test_source_entity_tagged_serde() {
        let value = json!({
            "module": "REMINDER",
            "uuid": "r-1",
            "title": "Stretch",
            "description": null,
            "reminderType": "RECURRING",
            "status": "ACTIVE",
            "selfEnabled": true,
            "importance": "MODERATE",
            "trigger": { "type": "INTERVAL", "minutes": 20 },
            "recurrence": { "type": "WEEKLY", "weekdays": ["MONDAY", "FRIDAY"] },
            "startDate": null,
            "endDate": null,
        });

        let entity: SourceEntity = serde_json::from_value(value).unwrap();
        assert_eq!(entity.source_module(), SourceModule::Reminder);
        assert_eq!(entity.entity_id(), "r-1");
        match entity {
            SourceEntity::Reminder(reminder) => {
                assert_eq!(reminder.trigger, Some(ReminderTrigger::Interval { minutes: 20 }));
                assert_eq!(
                    reminder.recurrence.unwrap().weekdays(),
                    &[DayOfWeek::Monday, DayOfWeek::Friday]
                );
            }
            other => panic!("unexpected entity: {other:?}"),
        }
    }
}
