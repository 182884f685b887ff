//! 重要性 × 紧急程度 到任务优先级的映射

use schedule_domain::{ImportanceLevel, TaskPriority, UrgencyLevel};

/// 按优先级表自上而下匹配，未命中的组合为 LOW
pub fn priority_from_importance_urgency(importance: ImportanceLevel, urgency: UrgencyLevel) -> TaskPriority {
    use ImportanceLevel as I;
    use UrgencyLevel as U;

    match (importance, urgency) {
        (I::Vital, U::Critical | U::High) => TaskPriority::Urgent,
        (I::Important, U::Critical | U::High) | (I::Vital, U::Medium) => TaskPriority::High,
        (I::Moderate, U::High | U::Medium) | (I::Important, U::Medium | U::Low) => TaskPriority::Normal,
        _ => TaskPriority::Low,
    }
}

pub fn priority_from_importance(importance: ImportanceLevel) -> TaskPriority {
    match importance {
        ImportanceLevel::Vital => TaskPriority::Urgent,
        ImportanceLevel::Important => TaskPriority::High,
        ImportanceLevel::Moderate => TaskPriority::Normal,
        ImportanceLevel::Minor | ImportanceLevel::Trivial => TaskPriority::Low,
    }
}
