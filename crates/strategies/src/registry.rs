use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use schedule_domain::SourceModule;
use schedule_errors::{ScheduleError, ScheduleResult};

use crate::objective::ObjectiveScheduleStrategy;
use crate::reminder::ReminderScheduleStrategy;
use crate::strategy::{ScheduleStrategy, StrategySettings};
use crate::work_item::WorkItemScheduleStrategy;

/// 来源模块 → 调度策略 注册表
///
/// 启动时显式构造并注入（通常包在 `Arc` 中共享），构造完成后只读。
pub struct ScheduleStrategyFactory {
    strategies: HashMap<SourceModule, Arc<dyn ScheduleStrategy>>,
    settings: StrategySettings,
}

impl ScheduleStrategyFactory {
    /// 空注册表
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
            settings: StrategySettings::default(),
        }
    }

    /// 预置三种默认策略
    pub fn with_default_strategies(settings: StrategySettings) -> Self {
        let mut factory = Self {
            strategies: HashMap::new(),
            settings,
        };
        factory.register_defaults();
        factory
    }

    /// 清空并恢复默认策略
    pub fn reset(&mut self) {
        self.strategies.clear();
        self.register_defaults();
    }

    pub fn settings(&self) -> &StrategySettings {
        &self.settings
    }

    /// 注册策略，覆盖同一来源模块已有的策略并返回旧策略
    pub fn register_strategy(&mut self, strategy: Arc<dyn ScheduleStrategy>) -> Option<Arc<dyn ScheduleStrategy>> {
        let source_module = strategy.source_module();
        debug!(source_module = %source_module, strategy = strategy.name(), "注册调度策略");
        self.strategies.insert(source_module, strategy)
    }

    pub fn get_strategy(&self, source_module: SourceModule) -> ScheduleResult<Arc<dyn ScheduleStrategy>> {
        self.strategies.get(&source_module).cloned().ok_or_else(|| {
            ScheduleError::strategy_not_found(
                source_module.as_str(),
                self.registered_modules()
                    .into_iter()
                    .map(|module| module.as_str().to_string())
                    .collect(),
            )
        })
    }

    pub fn supports(&self, source_module: SourceModule) -> bool {
        self.strategies.contains_key(&source_module)
    }

    /// 已注册的来源模块（有序）
    pub fn registered_modules(&self) -> Vec<SourceModule> {
        let mut modules: Vec<SourceModule> = self.strategies.keys().copied().collect();
        modules.sort();
        modules
    }

    fn register_defaults(&mut self) {
        let settings = self.settings.clone();
        self.register_strategy(Arc::new(ObjectiveScheduleStrategy::new(settings.clone())));
        self.register_strategy(Arc::new(WorkItemScheduleStrategy::new(settings.clone())));
        self.register_strategy(Arc::new(ReminderScheduleStrategy::new(settings)));
    }
}

impl Default for ScheduleStrategyFactory {
    fn default() -> Self {
        Self::with_default_strategies(StrategySettings::default())
    }
}
