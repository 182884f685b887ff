//! 配置管理
//!
//! 调度转换核心的配置模型。加载顺序与调度系统其他组件保持一致：
//!
//! 1. 默认配置
//! 2. 配置文件（TOML格式）
//! 3. 环境变量覆盖（前缀: `SCHEDULE_`，层级分隔符: `__`）

pub mod models;

pub use models::*;
