// ==========================================
// 产品评审分配系统 - 配置层
// ==========================================
// 职责: 全局配置的读取与默认值回落
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
