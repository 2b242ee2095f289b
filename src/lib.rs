// ==========================================
// 产品评审分配系统 - 核心库
// ==========================================
// 技术栈: Tauri + Rust + SQLite
// 系统定位: 评审任务分配的决策支持系统 (人工最终控制权)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/幂等建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// SQL 性能跟踪
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - Tauri 集成
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AssignmentChangeType, ExpertiseScope, ReviewPriority, ReviewStatus};

// 领域实体
pub use domain::{
    AssignmentHistoryEntry, ExpertiseEntry, Product, ProductReview, ReviewRound, Reviewer,
};

// 引擎
pub use engine::{
    AffinityScorer, AssignmentEngine, AssignmentPreview, CatalogImporter, WorkloadTracker,
};

// API
pub use api::{AssignmentApi, CatalogApi, ConfigApi, ReviewerApi, RoundApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "产品评审分配系统";

// ==========================================
// 预编译检查
// ==========================================
