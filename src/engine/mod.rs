// ==========================================
// 产品评审分配系统 - 引擎层
// ==========================================
// 职责: 专长匹配/工作量均衡/分配预览/通知/目录导入的业务规则
// 红线: Engine 不拼 SQL,匹配与分配结果必须可解释
// ==========================================

pub mod affinity;
pub mod assign;
pub mod importer;
pub mod notifier;
pub mod workload;

// 重导出核心引擎
pub use affinity::{AffinityScore, AffinityScorer};
pub use assign::{
    AssignmentEngine, AssignmentPreview, EstimatedRange, PreviewAssignment, ReviewerSnapshot,
};
pub use importer::{CatalogImporter, ImportError, ImportRowFailure, ImportSummary};
pub use notifier::{
    AssignmentNotice, AssignmentNotifier, LogNotifier, NoOpNotifier, OptionalNotifier,
};
pub use workload::WorkloadTracker;
