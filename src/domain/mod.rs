// ==========================================
// 产品评审分配系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod assignment_history;
pub mod product;
pub mod reviewer;
pub mod round;
pub mod types;

// 重导出核心类型
pub use assignment_history::AssignmentHistoryEntry;
pub use product::{Product, RawProductRecord};
pub use reviewer::{
    ExpertiseEntry, Reviewer, ReviewerWithWorkload, EXPERTISE_PRIORITY_MAX,
    EXPERTISE_PRIORITY_MIN,
};
pub use round::{ProductReview, ReviewRound, DEFAULT_ROUND_DEADLINE_DAYS};
pub use types::{AssignmentChangeType, ExpertiseScope, ReviewPriority, ReviewStatus};
