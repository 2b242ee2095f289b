// ==========================================
// 产品评审分配系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod assignment_history_repo;
pub mod error;
pub mod product_repo;
pub mod reviewer_repo;
pub mod round_repo;

// 重导出核心仓储
pub use assignment_history_repo::AssignmentHistoryRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use product_repo::ProductRepository;
pub use reviewer_repo::ReviewerRepository;
pub use round_repo::{ProductReviewRepository, ReviewRoundRepository};
