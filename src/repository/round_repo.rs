// ==========================================
// 评审轮次仓储模块
// ==========================================
// 职责: review_round / product_review 两张表的持久化
// 红线: 轮次提交与分配变更必须与审计记录同事务落库
// ==========================================

mod review;
mod round;


pub use review::ProductReviewRepository;
pub use round::ReviewRoundRepository;
