// ==========================================
// 产品评审分配系统 - 工作量追踪器
// ==========================================
// 职责: 从评审行派生评审人工作量,只读不写
// 红线: 工作量没有独立存储,永远以 product_review 为准现算
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use crate::repository::error::RepositoryResult;
use crate::repository::ProductReviewRepository;

// ==========================================
// WorkloadTracker - 工作量追踪器
// ==========================================
pub struct WorkloadTracker {
    review_repo: Arc<ProductReviewRepository>,
}

impl WorkloadTracker {
    /// 构造函数
    ///
    /// # 参数
    /// - review_repo: 评审行仓储
    pub fn new(review_repo: Arc<ProductReviewRepository>) -> Self {
        Self { review_repo }
    }

    /// 某评审人的当前工作量 (PENDING / IN_PROGRESS 的评审行数)
    ///
    /// # 参数
    /// - reviewer_id: 评审人ID
    /// - round_id: 指定时只统计该轮次,不指定时跨全部轮次
    pub fn current_workload(
        &self,
        reviewer_id: &str,
        round_id: Option<&str>,
    ) -> RepositoryResult<i64> {
        match round_id {
            Some(round_id) => self
                .review_repo
                .count_open_by_reviewer_in_round(reviewer_id, round_id),
            None => self.review_repo.count_open_by_reviewer(reviewer_id),
        }
    }

    /// 一组评审人的跨轮次工作量快照,供分配预览用
    ///
    /// # 返回
    /// - `HashMap<reviewer_id, 未完结数>`,键集合与入参一致
    pub fn workload_snapshot(
        &self,
        reviewer_ids: &[String],
    ) -> RepositoryResult<HashMap<String, i64>> {
        self.review_repo.count_open_by_reviewers(reviewer_ids)
    }
}
