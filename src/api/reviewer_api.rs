// ==========================================
// 产品评审分配系统 - 评审人API
// ==========================================
// 职责: 评审人登记、专长维护、带工作量的名录查询
// 红线: 专长维护幂等;工作量统计只读,不产生任何写入
// ==========================================

use std::sync::Arc;

use chrono::Local;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{validate_expertise_input, validate_non_empty, validate_scope};
use crate::domain::{ExpertiseEntry, Reviewer, ReviewerWithWorkload};
use crate::engine::WorkloadTracker;
use crate::repository::{ProductReviewRepository, ReviewerRepository};

// ==========================================
// ReviewerApi - 评审人API
// ==========================================
pub struct ReviewerApi {
    reviewer_repo: Arc<ReviewerRepository>,
    workload: WorkloadTracker,
}

impl ReviewerApi {
    /// 创建新的 ReviewerApi 实例
    pub fn new(
        reviewer_repo: Arc<ReviewerRepository>,
        review_repo: Arc<ProductReviewRepository>,
    ) -> Self {
        Self {
            reviewer_repo,
            workload: WorkloadTracker::new(review_repo),
        }
    }

    /// 登记评审人
    ///
    /// # 参数
    /// - reviewer_id: 评审人ID (全局唯一)
    /// - display_name: 显示名
    /// - email: 通知邮箱
    ///
    /// # 返回
    /// - Ok(Reviewer): 登记完成的评审人
    /// - Err(ApiError::BusinessRuleViolation): 评审人ID已存在
    pub fn create_reviewer(
        &self,
        reviewer_id: &str,
        display_name: &str,
        email: &str,
    ) -> ApiResult<Reviewer> {
        validate_non_empty(reviewer_id, "评审人ID")?;
        validate_non_empty(display_name, "显示名")?;
        validate_non_empty(email, "邮箱")?;
        if !email.contains('@') {
            return Err(ApiError::InvalidInput(format!(
                "邮箱格式不正确: {}",
                email
            )));
        }

        if self.reviewer_repo.find_by_id(reviewer_id)?.is_some() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "评审人ID已存在: {}",
                reviewer_id
            )));
        }

        let reviewer = Reviewer {
            reviewer_id: reviewer_id.to_string(),
            display_name: display_name.trim().to_string(),
            email: email.trim().to_string(),
            created_at: Local::now().naive_local(),
        };
        self.reviewer_repo.create(&reviewer)?;

        info!(reviewer_id = %reviewer.reviewer_id, "评审人登记完成");
        Ok(reviewer)
    }

    /// 评审人名录,附带在途工作量与专长声明数
    ///
    /// 在途工作量 = 跨全部轮次的 PENDING / IN_PROGRESS 评审数
    pub fn list_reviewers(&self) -> ApiResult<Vec<ReviewerWithWorkload>> {
        let reviewers = self.reviewer_repo.list_all()?;
        if reviewers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = reviewers.iter().map(|r| r.reviewer_id.clone()).collect();
        let workloads = self.workload.workload_snapshot(&ids)?;
        let expertise_map = self.reviewer_repo.find_expertise_by_reviewers(&ids)?;

        Ok(reviewers
            .into_iter()
            .map(|reviewer| {
                let current_workload = workloads
                    .get(&reviewer.reviewer_id)
                    .copied()
                    .unwrap_or(0);
                let expertise_count = expertise_map
                    .get(&reviewer.reviewer_id)
                    .map(|entries| entries.len() as i64)
                    .unwrap_or(0);
                ReviewerWithWorkload {
                    reviewer,
                    current_workload,
                    expertise_count,
                }
            })
            .collect())
    }

    /// 新增或更新一条专长声明
    ///
    /// 同一 (范围, 键) 重复声明时覆盖优先级,不报错。
    ///
    /// # 参数
    /// - reviewer_id: 评审人ID
    /// - scope: 专长范围 (CATEGORY / COMPANY / PRODUCT,大小写不敏感)
    /// - expertise_key: 范围内的具体取值
    /// - priority: 优先级,1 最强,合法区间 [1, 10]
    pub fn add_expertise(
        &self,
        reviewer_id: &str,
        scope: &str,
        expertise_key: &str,
        priority: i32,
    ) -> ApiResult<ExpertiseEntry> {
        validate_non_empty(reviewer_id, "评审人ID")?;
        validate_non_empty(expertise_key, "专长键")?;
        let scope = validate_expertise_input(scope, priority)?;

        if self.reviewer_repo.find_by_id(reviewer_id)?.is_none() {
            return Err(ApiError::NotFound(format!(
                "评审人(id={})不存在",
                reviewer_id
            )));
        }

        let entry = ExpertiseEntry {
            reviewer_id: reviewer_id.to_string(),
            scope,
            expertise_key: expertise_key.trim().to_string(),
            priority,
        };
        self.reviewer_repo.upsert_expertise(&entry)?;

        info!(
            reviewer_id = %entry.reviewer_id,
            scope = %entry.scope.to_db_str(),
            expertise_key = %entry.expertise_key,
            priority = entry.priority,
            "专长声明已更新"
        );
        Ok(entry)
    }

    /// 删除一条专长声明,不存在时静默成功
    pub fn remove_expertise(
        &self,
        reviewer_id: &str,
        scope: &str,
        expertise_key: &str,
    ) -> ApiResult<()> {
        validate_non_empty(reviewer_id, "评审人ID")?;
        validate_non_empty(expertise_key, "专长键")?;
        let scope = validate_scope(scope)?;

        if self.reviewer_repo.find_by_id(reviewer_id)?.is_none() {
            return Err(ApiError::NotFound(format!(
                "评审人(id={})不存在",
                reviewer_id
            )));
        }

        self.reviewer_repo
            .remove_expertise(reviewer_id, scope, expertise_key.trim())?;
        Ok(())
    }

    /// 查询某评审人的全部专长声明
    pub fn list_expertise(&self, reviewer_id: &str) -> ApiResult<Vec<ExpertiseEntry>> {
        validate_non_empty(reviewer_id, "评审人ID")?;

        if self.reviewer_repo.find_by_id(reviewer_id)?.is_none() {
            return Err(ApiError::NotFound(format!(
                "评审人(id={})不存在",
                reviewer_id
            )));
        }

        Ok(self.reviewer_repo.find_expertise_by_reviewer(reviewer_id)?)
    }
}
