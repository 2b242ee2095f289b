// ==========================================
// 产品评审分配系统 - 分配API
// ==========================================
// 职责: 分配预览、轮次提交、改派、取消分配
// 红线: 提交必须单事务落库;通知失败只记日志,不影响提交结果
// ==========================================

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{validate_id_entries, validate_non_empty};
use crate::config::ConfigManager;
use crate::domain::{
    AssignmentChangeType, AssignmentHistoryEntry, Product, ProductReview, ReviewPriority,
    ReviewRound, ReviewStatus, Reviewer,
};
use crate::engine::{
    AffinityScorer, AssignmentEngine, AssignmentNotice, AssignmentPreview, OptionalNotifier,
    ReviewerSnapshot, WorkloadTracker,
};
use crate::repository::{
    ProductRepository, ProductReviewRepository, ReviewRoundRepository, ReviewerRepository,
};

// ==========================================
// DTO 类型定义
// ==========================================

/// 轮次提交结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRoundResponse {
    pub round_id: String,
    pub round_no: i32,
    /// 本轮落库的评审行数
    pub review_count: usize,
    /// 成功送达分配通知的评审人数 (通知未配置或被禁用时为 0)
    pub notified_reviewers: usize,
}

// ==========================================
// AssignmentApi - 分配API
// ==========================================
pub struct AssignmentApi {
    product_repo: Arc<ProductRepository>,
    reviewer_repo: Arc<ReviewerRepository>,
    review_repo: Arc<ProductReviewRepository>,
    round_repo: Arc<ReviewRoundRepository>,
    config_manager: Arc<ConfigManager>,
    engine: AssignmentEngine,
    scorer: AffinityScorer,
    workload: WorkloadTracker,
    notifier: OptionalNotifier,
}

impl AssignmentApi {
    /// 创建新的 AssignmentApi 实例
    pub fn new(
        product_repo: Arc<ProductRepository>,
        reviewer_repo: Arc<ReviewerRepository>,
        review_repo: Arc<ProductReviewRepository>,
        round_repo: Arc<ReviewRoundRepository>,
        config_manager: Arc<ConfigManager>,
        notifier: OptionalNotifier,
    ) -> Self {
        let workload = WorkloadTracker::new(review_repo.clone());
        Self {
            product_repo,
            reviewer_repo,
            review_repo,
            round_repo,
            config_manager,
            engine: AssignmentEngine::new(),
            scorer: AffinityScorer::new(),
            workload,
            notifier,
        }
    }

    /// 计算分配预览
    ///
    /// 只读操作,可反复试算。预览不落库,提交与否由调用方决定。
    ///
    /// # 参数
    /// - product_ids: 待分配产品ID列表 (可为空,返回空预览)
    /// - reviewer_ids: 参与本轮的评审人ID列表 (不可为空)
    ///
    /// # 返回
    /// - Ok(AssignmentPreview): 分配预览
    /// - Err(ApiError::InvalidInput): 评审人列表为空
    /// - Err(ApiError::NotFound): 产品或评审人不存在
    pub fn preview_assignments(
        &self,
        product_ids: &[String],
        reviewer_ids: &[String],
    ) -> ApiResult<AssignmentPreview> {
        if reviewer_ids.is_empty() {
            return Err(ApiError::InvalidInput(
                "请至少选择一名评审人".to_string(),
            ));
        }
        validate_id_entries(reviewer_ids, "评审人")?;
        validate_id_entries(product_ids, "产品")?;

        let products = self.load_products(product_ids)?;
        let reviewers = self.load_reviewers(reviewer_ids)?;

        let mut expertise_map = self.reviewer_repo.find_expertise_by_reviewers(reviewer_ids)?;
        let workloads = self.workload.workload_snapshot(reviewer_ids)?;

        let snapshots: Vec<ReviewerSnapshot> = reviewers
            .iter()
            .map(|r| ReviewerSnapshot {
                reviewer_id: r.reviewer_id.clone(),
                current_workload: workloads.get(&r.reviewer_id).copied().unwrap_or(0),
                expertise: expertise_map.remove(&r.reviewer_id).unwrap_or_default(),
            })
            .collect();

        Ok(self.engine.compute_preview(&products, &snapshots))
    }

    /// 提交分配预览,创建评审轮次
    ///
    /// 轮次、评审行、初始审计记录在同一事务内落库,轮次编号由
    /// 仓储在事务内分配。落库成功后向各评审人发送分配通知,
    /// 通知失败只记日志。
    ///
    /// # 参数
    /// - preview: 待提交的分配预览
    /// - round_name: 轮次名称
    /// - deadline: 轮次截止日,缺省时按配置的默认天数顺延
    /// - actor: 操作人
    ///
    /// # 返回
    /// - Ok(CommitRoundResponse): 提交结果
    #[instrument(skip(self, preview, deadline))]
    pub async fn commit_assignments(
        &self,
        preview: &AssignmentPreview,
        round_name: &str,
        deadline: Option<NaiveDate>,
        actor: &str,
    ) -> ApiResult<CommitRoundResponse> {
        validate_non_empty(round_name, "轮次名称")?;
        validate_non_empty(actor, "操作人")?;
        if preview.assignments.is_empty() {
            return Err(ApiError::ValidationError(
                "预览结果为空,没有可提交的分配".to_string(),
            ));
        }

        let product_ids: Vec<String> = preview
            .assignments
            .iter()
            .map(|a| a.product_id.clone())
            .collect();
        let reviewer_ids: Vec<String> = preview
            .assignments
            .iter()
            .map(|a| a.reviewer_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        // 预览可能已过期,提交前重新核对目录与评审人
        let products = self.load_products(&product_ids)?;
        let reviewers = self.load_reviewers(&reviewer_ids)?;

        let deadline_days = self
            .config_manager
            .get_default_deadline_days()
            .map_err(|e| ApiError::InternalError(format!("读取配置失败: {}", e)))?;

        let created_at = Local::now().naive_local();
        let mut round = ReviewRound {
            round_id: Uuid::new_v4().to_string(),
            round_name: round_name.to_string(),
            round_no: 0,
            created_by: actor.to_string(),
            created_at,
            deadline: deadline
                .unwrap_or_else(|| ReviewRound::default_deadline(created_at, deadline_days)),
        };

        let mut reviews = Vec::with_capacity(preview.assignments.len());
        let mut entries = Vec::with_capacity(preview.assignments.len());
        for assignment in &preview.assignments {
            reviews.push(ProductReview {
                round_id: round.round_id.clone(),
                product_id: assignment.product_id.clone(),
                assigned_to: Some(assignment.reviewer_id.clone()),
                match_score: Some(assignment.score.as_match_score()),
                assigned_at: Some(created_at),
                status: ReviewStatus::Pending,
                priority: ReviewPriority::Medium,
                deadline: None,
                updated_at: created_at,
            });

            let reason = self.match_reason_payload(&assignment.score);
            entries.push(
                AssignmentHistoryEntry::new(
                    &round.round_id,
                    &assignment.product_id,
                    AssignmentChangeType::Initial,
                    None,
                    Some(assignment.reviewer_id.clone()),
                    actor,
                )
                .with_payload(&reason),
            );
        }

        let round_id = self.round_repo.commit_round(&mut round, &reviews, &entries)?;
        info!(
            round_id = %round_id,
            round_no = round.round_no,
            review_count = reviews.len(),
            reviewer_count = reviewers.len(),
            "评审轮次提交完成"
        );

        let notified = self
            .send_assignment_notices(&round, preview, &products, &reviewers)
            .await;

        Ok(CommitRoundResponse {
            round_id,
            round_no: round.round_no,
            review_count: reviews.len(),
            notified_reviewers: notified,
        })
    }

    /// 改派: 把一条评审行移交给新评审人
    ///
    /// 评审状态保持不变,按新评审人的专长重算匹配分,
    /// 并追加一条 REASSIGNED 审计记录。改派给当前负责人时
    /// 视为无事发生,直接返回成功且不产生审计记录。
    ///
    /// # 参数
    /// - round_id / product_id: 评审行主键
    /// - new_reviewer_id: 新评审人
    /// - actor: 操作人
    /// - reason: 变更原因 (可选)
    #[instrument(skip(self, reason))]
    pub fn reassign_product(
        &self,
        round_id: &str,
        product_id: &str,
        new_reviewer_id: &str,
        actor: &str,
        reason: Option<String>,
    ) -> ApiResult<()> {
        validate_non_empty(round_id, "轮次ID")?;
        validate_non_empty(product_id, "产品ID")?;
        validate_non_empty(new_reviewer_id, "评审人ID")?;
        validate_non_empty(actor, "操作人")?;

        let review = self
            .review_repo
            .find_by_key(round_id, product_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("评审行不存在: {}/{}", round_id, product_id))
            })?;
        if review.status.is_terminal() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "评审已处于终态({}),不允许改派",
                review.status
            )));
        }

        let reviewer = self
            .reviewer_repo
            .find_by_id(new_reviewer_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("评审人(id={})不存在", new_reviewer_id))
            })?;

        if review.assigned_to.as_deref() == Some(new_reviewer_id) {
            debug!(
                round_id = %round_id,
                product_id = %product_id,
                reviewer_id = %new_reviewer_id,
                "改派目标与当前负责人相同,跳过"
            );
            return Ok(());
        }

        // 按新评审人的专长重算匹配分;产品已不在目录时匹配分置空
        let expertise = self.reviewer_repo.find_expertise_by_reviewer(new_reviewer_id)?;
        let score = self
            .product_repo
            .find_by_id(product_id)?
            .map(|product| self.scorer.score(&expertise, &product));

        let mut entry = AssignmentHistoryEntry::new(
            round_id,
            product_id,
            AssignmentChangeType::Reassigned,
            review.assigned_to.clone(),
            Some(new_reviewer_id.to_string()),
            actor,
        )
        .with_reason(reason);
        if let Some(s) = &score {
            entry = entry.with_payload(&self.match_reason_payload(s));
        }

        self.review_repo.apply_assignment_change(
            &entry,
            review.status,
            score.map(|s| s.as_match_score()),
        )?;

        info!(
            round_id = %round_id,
            product_id = %product_id,
            previous = ?review.assigned_to,
            new_reviewer = %reviewer.reviewer_id,
            "评审改派完成"
        );
        Ok(())
    }

    /// 取消分配: 评审行回到未分配待评审状态
    ///
    /// assigned_to 置空、状态回到 PENDING,并追加一条 REMOVED
    /// 审计记录。评审行本就未分配时为幂等空操作,不产生审计记录。
    #[instrument(skip(self, reason))]
    pub fn unassign_product(
        &self,
        round_id: &str,
        product_id: &str,
        actor: &str,
        reason: Option<String>,
    ) -> ApiResult<()> {
        validate_non_empty(round_id, "轮次ID")?;
        validate_non_empty(product_id, "产品ID")?;
        validate_non_empty(actor, "操作人")?;

        let review = self
            .review_repo
            .find_by_key(round_id, product_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("评审行不存在: {}/{}", round_id, product_id))
            })?;
        if review.status.is_terminal() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "评审已处于终态({}),不允许取消分配",
                review.status
            )));
        }

        let previous = match review.assigned_to.clone() {
            Some(previous) => previous,
            None => {
                debug!(
                    round_id = %round_id,
                    product_id = %product_id,
                    "评审行已处于未分配状态,跳过"
                );
                return Ok(());
            }
        };

        let entry = AssignmentHistoryEntry::new(
            round_id,
            product_id,
            AssignmentChangeType::Removed,
            Some(previous.clone()),
            None,
            actor,
        )
        .with_reason(reason);

        self.review_repo
            .apply_assignment_change(&entry, ReviewStatus::Pending, None)?;

        info!(
            round_id = %round_id,
            product_id = %product_id,
            previous = %previous,
            "取消分配完成"
        );
        Ok(())
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 批量加载产品,任意ID缺失即报 NotFound
    fn load_products(&self, product_ids: &[String]) -> ApiResult<Vec<Product>> {
        let products = self.product_repo.find_by_ids(product_ids)?;
        if products.len() != product_ids.len() {
            let found: HashSet<&str> = products.iter().map(|p| p.product_id.as_str()).collect();
            let missing: Vec<&str> = product_ids
                .iter()
                .map(|id| id.as_str())
                .filter(|id| !found.contains(id))
                .collect();
            return Err(ApiError::NotFound(format!(
                "产品不存在: {}",
                missing.join(", ")
            )));
        }
        Ok(products)
    }

    /// 批量加载评审人,任意ID缺失即报 NotFound
    fn load_reviewers(&self, reviewer_ids: &[String]) -> ApiResult<Vec<Reviewer>> {
        let reviewers = self.reviewer_repo.find_by_ids(reviewer_ids)?;
        if reviewers.len() != reviewer_ids.len() {
            let found: HashSet<&str> = reviewers.iter().map(|r| r.reviewer_id.as_str()).collect();
            let missing: Vec<&str> = reviewer_ids
                .iter()
                .map(|id| id.as_str())
                .filter(|id| !found.contains(id))
                .collect();
            return Err(ApiError::NotFound(format!(
                "评审人不存在: {}",
                missing.join(", ")
            )));
        }
        Ok(reviewers)
    }

    /// 匹配原因的结构化快照,随审计记录落库
    fn match_reason_payload(&self, score: &crate::engine::AffinityScore) -> JsonValue {
        serde_json::from_str(&self.scorer.generate_match_reason(score))
            .unwrap_or(JsonValue::Null)
    }

    /// 提交成功后的通知扇出,返回成功送达的评审人数
    ///
    /// 任何失败 (含配置读取失败) 都不会向调用方传播。
    async fn send_assignment_notices(
        &self,
        round: &ReviewRound,
        preview: &AssignmentPreview,
        products: &[Product],
        reviewers: &[Reviewer],
    ) -> usize {
        if !self.notifier.is_configured() {
            return 0;
        }
        match self.config_manager.get_notify_enabled() {
            Ok(true) => {}
            Ok(false) => {
                debug!(round_id = %round.round_id, "分配通知已被配置禁用,跳过");
                return 0;
            }
            Err(e) => warn!("读取通知开关失败,按开启处理: {}", e),
        }

        let product_names: HashMap<&str, &str> = products
            .iter()
            .map(|p| (p.product_id.as_str(), p.name.as_str()))
            .collect();
        let mut grouped: HashMap<&str, Vec<String>> = HashMap::new();
        for assignment in &preview.assignments {
            let name = product_names
                .get(assignment.product_id.as_str())
                .copied()
                .unwrap_or(assignment.product_id.as_str());
            grouped
                .entry(assignment.reviewer_id.as_str())
                .or_default()
                .push(name.to_string());
        }

        let notices: Vec<AssignmentNotice> = reviewers
            .iter()
            .filter_map(|r| {
                grouped.get(r.reviewer_id.as_str()).map(|names| AssignmentNotice {
                    reviewer_id: r.reviewer_id.clone(),
                    reviewer_email: r.email.clone(),
                    round_name: round.round_name.clone(),
                    product_names: names.clone(),
                    deadline: Some(round.deadline),
                })
            })
            .collect();

        let results = join_all(notices.iter().map(|n| self.notifier.notify(n))).await;

        let mut sent = 0;
        for (notice, result) in notices.iter().zip(results) {
            match result {
                Ok(()) => sent += 1,
                Err(e) => warn!(
                    reviewer_id = %notice.reviewer_id,
                    round_id = %round.round_id,
                    "分配通知发送失败: {}",
                    e
                ),
            }
        }
        sent
    }
}
