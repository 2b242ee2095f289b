// ==========================================
// 产品评审分配系统 - 轮次API
// ==========================================
// 职责: 轮次名录/详情、审计查询、评审状态流转、CSV导出
// 红线: 本层不改动分配关系;状态流转必须过状态机校验
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::validate_non_empty;
use crate::domain::{
    AssignmentHistoryEntry, Product, ProductReview, ReviewRound, ReviewStatus, Reviewer,
};
use crate::i18n::t_with_args;
use crate::repository::{
    AssignmentHistoryRepository, ProductRepository, ProductReviewRepository,
    ReviewRoundRepository, ReviewerRepository,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// 导出表头,列序固定
const EXPORT_HEADER: [&str; 13] = [
    "Round Name",
    "Round Number",
    "Product ID",
    "Product Name",
    "Category",
    "Company",
    "Reviewer Name",
    "Reviewer Email",
    "Match Score",
    "Status",
    "Priority",
    "Assigned Date",
    "Deadline",
];

// ==========================================
// DTO 类型定义
// ==========================================

/// 轮次名录行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round_id: String,
    pub round_name: String,
    pub round_no: i32,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub deadline: NaiveDate,
    pub review_count: i64,
}

/// 轮次详情
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundDetailResponse {
    pub round: ReviewRound,
    /// 轮内评审行,按 product_id 升序
    pub reviews: Vec<ProductReview>,
    /// 轮内各评审人当前持有的评审数
    pub per_reviewer_counts: HashMap<String, i64>,
}

// ==========================================
// RoundApi - 轮次API
// ==========================================
pub struct RoundApi {
    round_repo: Arc<ReviewRoundRepository>,
    review_repo: Arc<ProductReviewRepository>,
    history_repo: Arc<AssignmentHistoryRepository>,
    product_repo: Arc<ProductRepository>,
    reviewer_repo: Arc<ReviewerRepository>,
}

impl RoundApi {
    /// 创建新的 RoundApi 实例
    pub fn new(
        round_repo: Arc<ReviewRoundRepository>,
        review_repo: Arc<ProductReviewRepository>,
        history_repo: Arc<AssignmentHistoryRepository>,
        product_repo: Arc<ProductRepository>,
        reviewer_repo: Arc<ReviewerRepository>,
    ) -> Self {
        Self {
            round_repo,
            review_repo,
            history_repo,
            product_repo,
            reviewer_repo,
        }
    }

    /// 轮次名录,最新轮次在前
    pub fn list_rounds(&self) -> ApiResult<Vec<RoundSummary>> {
        let rounds = self.round_repo.list_all()?;

        let mut summaries = Vec::with_capacity(rounds.len());
        for round in rounds {
            let review_count = self.review_repo.count_by_round(&round.round_id)?;
            summaries.push(RoundSummary {
                round_id: round.round_id,
                round_name: round.round_name,
                round_no: round.round_no,
                created_by: round.created_by,
                created_at: round.created_at,
                deadline: round.deadline,
                review_count,
            });
        }
        Ok(summaries)
    }

    /// 轮次详情: 轮次 + 全部评审行 + 按评审人的持有计数
    pub fn round_detail(&self, round_id: &str) -> ApiResult<RoundDetailResponse> {
        validate_non_empty(round_id, "轮次ID")?;
        let round = self.load_round(round_id)?;

        let reviews = self.review_repo.find_by_round(round_id)?;
        let per_reviewer_counts = self.review_repo.count_assigned_by_round(round_id)?;

        Ok(RoundDetailResponse {
            round,
            reviews,
            per_reviewer_counts,
        })
    }

    /// 某轮次中尚未分配的评审行 (取消分配后回到池子的产品)
    pub fn list_unassigned_products(&self, round_id: &str) -> ApiResult<Vec<ProductReview>> {
        validate_non_empty(round_id, "轮次ID")?;
        self.load_round(round_id)?;

        let reviews = self.review_repo.find_by_round(round_id)?;
        Ok(reviews.into_iter().filter(|r| !r.is_assigned()).collect())
    }

    /// 某轮次的完整审计流水,时间升序
    pub fn history_for_round(&self, round_id: &str) -> ApiResult<Vec<AssignmentHistoryEntry>> {
        validate_non_empty(round_id, "轮次ID")?;
        self.load_round(round_id)?;
        Ok(self.history_repo.history_for_round(round_id)?)
    }

    /// 某轮次中某产品的审计流水,时间升序
    pub fn history_for_product(
        &self,
        round_id: &str,
        product_id: &str,
    ) -> ApiResult<Vec<AssignmentHistoryEntry>> {
        validate_non_empty(round_id, "轮次ID")?;
        validate_non_empty(product_id, "产品ID")?;

        if self.review_repo.find_by_key(round_id, product_id)?.is_none() {
            return Err(ApiError::NotFound(format!(
                "评审行不存在: {}/{}",
                round_id, product_id
            )));
        }
        Ok(self.history_repo.history_for_product(round_id, product_id)?)
    }

    /// 推进评审状态
    ///
    /// 合法流转: PENDING → IN_PROGRESS → COMPLETED → APPROVED / REJECTED。
    /// 状态流转不触碰分配关系,因此不写审计流水,仅记录结构化日志。
    ///
    /// # 参数
    /// - new_status: 目标状态 (大小写不敏感)
    /// - actor: 操作人
    #[instrument(skip(self))]
    pub fn update_review_status(
        &self,
        round_id: &str,
        product_id: &str,
        new_status: &str,
        actor: &str,
    ) -> ApiResult<()> {
        validate_non_empty(round_id, "轮次ID")?;
        validate_non_empty(product_id, "产品ID")?;
        validate_non_empty(actor, "操作人")?;
        let target = Self::parse_status(new_status)?;

        self.review_repo
            .update_status(round_id, product_id, target, Local::now().naive_local())?;

        info!(
            round_id = %round_id,
            product_id = %product_id,
            new_status = %target,
            actor = %actor,
            "评审状态已更新"
        );
        Ok(())
    }

    /// 导出某轮次的分配结果为 CSV 文本
    ///
    /// 列序固定;未分配的评审行保留空白的评审人列。
    /// 产品已被目录覆盖删除时,产品信息列为空白。
    pub fn export_round_csv(&self, round_id: &str) -> ApiResult<String> {
        validate_non_empty(round_id, "轮次ID")?;
        let round = self.round_repo.find_by_id(round_id)?.ok_or_else(|| {
            ApiError::NotFound(t_with_args(
                "export.round_not_found",
                &[("round_id", round_id)],
            ))
        })?;

        let reviews = self.review_repo.find_by_round(round_id)?;

        let product_ids: Vec<String> = reviews.iter().map(|r| r.product_id.clone()).collect();
        let products: HashMap<String, Product> = self
            .product_repo
            .find_by_ids(&product_ids)?
            .into_iter()
            .map(|p| (p.product_id.clone(), p))
            .collect();

        let reviewer_ids: Vec<String> = {
            let mut ids: Vec<String> = reviews
                .iter()
                .filter_map(|r| r.assigned_to.clone())
                .collect();
            ids.sort();
            ids.dedup();
            ids
        };
        let reviewers: HashMap<String, Reviewer> = self
            .reviewer_repo
            .find_by_ids(&reviewer_ids)?
            .into_iter()
            .map(|r| (r.reviewer_id.clone(), r))
            .collect();

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(EXPORT_HEADER)
            .map_err(|e| ApiError::ExportError(e.to_string()))?;

        for review in &reviews {
            let product = products.get(&review.product_id);
            let reviewer = review
                .assigned_to
                .as_ref()
                .and_then(|id| reviewers.get(id));

            let row = [
                round.round_name.clone(),
                round.round_no.to_string(),
                review.product_id.clone(),
                product.map(|p| p.name.clone()).unwrap_or_default(),
                product.map(|p| p.category.clone()).unwrap_or_default(),
                product.map(|p| p.company.clone()).unwrap_or_default(),
                reviewer.map(|r| r.display_name.clone()).unwrap_or_default(),
                reviewer.map(|r| r.email.clone()).unwrap_or_default(),
                review
                    .match_score
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
                review.status.to_string(),
                review.priority.to_string(),
                review
                    .assigned_at
                    .map(|t| t.format(DATE_FORMAT).to_string())
                    .unwrap_or_default(),
                review.effective_deadline(&round).format(DATE_FORMAT).to_string(),
            ];
            writer
                .write_record(&row)
                .map_err(|e| ApiError::ExportError(e.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ApiError::ExportError(e.to_string()))?;
        let csv_text =
            String::from_utf8(bytes).map_err(|e| ApiError::ExportError(e.to_string()))?;

        info!(round_id = %round_id, rows = reviews.len(), "轮次分配导出完成");
        Ok(csv_text)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn load_round(&self, round_id: &str) -> ApiResult<ReviewRound> {
        self.round_repo.find_by_id(round_id)?.ok_or_else(|| {
            ApiError::NotFound(format!("评审轮次(id={})不存在", round_id))
        })
    }

    /// 严格解析评审状态,未知取值直接拒绝
    fn parse_status(value: &str) -> ApiResult<ReviewStatus> {
        let normalized = value.trim().to_uppercase();
        let parsed = ReviewStatus::from_str(&normalized);
        if parsed.to_db_str() != normalized {
            return Err(ApiError::ValidationError(format!(
                "未知的评审状态: {}",
                value
            )));
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssignmentChangeType, ReviewPriority};
    use rusqlite::Connection;
    use std::sync::Mutex;

    struct TestContext {
        api: RoundApi,
        round_repo: Arc<ReviewRoundRepository>,
        product_repo: Arc<ProductRepository>,
        reviewer_repo: Arc<ReviewerRepository>,
    }

    fn setup() -> TestContext {
        let conn = Connection::open_in_memory().expect("打开内存库失败");
        crate::db::configure_sqlite_connection(&conn).expect("配置失败");
        crate::db::ensure_schema(&conn).expect("建表失败");
        let conn = Arc::new(Mutex::new(conn));

        let round_repo = Arc::new(ReviewRoundRepository::new(conn.clone()));
        let review_repo = Arc::new(ProductReviewRepository::new(conn.clone()));
        let history_repo = Arc::new(AssignmentHistoryRepository::new(conn.clone()));
        let product_repo = Arc::new(ProductRepository::new(conn.clone()));
        let reviewer_repo = Arc::new(ReviewerRepository::new(conn.clone()));

        let api = RoundApi::new(
            round_repo.clone(),
            review_repo,
            history_repo,
            product_repo.clone(),
            reviewer_repo.clone(),
        );
        TestContext {
            api,
            round_repo,
            product_repo,
            reviewer_repo,
        }
    }

    fn ts() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2026-03-01 09:00:00", "%Y-%m-%d %H:%M:%S")
            .expect("时间解析失败")
    }

    fn deadline() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).expect("日期解析失败")
    }

    /// 直接通过仓储落一轮数据: (product_id, 持有人) 列表,持有人为 None 表示未分配行
    fn seed_round(ctx: &TestContext, name: &str, rows: &[(&str, Option<&str>)]) -> String {
        let mut round = ReviewRound {
            round_id: uuid::Uuid::new_v4().to_string(),
            round_name: name.to_string(),
            round_no: 0,
            created_by: "admin".to_string(),
            created_at: ts(),
            deadline: deadline(),
        };

        let reviews: Vec<ProductReview> = rows
            .iter()
            .map(|(product_id, assignee)| ProductReview {
                round_id: round.round_id.clone(),
                product_id: product_id.to_string(),
                assigned_to: assignee.map(|s| s.to_string()),
                match_score: assignee.map(|_| 2),
                assigned_at: assignee.map(|_| ts()),
                status: ReviewStatus::Pending,
                priority: ReviewPriority::Medium,
                deadline: None,
                updated_at: ts(),
            })
            .collect();

        let entries: Vec<AssignmentHistoryEntry> = rows
            .iter()
            .filter_map(|(product_id, assignee)| {
                assignee.map(|reviewer| {
                    AssignmentHistoryEntry::new(
                        &round.round_id,
                        product_id,
                        AssignmentChangeType::Initial,
                        None,
                        Some(reviewer.to_string()),
                        "admin",
                    )
                })
            })
            .collect();

        ctx.round_repo
            .commit_round(&mut round, &reviews, &entries)
            .expect("落库失败")
    }

    #[test]
    fn test_list_rounds_newest_first_with_counts() {
        let ctx = setup();
        seed_round(&ctx, "第一轮", &[("P-1", Some("rev-a")), ("P-2", Some("rev-a"))]);
        seed_round(
            &ctx,
            "第二轮",
            &[("P-1", Some("rev-a")), ("P-2", Some("rev-b")), ("P-3", None)],
        );

        let rounds = ctx.api.list_rounds().expect("查询名录失败");
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].round_no, 2);
        assert_eq!(rounds[0].round_name, "第二轮");
        assert_eq!(rounds[0].review_count, 3);
        assert_eq!(rounds[1].round_no, 1);
        assert_eq!(rounds[1].review_count, 2);
    }

    #[test]
    fn test_round_detail_and_unassigned_listing() {
        let ctx = setup();
        let round_id = seed_round(
            &ctx,
            "3月评审",
            &[
                ("P-1", Some("rev-a")),
                ("P-2", Some("rev-a")),
                ("P-3", Some("rev-b")),
                ("P-4", None),
            ],
        );

        let detail = ctx.api.round_detail(&round_id).expect("查询详情失败");
        assert_eq!(detail.round.round_name, "3月评审");
        assert_eq!(detail.reviews.len(), 4);
        assert_eq!(detail.per_reviewer_counts.get("rev-a"), Some(&2));
        assert_eq!(detail.per_reviewer_counts.get("rev-b"), Some(&1));

        let unassigned = ctx
            .api
            .list_unassigned_products(&round_id)
            .expect("查询未分配失败");
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].product_id, "P-4");

        let err = ctx.api.round_detail("round-404").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_update_review_status_enforces_state_machine() {
        let ctx = setup();
        let round_id = seed_round(&ctx, "状态轮", &[("P-1", Some("rev-a"))]);

        ctx.api
            .update_review_status(&round_id, "P-1", "in_progress", "admin")
            .expect("待评审到评审中应合法");
        ctx.api
            .update_review_status(&round_id, "P-1", "COMPLETED", "admin")
            .expect("评审中到已完成应合法");
        ctx.api
            .update_review_status(&round_id, "P-1", "APPROVED", "admin")
            .expect("已完成到通过应合法");

        // 终态不可再流转
        let err = ctx
            .api
            .update_review_status(&round_id, "P-1", "IN_PROGRESS", "admin")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));

        // 未知状态直接拒绝
        let err = ctx
            .api
            .update_review_status(&round_id, "P-1", "SHIPPED", "admin")
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[test]
    fn test_history_queries_validate_existence() {
        let ctx = setup();
        let round_id = seed_round(&ctx, "审计轮", &[("P-1", Some("rev-a")), ("P-2", Some("rev-b"))]);

        let entries = ctx.api.history_for_round(&round_id).expect("查询审计失败");
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|e| e.change_type == AssignmentChangeType::Initial));

        let p1 = ctx
            .api
            .history_for_product(&round_id, "P-1")
            .expect("查询审计失败");
        assert_eq!(p1.len(), 1);
        assert_eq!(p1[0].new_assignee.as_deref(), Some("rev-a"));

        assert!(matches!(
            ctx.api.history_for_round("round-404").unwrap_err(),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ctx.api.history_for_product(&round_id, "P-404").unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[test]
    fn test_export_round_csv_fixed_columns() {
        let ctx = setup();
        ctx.product_repo
            .upsert(&Product {
                product_id: "P-1".to_string(),
                name: "智能手表".to_string(),
                category: "可穿戴".to_string(),
                company: "华米科技".to_string(),
            })
            .expect("写入产品失败");
        ctx.reviewer_repo
            .create(&Reviewer {
                reviewer_id: "rev-a".to_string(),
                display_name: "张三".to_string(),
                email: "zhang@example.com".to_string(),
                created_at: ts(),
            })
            .expect("写入评审人失败");

        let round_id = seed_round(
            &ctx,
            "导出轮",
            &[("P-1", Some("rev-a")), ("P-2", None)],
        );

        let csv_text = ctx.api.export_round_csv(&round_id).expect("导出失败");
        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        assert_eq!(
            reader.headers().expect("缺少表头").iter().collect::<Vec<_>>(),
            EXPORT_HEADER.to_vec()
        );

        let records: Vec<csv::StringRecord> = reader
            .records()
            .collect::<Result<_, _>>()
            .expect("解析导出内容失败");
        assert_eq!(records.len(), 2);

        let assigned = records
            .iter()
            .find(|r| &r[2] == "P-1")
            .expect("缺少 P-1 行");
        assert_eq!(&assigned[0], "导出轮");
        assert_eq!(&assigned[3], "智能手表");
        assert_eq!(&assigned[4], "可穿戴");
        assert_eq!(&assigned[5], "华米科技");
        assert_eq!(&assigned[6], "张三");
        assert_eq!(&assigned[7], "zhang@example.com");
        assert_eq!(&assigned[8], "2");
        assert_eq!(&assigned[9], "PENDING");
        assert_eq!(&assigned[10], "MEDIUM");
        assert_eq!(&assigned[11], "2026-03-01");
        assert_eq!(&assigned[12], "2026-03-15");

        // 未分配行: 评审人列与匹配分、分配日期为空;目录缺失的产品信息列为空
        let unassigned = records
            .iter()
            .find(|r| &r[2] == "P-2")
            .expect("缺少 P-2 行");
        assert_eq!(&unassigned[3], "");
        assert_eq!(&unassigned[6], "");
        assert_eq!(&unassigned[7], "");
        assert_eq!(&unassigned[8], "");
        assert_eq!(&unassigned[11], "");
        assert_eq!(&unassigned[12], "2026-03-15");
    }

    #[test]
    fn test_export_missing_round_reports_not_found() {
        let ctx = setup();
        let err = ctx.api.export_round_csv("round-404").unwrap_err();
        match err {
            ApiError::NotFound(msg) => assert!(msg.contains("round-404")),
            other => panic!("期望 NotFound,实际 {:?}", other),
        }
    }
}
