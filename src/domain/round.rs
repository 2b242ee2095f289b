// ==========================================
// 产品评审分配系统 - 评审轮次领域模型
// ==========================================
// 职责: 评审轮次与产品评审行实体
// 红线: assigned_to 只允许 commit/reassign/unassign 三条写路径修改
// ==========================================

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::{ReviewPriority, ReviewStatus};

/// 轮次截止日期缺省天数（创建日 + 14 天,可被配置覆盖）
pub const DEFAULT_ROUND_DEADLINE_DAYS: i64 = 14;

// ==========================================
// ReviewRound - 评审轮次
// ==========================================
// 一次性创建的一批产品评审,共享截止日期
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRound {
    pub round_id: String,          // 轮次ID
    pub round_name: String,        // 轮次名称
    pub round_no: i32,             // 轮次号 (单调递增)
    pub created_by: String,        // 创建人 (管理员ID)
    pub created_at: NaiveDateTime, // 创建时间
    pub deadline: NaiveDate,       // 截止日期 (缺省 = 创建日 + 14 天)
}

impl ReviewRound {
    /// 按创建时间推算缺省截止日期
    pub fn default_deadline(created_at: NaiveDateTime, days: i64) -> NaiveDate {
        (created_at + Duration::days(days)).date()
    }
}

// ==========================================
// ProductReview - 产品评审行
// ==========================================
// 复合主键: (round_id, product_id);一轮内一个产品至多指派一名评审人
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductReview {
    // ===== 主键字段 =====
    pub round_id: String,              // 关联轮次
    pub product_id: String,            // 产品ID

    // ===== 分配信息 =====
    pub assigned_to: Option<String>,   // 评审人ID (None = 未分配)
    pub match_score: Option<i32>,      // 分配时的匹配分 (专长优先级 1..10, 11=无匹配)
    pub assigned_at: Option<NaiveDateTime>, // 最近一次分配时间

    // ===== 评审信息 =====
    pub status: ReviewStatus,          // 评审状态
    pub priority: ReviewPriority,      // 业务重要度标签
    pub deadline: Option<NaiveDate>,   // 行级截止日期 (None = 继承轮次)

    // ===== 快照字段 =====
    // 注: 导出与通知需要产品名称等信息,由 API 层从 product 表补充
    pub updated_at: NaiveDateTime,     // 更新时间
}

impl ProductReview {
    /// 是否已分配评审人
    pub fn is_assigned(&self) -> bool {
        self.assigned_to.is_some()
    }

    /// 计算生效截止日期: 行级覆盖优先,否则继承轮次
    pub fn effective_deadline(&self, round: &ReviewRound) -> NaiveDate {
        self.deadline.unwrap_or(round.deadline)
    }

    /// 是否计入评审人工作量
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}
