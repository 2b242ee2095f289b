// ==========================================
// 产品评审分配系统 - 评审人领域模型
// ==========================================
// 职责: 评审人与专长声明实体
// 红线: current_workload 为派生值,永不直接落库
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::ExpertiseScope;

// ==========================================
// Reviewer - 评审人
// ==========================================
// 用户被授予评审/管理员角色时创建
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reviewer {
    pub reviewer_id: String,       // 评审人ID
    pub display_name: String,      // 显示名称
    pub email: String,             // 通知邮箱
    pub created_at: NaiveDateTime, // 创建时间
}

// ==========================================
// ExpertiseEntry - 专长声明
// ==========================================
// 唯一性: (reviewer_id, scope, expertise_key)
// 优先级: 1..10,数值越小专长越强;"无匹配"由引擎记为 11
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertiseEntry {
    pub reviewer_id: String,    // 评审人ID
    pub scope: ExpertiseScope,  // 专长范围 (PRODUCT/COMPANY/CATEGORY)
    pub expertise_key: String,  // 范围内的键 (产品ID/厂商名/品类名)
    pub priority: i32,          // 专长优先级 1..10 (小者强)
}

/// 专长优先级下界（最强）
pub const EXPERTISE_PRIORITY_MIN: i32 = 1;
/// 专长优先级上界（最弱的声明值;11 保留给"无匹配"）
pub const EXPERTISE_PRIORITY_MAX: i32 = 10;

impl ExpertiseEntry {
    /// 判断优先级是否落在合法声明区间 [1, 10]
    pub fn priority_in_range(priority: i32) -> bool {
        (EXPERTISE_PRIORITY_MIN..=EXPERTISE_PRIORITY_MAX).contains(&priority)
    }
}

// ==========================================
// ReviewerWithWorkload - 评审人列表读模型
// ==========================================
// 用途: 评审人选择界面,带派生工作量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerWithWorkload {
    pub reviewer: Reviewer,        // 评审人
    pub current_workload: i64,     // 在途评审数 (PENDING/IN_PROGRESS)
    pub expertise_count: i64,      // 专长声明数
}
