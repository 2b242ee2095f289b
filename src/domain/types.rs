// ==========================================
// 产品评审分配系统 - 领域类型定义
// ==========================================
// 职责: 定义评审领域的枚举类型与评审状态机
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 专长范围 (Expertise Scope)
// ==========================================
// 红线: 范围越具体,同优先级下匹配越优先
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpertiseScope {
    Product,  // 指定产品
    Company,  // 指定厂商
    Category, // 指定品类
}

impl fmt::Display for ExpertiseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpertiseScope::Product => write!(f, "PRODUCT"),
            ExpertiseScope::Company => write!(f, "COMPANY"),
            ExpertiseScope::Category => write!(f, "CATEGORY"),
        }
    }
}

impl ExpertiseScope {
    /// "无匹配"的具体度序号,排在所有声明范围之后
    pub const NO_MATCH_RANK: i32 = 3;

    /// 从字符串解析专长范围（未知值返回 None，由调用方决定如何报错）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PRODUCT" => Some(ExpertiseScope::Product),
            "COMPANY" => Some(ExpertiseScope::Company),
            "CATEGORY" => Some(ExpertiseScope::Category),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ExpertiseScope::Product => "PRODUCT",
            ExpertiseScope::Company => "COMPANY",
            ExpertiseScope::Category => "CATEGORY",
        }
    }

    /// 具体度序号: 同优先级时小者优先
    ///
    /// PRODUCT(0) > COMPANY(1) > CATEGORY(2)，"无匹配"记为 NO_MATCH_RANK
    pub fn specificity_rank(&self) -> i32 {
        match self {
            ExpertiseScope::Product => 0,
            ExpertiseScope::Company => 1,
            ExpertiseScope::Category => 2,
        }
    }
}

// ==========================================
// 评审状态 (Review Status)
// ==========================================
// 状态机: PENDING → IN_PROGRESS → COMPLETED → APPROVED | REJECTED
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,    // 待评审
    InProgress, // 评审中
    Completed,  // 已完成待裁决
    Approved,   // 通过
    Rejected,   // 驳回
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Pending => write!(f, "PENDING"),
            ReviewStatus::InProgress => write!(f, "IN_PROGRESS"),
            ReviewStatus::Completed => write!(f, "COMPLETED"),
            ReviewStatus::Approved => write!(f, "APPROVED"),
            ReviewStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

impl ReviewStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PENDING" => ReviewStatus::Pending,
            "IN_PROGRESS" => ReviewStatus::InProgress,
            "COMPLETED" => ReviewStatus::Completed,
            "APPROVED" => ReviewStatus::Approved,
            "REJECTED" => ReviewStatus::Rejected,
            _ => ReviewStatus::Pending, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "PENDING",
            ReviewStatus::InProgress => "IN_PROGRESS",
            ReviewStatus::Completed => "COMPLETED",
            ReviewStatus::Approved => "APPROVED",
            ReviewStatus::Rejected => "REJECTED",
        }
    }

    /// 是否计入评审人当前工作量（未终结的在途评审）
    pub fn is_open(&self) -> bool {
        matches!(self, ReviewStatus::Pending | ReviewStatus::InProgress)
    }

    /// 是否为终态（终态不允许再流转）
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewStatus::Approved | ReviewStatus::Rejected)
    }

    /// 状态机合法流转判断
    ///
    /// 注意: unassign 将状态直接重置为 PENDING,不走此状态机
    pub fn can_transition_to(&self, target: ReviewStatus) -> bool {
        matches!(
            (self, target),
            (ReviewStatus::Pending, ReviewStatus::InProgress)
                | (ReviewStatus::InProgress, ReviewStatus::Completed)
                | (ReviewStatus::Completed, ReviewStatus::Approved)
                | (ReviewStatus::Completed, ReviewStatus::Rejected)
        )
    }
}

// ==========================================
// 评审优先级标签 (Review Priority)
// ==========================================
// 业务重要度标签,与专长优先级(1..10)无关
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewPriority {
    Low,      // 低
    Medium,   // 中
    High,     // 高
    Critical, // 紧急
}

impl fmt::Display for ReviewPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewPriority::Low => write!(f, "LOW"),
            ReviewPriority::Medium => write!(f, "MEDIUM"),
            ReviewPriority::High => write!(f, "HIGH"),
            ReviewPriority::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl ReviewPriority {
    /// 从字符串解析优先级标签
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "LOW" => ReviewPriority::Low,
            "MEDIUM" => ReviewPriority::Medium,
            "HIGH" => ReviewPriority::High,
            "CRITICAL" => ReviewPriority::Critical,
            _ => ReviewPriority::Medium, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ReviewPriority::Low => "LOW",
            ReviewPriority::Medium => "MEDIUM",
            ReviewPriority::High => "HIGH",
            ReviewPriority::Critical => "CRITICAL",
        }
    }
}

// ==========================================
// 分配变更类型 (Assignment Change Type)
// ==========================================
// 审计日志的三种变更来源,与 assigned_to 的写路径一一对应
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentChangeType {
    Initial,    // 首次分配(commit)
    Reassigned, // 改派(reassign)
    Removed,    // 取消分配(unassign)
}

impl fmt::Display for AssignmentChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentChangeType::Initial => write!(f, "INITIAL"),
            AssignmentChangeType::Reassigned => write!(f, "REASSIGNED"),
            AssignmentChangeType::Removed => write!(f, "REMOVED"),
        }
    }
}

impl AssignmentChangeType {
    /// 从字符串解析变更类型
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INITIAL" => Some(AssignmentChangeType::Initial),
            "REASSIGNED" => Some(AssignmentChangeType::Reassigned),
            "REMOVED" => Some(AssignmentChangeType::Removed),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AssignmentChangeType::Initial => "INITIAL",
            AssignmentChangeType::Reassigned => "REASSIGNED",
            AssignmentChangeType::Removed => "REMOVED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_specificity_order() {
        // 产品级最具体,品类级最泛化
        assert!(
            ExpertiseScope::Product.specificity_rank()
                < ExpertiseScope::Company.specificity_rank()
        );
        assert!(
            ExpertiseScope::Company.specificity_rank()
                < ExpertiseScope::Category.specificity_rank()
        );
    }

    #[test]
    fn test_scope_parse_roundtrip() {
        assert_eq!(
            ExpertiseScope::from_str("product"),
            Some(ExpertiseScope::Product)
        );
        assert_eq!(ExpertiseScope::from_str("不存在"), None);
        assert_eq!(ExpertiseScope::Company.to_db_str(), "COMPANY");
    }

    #[test]
    fn test_review_status_open_and_terminal() {
        assert!(ReviewStatus::Pending.is_open());
        assert!(ReviewStatus::InProgress.is_open());
        assert!(!ReviewStatus::Completed.is_open());
        assert!(ReviewStatus::Approved.is_terminal());
        assert!(ReviewStatus::Rejected.is_terminal());
        assert!(!ReviewStatus::Pending.is_terminal());
    }

    #[test]
    fn test_review_status_transitions() {
        // 正向流转
        assert!(ReviewStatus::Pending.can_transition_to(ReviewStatus::InProgress));
        assert!(ReviewStatus::InProgress.can_transition_to(ReviewStatus::Completed));
        assert!(ReviewStatus::Completed.can_transition_to(ReviewStatus::Approved));
        assert!(ReviewStatus::Completed.can_transition_to(ReviewStatus::Rejected));

        // 非法流转
        assert!(!ReviewStatus::Pending.can_transition_to(ReviewStatus::Approved));
        assert!(!ReviewStatus::Approved.can_transition_to(ReviewStatus::Pending));
        assert!(!ReviewStatus::Rejected.can_transition_to(ReviewStatus::InProgress));
    }

    #[test]
    fn test_change_type_parse() {
        assert_eq!(
            AssignmentChangeType::from_str("REASSIGNED"),
            Some(AssignmentChangeType::Reassigned)
        );
        assert_eq!(AssignmentChangeType::from_str("UNKNOWN"), None);
        assert_eq!(AssignmentChangeType::Initial.to_db_str(), "INITIAL");
    }
}
