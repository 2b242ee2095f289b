// ==========================================
// 产品评审分配系统 - 分配审计日志领域模型
// ==========================================
// 职责: assigned_to 每次变更的追加式审计记录
// 红线: 只追加,永不更新或删除;每次变更恰好一条
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::types::AssignmentChangeType;

// ==========================================
// AssignmentHistoryEntry - 分配变更记录
// ==========================================
// 对齐: assignment_history 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentHistoryEntry {
    // ===== 主键 =====
    pub entry_id: String,                    // 日志ID
    pub round_id: String,                    // 评审轮次ID
    pub product_id: String,                  // 产品ID

    // ===== 变更内容 =====
    pub change_type: AssignmentChangeType,   // 变更类型
    pub previous_assignee: Option<String>,   // 原评审人 (首次分配为 None)
    pub new_assignee: Option<String>,        // 新评审人 (取消分配为 None)

    // ===== 操作上下文 =====
    pub changed_by: String,                  // 操作人 (管理员ID)
    pub reason: Option<String>,              // 变更原因 (自由文本)
    pub changed_at: NaiveDateTime,           // 变更时间戳

    // ===== 上下文快照 =====
    pub payload_json: Option<JsonValue>,     // 分配上下文 (匹配分/专长范围等, JSON)
}

impl AssignmentHistoryEntry {
    /// 构造一条变更记录（时间取当前本地时间,ID 为 UUID v4）
    pub fn new(
        round_id: &str,
        product_id: &str,
        change_type: AssignmentChangeType,
        previous_assignee: Option<String>,
        new_assignee: Option<String>,
        changed_by: &str,
    ) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            round_id: round_id.to_string(),
            product_id: product_id.to_string(),
            change_type,
            previous_assignee,
            new_assignee,
            changed_by: changed_by.to_string(),
            reason: None,
            changed_at: chrono::Local::now().naive_local(),
            payload_json: None,
        }
    }

    /// 附加变更原因
    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// 附加上下文快照 (序列化失败时静默忽略,审计主体字段不受影响)
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    /// 回放一条记录: 给定回放前的 assigned_to,返回回放后的值
    ///
    /// 按 changed_at 升序依次回放全部记录,结果应等于评审行当前的 assigned_to
    pub fn apply_to(&self, _current: Option<String>) -> Option<String> {
        match self.change_type {
            AssignmentChangeType::Initial | AssignmentChangeType::Reassigned => {
                self.new_assignee.clone()
            }
            AssignmentChangeType::Removed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_reconstructs_current_assignee() {
        let initial = AssignmentHistoryEntry::new(
            "r-1",
            "p-1",
            AssignmentChangeType::Initial,
            None,
            Some("reviewer-a".to_string()),
            "admin",
        );
        let reassigned = AssignmentHistoryEntry::new(
            "r-1",
            "p-1",
            AssignmentChangeType::Reassigned,
            Some("reviewer-a".to_string()),
            Some("reviewer-b".to_string()),
            "admin",
        );
        let removed = AssignmentHistoryEntry::new(
            "r-1",
            "p-1",
            AssignmentChangeType::Removed,
            Some("reviewer-b".to_string()),
            None,
            "admin",
        );

        let mut current: Option<String> = None;
        for entry in [&initial, &reassigned, &removed] {
            current = entry.apply_to(current);
        }
        assert_eq!(current, None);

        // 只回放前两条,应落在 reviewer-b
        let mut current: Option<String> = None;
        for entry in [&initial, &reassigned] {
            current = entry.apply_to(current);
        }
        assert_eq!(current.as_deref(), Some("reviewer-b"));
    }

    #[test]
    fn test_with_payload_snapshot() {
        #[derive(Serialize)]
        struct Ctx {
            match_score: i32,
            scope: String,
        }

        let entry = AssignmentHistoryEntry::new(
            "r-1",
            "p-1",
            AssignmentChangeType::Initial,
            None,
            Some("reviewer-a".to_string()),
            "admin",
        )
        .with_payload(&Ctx {
            match_score: 2,
            scope: "CATEGORY".to_string(),
        });

        let payload = entry.payload_json.expect("payload 应已写入");
        assert_eq!(payload["match_score"], 2);
        assert_eq!(payload["scope"], "CATEGORY");
    }
}
