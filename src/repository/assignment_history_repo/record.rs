use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

use crate::domain::assignment_history::AssignmentHistoryEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};

/// 在既有连接/事务上追加一条审计记录
///
/// commit / reassign / unassign 的事务内部与独立 record 共用此写路径,
/// 审计表的 INSERT 语句只存在这一处
pub(crate) fn insert_history_row(
    conn: &Connection,
    entry: &AssignmentHistoryEntry,
) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        INSERT INTO assignment_history (
            entry_id, round_id, product_id, change_type,
            previous_assignee, new_assignee, changed_by, reason,
            changed_at, payload_json
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            entry.entry_id,
            entry.round_id,
            entry.product_id,
            entry.change_type.to_db_str(),
            entry.previous_assignee,
            entry.new_assignee,
            entry.changed_by,
            entry.reason,
            entry.changed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.payload_json.as_ref().map(|v| v.to_string()),
        ],
    )?;
    Ok(())
}

// ==========================================
// AssignmentHistoryRepository - 审计日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct AssignmentHistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssignmentHistoryRepository {
    /// 创建新的审计日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 追加一条审计记录
    ///
    /// # 返回
    /// - `Ok(entry_id)`: 成功追加,返回entry_id
    /// - `Err(...)`: 数据库错误
    pub fn record(&self, entry: &AssignmentHistoryEntry) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_history_row(&conn, entry)?;
        Ok(entry.entry_id.clone())
    }

    /// 批量追加审计记录（单事务）
    pub fn batch_record(&self, entries: &[AssignmentHistoryEntry]) -> RepositoryResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for entry in entries {
            insert_history_row(&tx, entry)?;
        }
        tx.commit()?;
        Ok(entries.len())
    }
}
