use chrono::NaiveDateTime;
use rusqlite::{params, Result as SqliteResult, Row};

use super::record::AssignmentHistoryRepository;
use crate::domain::assignment_history::AssignmentHistoryEntry;
use crate::domain::types::AssignmentChangeType;
use crate::repository::error::RepositoryResult;

impl AssignmentHistoryRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 查询某轮次的全部审计记录
    ///
    /// 排序: changed_at 升序;同秒记录按 seq（物理写入序）稳定排序
    pub fn history_for_round(
        &self,
        round_id: &str,
    ) -> RepositoryResult<Vec<AssignmentHistoryEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT entry_id, round_id, product_id, change_type,
                   previous_assignee, new_assignee, changed_by, reason,
                   changed_at, payload_json
            FROM assignment_history
            WHERE round_id = ?1
            ORDER BY changed_at ASC, seq ASC
            "#,
        )?;

        let entries = stmt
            .query_map(params![round_id], |row| Self::map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }

    /// 查询某轮次中某产品的审计记录（回放 assigned_to 的依据）
    pub fn history_for_product(
        &self,
        round_id: &str,
        product_id: &str,
    ) -> RepositoryResult<Vec<AssignmentHistoryEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT entry_id, round_id, product_id, change_type,
                   previous_assignee, new_assignee, changed_by, reason,
                   changed_at, payload_json
            FROM assignment_history
            WHERE round_id = ?1 AND product_id = ?2
            ORDER BY changed_at ASC, seq ASC
            "#,
        )?;

        let entries = stmt
            .query_map(params![round_id, product_id], |row| Self::map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }

    /// 某轮次的审计记录条数
    pub fn count_by_round(&self, round_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM assignment_history WHERE round_id = ?1",
            params![round_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 映射数据库行到审计记录
    fn map_row(row: &Row) -> rusqlite::Result<AssignmentHistoryEntry> {
        let change_type_str: String = row.get(3)?;
        let change_type = AssignmentChangeType::from_str(&change_type_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("非法的变更类型: {}", change_type_str).into(),
            )
        })?;

        let changed_at_str: String = row.get(8)?;
        let changed_at = NaiveDateTime::parse_from_str(&changed_at_str, "%Y-%m-%d %H:%M:%S")
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    8,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        let payload_json = row
            .get::<_, Option<String>>(9)?
            .and_then(|s| serde_json::from_str(&s).ok());

        Ok(AssignmentHistoryEntry {
            entry_id: row.get(0)?,
            round_id: row.get(1)?,
            product_id: row.get(2)?,
            change_type,
            previous_assignee: row.get(4)?,
            new_assignee: row.get(5)?,
            changed_by: row.get(6)?,
            reason: row.get(7)?,
            changed_at,
            payload_json,
        })
    }
}
