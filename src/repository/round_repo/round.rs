use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

use super::review::insert_review_row;
use crate::domain::assignment_history::AssignmentHistoryEntry;
use crate::domain::round::{ProductReview, ReviewRound};
use crate::repository::assignment_history_repo::insert_history_row;
use crate::repository::error::{RepositoryError, RepositoryResult};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

// ==========================================
// ReviewRoundRepository - 评审轮次仓储
// ==========================================
// 红线: 轮次一经提交不可整体删除,只能通过变更记录调整分配
pub struct ReviewRoundRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReviewRoundRepository {
    /// 创建新的评审轮次仓储
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

    /// 提交一个评审轮次（自动分配 round_no,避免并发下轮次号冲突）
    ///
    /// 同一事务内完成: 查询 MAX(round_no) 并写入轮次、写入全部评审行、
    /// 写入每个产品的初次分配审计记录。任何一步失败则整体回滚,
    /// 不会出现有评审行没审计记录的轮次。
    ///
    /// # 参数
    /// - round: 待提交轮次,round_no 会被本方法覆盖
    /// - reviews: 该轮次的全部评审行（已分配或未分配均可）
    /// - entries: 与已分配评审行一一对应的审计记录
    ///
    /// # 返回
    /// - `Ok(round_id)`: 提交成功
    pub fn commit_round(
        &self,
        round: &mut ReviewRound,
        reviews: &[ProductReview],
        entries: &[AssignmentHistoryEntry],
    ) -> RepositoryResult<String> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let max_round_no: Option<i32> =
            tx.query_row("SELECT MAX(round_no) FROM review_round", [], |row| {
                row.get(0)
            })?;
        round.round_no = max_round_no.unwrap_or(0) + 1;

        tx.execute(
            r#"
            INSERT INTO review_round (
                round_id, round_name, round_no, created_by, created_at, deadline
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                round.round_id,
                round.round_name,
                round.round_no,
                round.created_by,
                round.created_at.format(TS_FORMAT).to_string(),
                round.deadline.format(DATE_FORMAT).to_string(),
            ],
        )?;

        for review in reviews {
            insert_review_row(&tx, review)?;
        }
        for entry in entries {
            insert_history_row(&tx, entry)?;
        }

        tx.commit()?;
        Ok(round.round_id.clone())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 round_id 查询轮次
    pub fn find_by_id(&self, round_id: &str) -> RepositoryResult<Option<ReviewRound>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"
            SELECT round_id, round_name, round_no, created_by, created_at, deadline
            FROM review_round
            WHERE round_id = ?1
            "#,
            params![round_id],
            |row| Self::map_row(row),
        ) {
            Ok(round) => Ok(Some(round)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按轮次号查询轮次
    pub fn find_by_round_no(&self, round_no: i32) -> RepositoryResult<Option<ReviewRound>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"
            SELECT round_id, round_name, round_no, created_by, created_at, deadline
            FROM review_round
            WHERE round_no = ?1
            "#,
            params![round_no],
            |row| Self::map_row(row),
        ) {
            Ok(round) => Ok(Some(round)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询全部轮次,最新的在前
    pub fn list_all(&self) -> RepositoryResult<Vec<ReviewRound>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT round_id, round_name, round_no, created_by, created_at, deadline
            FROM review_round
            ORDER BY round_no DESC
            "#,
        )?;

        let rounds = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rounds)
    }

    /// 轮次总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM review_round", [], |row| row.get(0))?;
        Ok(count)
    }

    /// 映射数据库行到轮次
    fn map_row(row: &Row) -> rusqlite::Result<ReviewRound> {
        let created_at_str: String = row.get(4)?;
        let created_at =
            NaiveDateTime::parse_from_str(&created_at_str, TS_FORMAT).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        let deadline_str: String = row.get(5)?;
        let deadline = NaiveDate::parse_from_str(&deadline_str, DATE_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(ReviewRound {
            round_id: row.get(0)?,
            round_name: row.get(1)?,
            round_no: row.get(2)?,
            created_by: row.get(3)?,
            created_at,
            deadline,
        })
    }
}
