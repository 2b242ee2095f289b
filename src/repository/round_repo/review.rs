use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, params_from_iter, Connection, Result as SqliteResult, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::assignment_history::AssignmentHistoryEntry;
use crate::domain::round::ProductReview;
use crate::domain::types::{ReviewPriority, ReviewStatus};
use crate::repository::assignment_history_repo::insert_history_row;
use crate::repository::error::{RepositoryError, RepositoryResult};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// 在既有连接/事务上写入一条评审行
///
/// 轮次提交事务与单行写入共用此路径
pub(super) fn insert_review_row(conn: &Connection, review: &ProductReview) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        INSERT INTO product_review (
            round_id, product_id, assigned_to, match_score, assigned_at,
            status, priority, deadline, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            review.round_id,
            review.product_id,
            review.assigned_to,
            review.match_score,
            review
                .assigned_at
                .map(|ts| ts.format(TS_FORMAT).to_string()),
            review.status.to_db_str(),
            review.priority.to_db_str(),
            review.deadline.map(|d| d.format(DATE_FORMAT).to_string()),
            review.updated_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

// ==========================================
// ProductReviewRepository - 评审行仓储
// ==========================================
// 红线: assigned_to 的修改必须走 apply_assignment_change,
//       保证更新与审计记录同事务
pub struct ProductReviewRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductReviewRepository {
    /// 创建新的评审行仓储
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

    /// 落地一次分配变更（重新分配 / 取消分配）
    ///
    /// 同一事务内更新评审行并追加审计记录,两者要么都落库要么都回滚。
    /// 评审行的 assigned_to / match_score / assigned_at / status / updated_at
    /// 全部以审计记录中的变更内容与时间为准。
    ///
    /// # 参数
    /// - entry: 本次变更的审计记录 (new_assignee = None 表示取消分配)
    /// - new_status: 变更后的评审状态
    /// - match_score: 变更后的匹配分 (取消分配时传 None)
    ///
    /// # 返回
    /// - `Err(NotFound)`: 轮次中不存在该产品的评审行
    pub fn apply_assignment_change(
        &self,
        entry: &AssignmentHistoryEntry,
        new_status: ReviewStatus,
        match_score: Option<i32>,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let changed_at_str = entry.changed_at.format(TS_FORMAT).to_string();
        let assigned_at = entry.new_assignee.as_ref().map(|_| changed_at_str.clone());

        let affected = tx.execute(
            r#"
            UPDATE product_review
            SET assigned_to = ?1,
                match_score = ?2,
                assigned_at = ?3,
                status = ?4,
                updated_at = ?5
            WHERE round_id = ?6 AND product_id = ?7
            "#,
            params![
                entry.new_assignee,
                match_score,
                assigned_at,
                new_status.to_db_str(),
                changed_at_str,
                entry.round_id,
                entry.product_id,
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ProductReview".to_string(),
                id: format!("{}/{}", entry.round_id, entry.product_id),
            });
        }

        insert_history_row(&tx, entry)?;
        tx.commit()?;
        Ok(())
    }

    /// 更新评审状态（分配关系不变）
    ///
    /// 先读当前状态校验状态机迁移合法性,非法迁移直接拒绝
    pub fn update_status(
        &self,
        round_id: &str,
        product_id: &str,
        new_status: ReviewStatus,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let current_str: String = match conn.query_row(
            "SELECT status FROM product_review WHERE round_id = ?1 AND product_id = ?2",
            params![round_id, product_id],
            |row| row.get(0),
        ) {
            Ok(s) => s,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(RepositoryError::NotFound {
                    entity: "ProductReview".to_string(),
                    id: format!("{}/{}", round_id, product_id),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let current = ReviewStatus::from_str(&current_str);
        if !current.can_transition_to(new_status) {
            return Err(RepositoryError::InvalidStateTransition {
                from: current.to_string(),
                to: new_status.to_string(),
            });
        }

        conn.execute(
            r#"
            UPDATE product_review
            SET status = ?1, updated_at = ?2
            WHERE round_id = ?3 AND product_id = ?4
            "#,
            params![
                new_status.to_db_str(),
                updated_at.format(TS_FORMAT).to_string(),
                round_id,
                product_id,
            ],
        )?;
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按轮次 + 产品查询评审行
    pub fn find_by_key(
        &self,
        round_id: &str,
        product_id: &str,
    ) -> RepositoryResult<Option<ProductReview>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"
            SELECT round_id, product_id, assigned_to, match_score, assigned_at,
                   status, priority, deadline, updated_at
            FROM product_review
            WHERE round_id = ?1 AND product_id = ?2
            "#,
            params![round_id, product_id],
            |row| Self::map_row(row),
        ) {
            Ok(review) => Ok(Some(review)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询某轮次的全部评审行,按产品ID排序
    pub fn find_by_round(&self, round_id: &str) -> RepositoryResult<Vec<ProductReview>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT round_id, product_id, assigned_to, match_score, assigned_at,
                   status, priority, deadline, updated_at
            FROM product_review
            WHERE round_id = ?1
            ORDER BY product_id ASC
            "#,
        )?;

        let reviews = stmt
            .query_map(params![round_id], |row| Self::map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(reviews)
    }

    /// 某评审人当前的未完结评审数（跨全部轮次）
    pub fn count_open_by_reviewer(&self, reviewer_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM product_review
            WHERE assigned_to = ?1 AND status IN ('PENDING', 'IN_PROGRESS')
            "#,
            params![reviewer_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 某评审人在指定轮次内的未完结评审数
    pub fn count_open_by_reviewer_in_round(
        &self,
        reviewer_id: &str,
        round_id: &str,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM product_review
            WHERE assigned_to = ?1 AND round_id = ?2
              AND status IN ('PENDING', 'IN_PROGRESS')
            "#,
            params![reviewer_id, round_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 一组评审人的未完结评审数,没有任何评审的补 0
    ///
    /// # 返回
    /// - `HashMap<reviewer_id, 未完结数>`,键集合与入参一致
    pub fn count_open_by_reviewers(
        &self,
        reviewer_ids: &[String],
    ) -> RepositoryResult<HashMap<String, i64>> {
        let mut counts: HashMap<String, i64> =
            reviewer_ids.iter().map(|id| (id.clone(), 0)).collect();
        if reviewer_ids.is_empty() {
            return Ok(counts);
        }

        let conn = self.get_conn()?;
        let placeholders = reviewer_ids
            .iter()
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!(
            r#"
            SELECT assigned_to, COUNT(*)
            FROM product_review
            WHERE assigned_to IN ({}) AND status IN ('PENDING', 'IN_PROGRESS')
            GROUP BY assigned_to
            "#,
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(reviewer_ids.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (reviewer_id, count) = row?;
            counts.insert(reviewer_id, count);
        }
        Ok(counts)
    }

    /// 某轮次内各评审人的评审行数（含已完结,不含未分配行）
    pub fn count_assigned_by_round(
        &self,
        round_id: &str,
    ) -> RepositoryResult<HashMap<String, i64>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT assigned_to, COUNT(*)
            FROM product_review
            WHERE round_id = ?1 AND assigned_to IS NOT NULL
            GROUP BY assigned_to
            "#,
        )?;

        let rows = stmt.query_map(params![round_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (reviewer_id, count) = row?;
            counts.insert(reviewer_id, count);
        }
        Ok(counts)
    }

    /// 某轮次的评审行总数
    pub fn count_by_round(&self, round_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM product_review WHERE round_id = ?1",
            params![round_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 映射数据库行到评审行
    fn map_row(row: &Row) -> rusqlite::Result<ProductReview> {
        let assigned_at = row
            .get::<_, Option<String>>(4)?
            .map(|s| {
                NaiveDateTime::parse_from_str(&s, TS_FORMAT).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        4,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })
            })
            .transpose()?;

        let status_str: String = row.get(5)?;
        let priority_str: String = row.get(6)?;

        let deadline = row
            .get::<_, Option<String>>(7)?
            .map(|s| {
                NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        7,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })
            })
            .transpose()?;

        let updated_at_str: String = row.get(8)?;
        let updated_at =
            NaiveDateTime::parse_from_str(&updated_at_str, TS_FORMAT).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    8,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(ProductReview {
            round_id: row.get(0)?,
            product_id: row.get(1)?,
            assigned_to: row.get(2)?,
            match_score: row.get(3)?,
            assigned_at,
            status: ReviewStatus::from_str(&status_str),
            priority: ReviewPriority::from_str(&priority_str),
            deadline,
            updated_at,
        })
    }
}
