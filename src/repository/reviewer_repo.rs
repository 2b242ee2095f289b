// ==========================================
// 产品评审分配系统 - 评审人仓储
// ==========================================
// 职责: 管理 reviewer / reviewer_expertise 表
// 红线: Repository 不含业务逻辑,专长匹配在引擎层
// ==========================================

use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::reviewer::{ExpertiseEntry, Reviewer};
use crate::domain::types::ExpertiseScope;
use crate::repository::error::{RepositoryError, RepositoryResult};

/// 时间戳存储格式
const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct ReviewerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReviewerRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 评审人
    // ==========================================

    /// 创建评审人
    pub fn create(&self, reviewer: &Reviewer) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO reviewer (reviewer_id, display_name, email, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                reviewer.reviewer_id,
                reviewer.display_name,
                reviewer.email,
                reviewer.created_at.format(TS_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }

    /// 按ID查找评审人
    pub fn find_by_id(&self, reviewer_id: &str) -> RepositoryResult<Option<Reviewer>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT reviewer_id, display_name, email, created_at
            FROM reviewer
            WHERE reviewer_id = ?1
            "#,
        )?;

        let result = stmt.query_row(params![reviewer_id], Self::map_reviewer_row);
        match result {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 批量按ID查找（结果按 reviewer_id 升序,缺失的ID由调用方比对发现）
    pub fn find_by_ids(&self, reviewer_ids: &[String]) -> RepositoryResult<Vec<Reviewer>> {
        if reviewer_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let placeholders = reviewer_ids
            .iter()
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!(
            r#"
            SELECT reviewer_id, display_name, email, created_at
            FROM reviewer
            WHERE reviewer_id IN ({})
            ORDER BY reviewer_id ASC
            "#,
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(reviewer_ids.iter()), Self::map_reviewer_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 列出全部评审人（按显示名排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Reviewer>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT reviewer_id, display_name, email, created_at
            FROM reviewer
            ORDER BY display_name ASC, reviewer_id ASC
            "#,
        )?;

        let rows = stmt
            .query_map([], Self::map_reviewer_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ==========================================
    // 专长声明
    // ==========================================

    /// 新增或更新一条专长声明（同键覆盖优先级）
    pub fn upsert_expertise(&self, entry: &ExpertiseEntry) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO reviewer_expertise (reviewer_id, scope, expertise_key, priority)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(reviewer_id, scope, expertise_key) DO UPDATE SET
                priority = excluded.priority
            "#,
            params![
                entry.reviewer_id,
                entry.scope.to_db_str(),
                entry.expertise_key,
                entry.priority,
            ],
        )?;
        Ok(())
    }

    /// 删除一条专长声明（幂等:不存在时静默成功）
    pub fn remove_expertise(
        &self,
        reviewer_id: &str,
        scope: ExpertiseScope,
        expertise_key: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            DELETE FROM reviewer_expertise
            WHERE reviewer_id = ?1 AND scope = ?2 AND expertise_key = ?3
            "#,
            params![reviewer_id, scope.to_db_str(), expertise_key],
        )?;
        Ok(())
    }

    /// 查询某评审人的全部专长声明
    pub fn find_expertise_by_reviewer(
        &self,
        reviewer_id: &str,
    ) -> RepositoryResult<Vec<ExpertiseEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT reviewer_id, scope, expertise_key, priority
            FROM reviewer_expertise
            WHERE reviewer_id = ?1
            ORDER BY scope ASC, expertise_key ASC
            "#,
        )?;

        let rows = stmt
            .query_map(params![reviewer_id], Self::map_expertise_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 批量查询多位评审人的专长声明（分配引擎一次性取数）
    pub fn find_expertise_by_reviewers(
        &self,
        reviewer_ids: &[String],
    ) -> RepositoryResult<HashMap<String, Vec<ExpertiseEntry>>> {
        let mut result: HashMap<String, Vec<ExpertiseEntry>> = HashMap::new();
        if reviewer_ids.is_empty() {
            return Ok(result);
        }

        let conn = self.get_conn()?;
        let placeholders = reviewer_ids
            .iter()
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!(
            r#"
            SELECT reviewer_id, scope, expertise_key, priority
            FROM reviewer_expertise
            WHERE reviewer_id IN ({})
            ORDER BY reviewer_id ASC, scope ASC, expertise_key ASC
            "#,
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(reviewer_ids.iter()), Self::map_expertise_row)?
            .collect::<Result<Vec<_>, _>>()?;

        for entry in rows {
            result
                .entry(entry.reviewer_id.clone())
                .or_default()
                .push(entry);
        }
        Ok(result)
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_reviewer_row(row: &rusqlite::Row) -> rusqlite::Result<Reviewer> {
        let created_at_str: String = row.get(3)?;
        let created_at = chrono::NaiveDateTime::parse_from_str(&created_at_str, TS_FORMAT)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(Reviewer {
            reviewer_id: row.get(0)?,
            display_name: row.get(1)?,
            email: row.get(2)?,
            created_at,
        })
    }

    fn map_expertise_row(row: &rusqlite::Row) -> rusqlite::Result<ExpertiseEntry> {
        let scope_str: String = row.get(1)?;
        // 数据库中的 scope 值由写路径保证合法,解析失败视为数据损坏
        let scope = ExpertiseScope::from_str(&scope_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("非法的专长范围: {}", scope_str).into(),
            )
        })?;

        Ok(ExpertiseEntry {
            reviewer_id: row.get(0)?,
            scope,
            expertise_key: row.get(2)?,
            priority: row.get(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn setup_repo() -> ReviewerRepository {
        let conn = Connection::open_in_memory().expect("打开内存库失败");
        conn.execute_batch(
            r#"
            CREATE TABLE reviewer (
              reviewer_id TEXT PRIMARY KEY,
              display_name TEXT NOT NULL,
              email TEXT NOT NULL,
              created_at TEXT NOT NULL
            );
            CREATE TABLE reviewer_expertise (
              reviewer_id TEXT NOT NULL,
              scope TEXT NOT NULL,
              expertise_key TEXT NOT NULL,
              priority INTEGER NOT NULL,
              PRIMARY KEY (reviewer_id, scope, expertise_key)
            );
            "#,
        )
        .expect("建表失败");
        ReviewerRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn make_reviewer(id: &str, name: &str) -> Reviewer {
        Reviewer {
            reviewer_id: id.to_string(),
            display_name: name.to_string(),
            email: format!("{}@example.com", id),
            created_at: NaiveDateTime::parse_from_str("2025-03-01 08:00:00", TS_FORMAT)
                .unwrap(),
        }
    }

    #[test]
    fn test_create_and_find_reviewer() {
        let repo = setup_repo();
        repo.create(&make_reviewer("rev-1", "张明")).unwrap();

        let found = repo.find_by_id("rev-1").unwrap().expect("应能查到");
        assert_eq!(found.display_name, "张明");
        assert_eq!(found.email, "rev-1@example.com");

        assert!(repo.find_by_id("rev-404").unwrap().is_none());
    }

    #[test]
    fn test_upsert_expertise_overwrites_priority() {
        let repo = setup_repo();
        repo.create(&make_reviewer("rev-1", "张明")).unwrap();

        let mut entry = ExpertiseEntry {
            reviewer_id: "rev-1".to_string(),
            scope: ExpertiseScope::Category,
            expertise_key: "直线加速器".to_string(),
            priority: 5,
        };
        repo.upsert_expertise(&entry).unwrap();

        // 同键重复声明,覆盖优先级而非新增行
        entry.priority = 2;
        repo.upsert_expertise(&entry).unwrap();

        let all = repo.find_expertise_by_reviewer("rev-1").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].priority, 2);
    }

    #[test]
    fn test_remove_expertise_is_idempotent() {
        let repo = setup_repo();
        repo.create(&make_reviewer("rev-1", "张明")).unwrap();

        // 删除不存在的声明不报错
        repo.remove_expertise("rev-1", ExpertiseScope::Product, "P-404")
            .unwrap();

        repo.upsert_expertise(&ExpertiseEntry {
            reviewer_id: "rev-1".to_string(),
            scope: ExpertiseScope::Product,
            expertise_key: "P-1".to_string(),
            priority: 1,
        })
        .unwrap();
        repo.remove_expertise("rev-1", ExpertiseScope::Product, "P-1")
            .unwrap();
        assert!(repo.find_expertise_by_reviewer("rev-1").unwrap().is_empty());

        // 再删一次仍然成功
        repo.remove_expertise("rev-1", ExpertiseScope::Product, "P-1")
            .unwrap();
    }

    #[test]
    fn test_batch_expertise_grouped_by_reviewer() {
        let repo = setup_repo();
        repo.create(&make_reviewer("rev-1", "张明")).unwrap();
        repo.create(&make_reviewer("rev-2", "李华")).unwrap();

        for (rid, key, priority) in [
            ("rev-1", "直线加速器", 2),
            ("rev-1", "质子治疗", 4),
            ("rev-2", "直线加速器", 7),
        ] {
            repo.upsert_expertise(&ExpertiseEntry {
                reviewer_id: rid.to_string(),
                scope: ExpertiseScope::Category,
                expertise_key: key.to_string(),
                priority,
            })
            .unwrap();
        }

        let grouped = repo
            .find_expertise_by_reviewers(&["rev-1".to_string(), "rev-2".to_string()])
            .unwrap();
        assert_eq!(grouped.get("rev-1").map(|v| v.len()), Some(2));
        assert_eq!(grouped.get("rev-2").map(|v| v.len()), Some(1));
    }
}
