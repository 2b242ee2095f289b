// ==========================================
// 产品评审分配系统 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - ensure_schema 幂等建表，首次启动即可用，无需外部迁移脚本
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明：
/// - ensure_schema 建表后写入该版本号
/// - read_schema_version 返回值低于该值时仅告警（不做自动迁移）
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 幂等建表（全部 CREATE TABLE IF NOT EXISTS）
///
/// # 说明
/// - reviewer / reviewer_expertise: 评审人与多维专长
/// - product: 产品目录（导入按 product_id 覆盖）
/// - review_round / product_review: 评审轮次与轮内评审行
/// - assignment_history: 追加式审计流水，seq 自增保证回放顺序
/// - config_kv: 全局键值配置
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS reviewer (
          reviewer_id TEXT PRIMARY KEY,
          display_name TEXT NOT NULL,
          email TEXT NOT NULL,
          created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reviewer_expertise (
          reviewer_id TEXT NOT NULL REFERENCES reviewer(reviewer_id) ON DELETE CASCADE,
          scope TEXT NOT NULL,
          expertise_key TEXT NOT NULL,
          priority INTEGER NOT NULL,
          PRIMARY KEY (reviewer_id, scope, expertise_key)
        );

        CREATE TABLE IF NOT EXISTS product (
          product_id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          category TEXT NOT NULL,
          company TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS review_round (
          round_id TEXT PRIMARY KEY,
          round_name TEXT NOT NULL,
          round_no INTEGER NOT NULL UNIQUE,
          created_by TEXT NOT NULL,
          created_at TEXT NOT NULL,
          deadline TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product_review (
          round_id TEXT NOT NULL REFERENCES review_round(round_id) ON DELETE CASCADE,
          product_id TEXT NOT NULL,
          assigned_to TEXT,
          match_score INTEGER,
          assigned_at TEXT,
          status TEXT NOT NULL,
          priority TEXT NOT NULL,
          deadline TEXT,
          updated_at TEXT NOT NULL,
          PRIMARY KEY (round_id, product_id)
        );

        CREATE TABLE IF NOT EXISTS assignment_history (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          entry_id TEXT NOT NULL UNIQUE,
          round_id TEXT NOT NULL REFERENCES review_round(round_id) ON DELETE CASCADE,
          product_id TEXT NOT NULL,
          change_type TEXT NOT NULL,
          previous_assignee TEXT,
          new_assignee TEXT,
          changed_by TEXT NOT NULL,
          reason TEXT,
          changed_at TEXT NOT NULL,
          payload_json TEXT
        );

        CREATE TABLE IF NOT EXISTS config_kv (
          scope_id TEXT NOT NULL,
          key TEXT NOT NULL,
          value TEXT NOT NULL,
          updated_at TEXT NOT NULL DEFAULT (datetime('now')),
          PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS schema_version (
          version INTEGER NOT NULL,
          applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- 工作量统计按 (assigned_to, status) 扫描，轮次详情/历史回放按 round_id 扫描
        CREATE INDEX IF NOT EXISTS idx_review_assignee_status ON product_review(assigned_to, status);
        CREATE INDEX IF NOT EXISTS idx_history_round_seq ON assignment_history(round_id, seq);
        CREATE INDEX IF NOT EXISTS idx_history_product_seq ON assignment_history(round_id, product_id, seq);
        "#,
    )?;

    conn.execute(
        "INSERT INTO schema_version (version) SELECT ?1 WHERE NOT EXISTS (SELECT 1 FROM schema_version)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_enables_foreign_keys() {
        let conn = Connection::open_in_memory().expect("打开内存库失败");
        configure_sqlite_connection(&conn).expect("配置失败");

        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .expect("读取 PRAGMA 失败");
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("打开内存库失败");
        configure_sqlite_connection(&conn).expect("配置失败");

        ensure_schema(&conn).expect("首次建表失败");
        ensure_schema(&conn).expect("重复建表应当幂等");

        assert_eq!(read_schema_version(&conn).expect("读版本失败"), Some(CURRENT_SCHEMA_VERSION));

        // 核心表均可写入
        conn.execute(
            "INSERT INTO reviewer (reviewer_id, display_name, email, created_at) VALUES ('rev-1', '张三', 'zhang@example.com', '2026-01-01 08:00:00')",
            [],
        )
        .expect("reviewer 表写入失败");
        conn.execute(
            "INSERT INTO product (product_id, name, category, company) VALUES ('P-1', '智能手表', '可穿戴', '华米科技')",
            [],
        )
        .expect("product 表写入失败");
    }

    #[test]
    fn test_schema_version_absent_on_empty_db() {
        let conn = Connection::open_in_memory().expect("打开内存库失败");
        assert_eq!(read_schema_version(&conn).expect("读版本失败"), None);
    }

    #[test]
    fn test_expertise_cascades_on_reviewer_delete() {
        let conn = Connection::open_in_memory().expect("打开内存库失败");
        configure_sqlite_connection(&conn).expect("配置失败");
        ensure_schema(&conn).expect("建表失败");

        conn.execute(
            "INSERT INTO reviewer (reviewer_id, display_name, email, created_at) VALUES ('rev-1', '张三', 'zhang@example.com', '2026-01-01 08:00:00')",
            [],
        )
        .expect("写入失败");
        conn.execute(
            "INSERT INTO reviewer_expertise (reviewer_id, scope, expertise_key, priority) VALUES ('rev-1', 'CATEGORY', '可穿戴', 2)",
            [],
        )
        .expect("写入失败");

        conn.execute("DELETE FROM reviewer WHERE reviewer_id = 'rev-1'", [])
            .expect("删除失败");
        let left: i64 = conn
            .query_row("SELECT COUNT(*) FROM reviewer_expertise", [], |row| row.get(0))
            .expect("统计失败");
        assert_eq!(left, 0);
    }
}
