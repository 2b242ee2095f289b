// ==========================================
// 产品评审分配系统 - 产品目录仓储
// ==========================================
// 职责: 管理 product 表
// 说明: 目录对分配引擎只读;写路径仅供导入通道使用
// ==========================================

use rusqlite::{params, params_from_iter, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::product::Product;
use crate::repository::error::{RepositoryError, RepositoryResult};

pub struct ProductRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增或更新目录条目（导入通道专用,按 product_id 覆盖）
    ///
    /// 返回 true 表示新增,false 表示覆盖已有条目
    pub fn upsert(&self, product: &Product) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let existed: bool = conn
            .query_row(
                "SELECT 1 FROM product WHERE product_id = ?1",
                params![product.product_id],
                |_row| Ok(true),
            )
            .unwrap_or(false);

        conn.execute(
            r#"
            INSERT INTO product (product_id, name, category, company)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(product_id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                company = excluded.company
            "#,
            params![
                product.product_id,
                product.name,
                product.category,
                product.company,
            ],
        )?;
        Ok(!existed)
    }

    /// 按ID查找产品
    pub fn find_by_id(&self, product_id: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT product_id, name, category, company
            FROM product
            WHERE product_id = ?1
            "#,
        )?;

        let result = stmt.query_row(params![product_id], Self::map_row);
        match result {
            Ok(p) => Ok(Some(p)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 批量按ID查找（分配请求的取数入口;缺失的ID由调用方比对发现）
    pub fn find_by_ids(&self, product_ids: &[String]) -> RepositoryResult<Vec<Product>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let placeholders = product_ids
            .iter()
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!(
            r#"
            SELECT product_id, name, category, company
            FROM product
            WHERE product_id IN ({})
            ORDER BY product_id ASC
            "#,
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(product_ids.iter()), Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 列出全部目录条目（按品类/厂商/ID 排序,与分配遍历序一致）
    pub fn list_all(&self) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT product_id, name, category, company
            FROM product
            ORDER BY category ASC, company ASC, product_id ASC
            "#,
        )?;

        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 目录条目总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM product", [], |row| row.get(0))?;
        Ok(count)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Product> {
        Ok(Product {
            product_id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            company: row.get(3)?,
        })
    }
}
