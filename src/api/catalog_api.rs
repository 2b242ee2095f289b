// ==========================================
// 产品评审分配系统 - 目录API
// ==========================================
// 职责: 产品目录的文件导入与名录查询
// 红线: 导入只动目录表,历史轮次的评审行一律不回写
// ==========================================

use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::validator::validate_non_empty;
use crate::domain::Product;
use crate::engine::importer::{CatalogImporter, ImportSummary};
use crate::repository::ProductRepository;

// ==========================================
// CatalogApi - 目录API
// ==========================================
pub struct CatalogApi {
    product_repo: Arc<ProductRepository>,
    importer: CatalogImporter,
}

impl CatalogApi {
    /// 创建新的 CatalogApi 实例
    pub fn new(product_repo: Arc<ProductRepository>) -> Self {
        let importer = CatalogImporter::new(product_repo.clone());
        Self {
            product_repo,
            importer,
        }
    }

    /// 从目录文件导入产品 (.csv / .xlsx)
    ///
    /// 按 product_id 覆盖写入,行级失败记入汇总的 failures,不中断其余行。
    ///
    /// # 参数
    /// - file_path: 目录文件路径
    /// - operator: 操作人
    pub fn import_catalog_file(
        &self,
        file_path: &str,
        operator: &str,
    ) -> ApiResult<ImportSummary> {
        validate_non_empty(file_path, "文件路径")?;
        validate_non_empty(operator, "操作人")?;

        Ok(self.importer.import_file(file_path.trim(), operator.trim())?)
    }

    /// 当前目录全量名录,按品类/厂商/ID 排序
    pub fn list_products(&self) -> ApiResult<Vec<Product>> {
        Ok(self.product_repo.list_all()?)
    }

    /// 目录条目总数
    pub fn count_products(&self) -> ApiResult<i64> {
        Ok(self.product_repo.count()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use rusqlite::Connection;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::Builder;

    fn setup() -> CatalogApi {
        let conn = Connection::open_in_memory().expect("打开内存库失败");
        crate::db::configure_sqlite_connection(&conn).expect("配置失败");
        crate::db::ensure_schema(&conn).expect("建表失败");
        let repo = Arc::new(ProductRepository::new(Arc::new(Mutex::new(conn))));
        CatalogApi::new(repo)
    }

    fn write_csv(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("创建临时文件失败");
        for line in lines {
            writeln!(file, "{}", line).expect("写入失败");
        }
        file
    }

    #[test]
    fn test_import_requires_path_and_operator() {
        let api = setup();

        assert!(matches!(
            api.import_catalog_file("  ", "admin").unwrap_err(),
            ApiError::InvalidInput(_)
        ));
        assert!(matches!(
            api.import_catalog_file("目录.csv", "").unwrap_err(),
            ApiError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_import_then_list_products() {
        let api = setup();
        let file = write_csv(&[
            "product_id,name,category,company",
            "P-2,调强放疗模块,规划软件,瑞康科技",
            "P-1,质子治疗计划系统,规划软件,华仪医疗",
        ]);

        let summary = api
            .import_catalog_file(file.path().to_str().unwrap(), "admin")
            .expect("导入失败");
        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.failed, 0);

        let products = api.list_products().expect("查询目录失败");
        assert_eq!(products.len(), 2);
        // 同品类按厂商排序
        assert_eq!(products[0].product_id, "P-1");
        assert_eq!(products[1].product_id, "P-2");
        assert_eq!(api.count_products().expect("计数失败"), 2);
    }

    #[test]
    fn test_import_missing_file_reports_import_error() {
        let api = setup();

        let err = api
            .import_catalog_file("/不存在/产品目录.csv", "admin")
            .unwrap_err();
        match err {
            ApiError::ImportError(msg) => assert!(msg.contains("产品目录.csv")),
            other => panic!("期望 ImportError,实际 {:?}", other),
        }
    }
}
