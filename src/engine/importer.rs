// ==========================================
// 产品评审分配系统 - 目录导入引擎
// ==========================================
// 职责: CSV/Excel 产品目录解析 + 行级校验 + 按 product_id 覆盖入库
// 红线: 行级失败只记录不中断;目录写入只走 ProductRepository
// ==========================================

use calamine::{open_workbook, Data, Reader, Xlsx};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::domain::product::{Product, RawProductRecord};
use crate::repository::ProductRepository;

/// 目录导入错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("不支持的文件格式: {0}")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// ==========================================
// 导入结果
// ==========================================
/// 行级失败记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRowFailure {
    pub row_no: usize,              // 文件内行号 (表头为第1行)
    pub product_id: Option<String>, // 主键缺失时为 None
    pub reason: String,
}

/// 导入汇总
///
/// inserted/overwritten 只统计实际落库的行,failed 与 failures 一一对应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub inserted: usize,
    pub overwritten: usize,
    pub failed: usize,
    pub failures: Vec<ImportRowFailure>,
}

// ==========================================
// CatalogImporter - 目录导入引擎
// ==========================================
/// 产品目录导入引擎
///
/// # 职责
/// 1. 解析 CSV/Excel 文件 (固定列序: product_id, name, category, company)
/// 2. 行级校验 (主键非空且文件内唯一,三要素齐全)
/// 3. 按 product_id 覆盖写入目录
///
/// # 红线
/// - 单行失败只记入 failures,不中断其余行
/// - 不触碰评审轮次与分配数据
pub struct CatalogImporter {
    products: Arc<ProductRepository>,
}

impl CatalogImporter {
    pub fn new(products: Arc<ProductRepository>) -> Self {
        Self { products }
    }

    /// 从目录文件导入产品(主入口)
    ///
    /// # 参数
    /// - file_path: 目录文件路径 (.csv / .xlsx)
    /// - operator: 操作人
    ///
    /// # 返回
    /// - ImportSummary: 导入汇总(新增/覆盖/失败行)
    ///
    /// # 流程
    /// 1. 检查文件存在与扩展名
    /// 2. 解析为 Vec<RawProductRecord>
    /// 3. 逐行校验并 upsert
    #[instrument(skip(self), fields(file = %file_path, operator = %operator))]
    pub fn import_file(
        &self,
        file_path: &str,
        operator: &str,
    ) -> Result<ImportSummary, ImportError> {
        let start = std::time::Instant::now();

        let path = Path::new(file_path);
        if !path.exists() {
            return Err(ImportError::FileNotFound(file_path.to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        let records = match ext.as_str() {
            "csv" => self.parse_csv(path)?,
            "xlsx" => self.parse_xlsx(path)?,
            _ => return Err(ImportError::UnsupportedFormat(ext)),
        };

        let summary = self.validate_and_store(records);

        info!(
            total_rows = summary.total_rows,
            inserted = summary.inserted,
            overwritten = summary.overwritten,
            failed = summary.failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "目录导入完成"
        );
        Ok(summary)
    }

    /// 解析CSV文件
    ///
    /// 首行为表头,数据行号从2起;完全空白的行跳过
    fn parse_csv(&self, path: &Path) -> Result<Vec<RawProductRecord>, ImportError> {
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let mut records = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            let raw = RawProductRecord {
                row_no: row_idx + 2,
                product_id: Self::get_field(&record, 0),
                name: Self::get_field(&record, 1),
                category: Self::get_field(&record, 2),
                company: Self::get_field(&record, 3),
            };
            if Self::is_blank(&raw) {
                continue;
            }
            records.push(raw);
        }

        Ok(records)
    }

    /// 解析Excel文件(只读第一个工作表)
    fn parse_xlsx(&self, path: &Path) -> Result<Vec<RawProductRecord>, ImportError> {
        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e: calamine::XlsxError| ImportError::ExcelParseError(e.to_string()))?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        let mut rows = range.rows();
        if rows.next().is_none() {
            return Err(ImportError::ExcelParseError(
                "Excel 文件无数据行".to_string(),
            ));
        }

        let mut records = Vec::new();
        for (row_idx, data_row) in rows.enumerate() {
            let raw = RawProductRecord {
                row_no: row_idx + 2,
                product_id: Self::get_cell(data_row, 0),
                name: Self::get_cell(data_row, 1),
                category: Self::get_cell(data_row, 2),
                company: Self::get_cell(data_row, 3),
            };
            if Self::is_blank(&raw) {
                continue;
            }
            records.push(raw);
        }

        Ok(records)
    }

    /// 逐行校验并写入目录
    ///
    /// # 校验规则
    /// 1. product_id 非空且文件内唯一
    /// 2. name/category/company 齐全 (品类厂商参与专长匹配,缺失即废行)
    fn validate_and_store(&self, records: Vec<RawProductRecord>) -> ImportSummary {
        let mut summary = ImportSummary {
            total_rows: records.len(),
            ..Default::default()
        };
        let mut seen_ids = HashSet::new();

        for record in records {
            if record.product_id.is_empty() {
                summary.failures.push(ImportRowFailure {
                    row_no: record.row_no,
                    product_id: None,
                    reason: "主键缺失: product_id 为空".to_string(),
                });
                continue;
            }
            if !seen_ids.insert(record.product_id.clone()) {
                summary.failures.push(ImportRowFailure {
                    row_no: record.row_no,
                    product_id: Some(record.product_id.clone()),
                    reason: format!("主键重复: {}", record.product_id),
                });
                continue;
            }
            if let Some(field) = Self::missing_field(&record) {
                summary.failures.push(ImportRowFailure {
                    row_no: record.row_no,
                    product_id: Some(record.product_id.clone()),
                    reason: format!("字段缺失: {}", field),
                });
                continue;
            }

            let product = Product {
                product_id: record.product_id.clone(),
                name: record.name,
                category: record.category,
                company: record.company,
            };
            match self.products.upsert(&product) {
                Ok(true) => summary.inserted += 1,
                Ok(false) => summary.overwritten += 1,
                Err(e) => {
                    warn!(
                        product_id = %product.product_id,
                        error = %e,
                        "目录条目写入失败"
                    );
                    summary.failures.push(ImportRowFailure {
                        row_no: record.row_no,
                        product_id: Some(product.product_id.clone()),
                        reason: format!("写入失败: {}", e),
                    });
                }
            }
        }

        summary.failed = summary.failures.len();
        summary
    }

    fn missing_field(record: &RawProductRecord) -> Option<&'static str> {
        if record.name.is_empty() {
            Some("name")
        } else if record.category.is_empty() {
            Some("category")
        } else if record.company.is_empty() {
            Some("company")
        } else {
            None
        }
    }

    fn is_blank(record: &RawProductRecord) -> bool {
        record.product_id.is_empty()
            && record.name.is_empty()
            && record.category.is_empty()
            && record.company.is_empty()
    }

    // ==========================================
    // 辅助方法: 字段解析
    // ==========================================

    fn get_field(record: &csv::StringRecord, index: usize) -> String {
        record
            .get(index)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    fn get_cell(row: &[Data], index: usize) -> String {
        row.get(index)
            .map(|cell| cell.to_string().trim().to_string())
            .unwrap_or_default()
    }
}
