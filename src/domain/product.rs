// ==========================================
// 产品评审分配系统 - 产品领域模型
// ==========================================
// 职责: 产品目录读模型
// 红线: 引擎视角下产品只读,目录维护走导入通道
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Product - 产品 (目录条目)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String, // 产品ID
    pub name: String,       // 产品名称
    pub category: String,   // 品类
    pub company: String,    // 厂商
}

impl Product {
    /// 分配遍历用的稳定排序键: 品类 → 厂商 → 产品ID
    pub fn sort_key(&self) -> (&str, &str, &str) {
        (&self.category, &self.company, &self.product_id)
    }
}

// ==========================================
// RawProductRecord - 导入原始行
// ==========================================
// 用途: 目录导入时的中间载体,清洗后转 Product
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProductRecord {
    pub row_no: usize,              // 文件内行号 (1-based,用于报错定位)
    pub product_id: String,         // 产品ID
    pub name: String,               // 产品名称
    pub category: String,           // 品类
    pub company: String,            // 厂商
}
