// ==========================================
// 产品评审分配系统 - 配置管理器
// ==========================================
// 职责: 全局配置的加载与查询
// 存储: config_kv 表 (key-value, scope_id='global')
// 红线: 管理器只读配置;写入走 ConfigApi,保证每次变更可被审计
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::DEFAULT_ROUND_DEADLINE_DAYS;
use crate::engine::notifier::DEFAULT_PRODUCT_NAME_LIMIT;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键常量
// ==========================================

/// config_kv 表中使用的配置键
pub mod config_keys {
    /// 轮次默认截止天数（未显式指定 deadline 时，自创建日起算）
    pub const DEFAULT_DEADLINE_DAYS: &str = "assignment.default_deadline_days";
    /// 分配通知正文中列出的产品名上限，超出部分折叠为“等N项”
    pub const NOTIFY_PRODUCT_NAME_LIMIT: &str = "notify.product_name_limit";
    /// 是否在轮次提交后发送分配通知
    pub const NOTIFY_ENABLED: &str = "notify.enabled";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 参数
    /// - key: 配置键
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 读取配置值，不存在时返回给定默认值
    pub fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 轮次默认截止天数
    ///
    /// 未配置或配置非法（非数字、非正数）时回落到内置默认值。
    pub fn get_default_deadline_days(&self) -> Result<i64, Box<dyn Error>> {
        let days = self
            .get_config_value(config_keys::DEFAULT_DEADLINE_DAYS)?
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_ROUND_DEADLINE_DAYS);
        Ok(days)
    }

    /// 分配通知正文中的产品名上限
    pub fn get_notify_product_name_limit(&self) -> Result<usize, Box<dyn Error>> {
        let limit = self
            .get_config_value(config_keys::NOTIFY_PRODUCT_NAME_LIMIT)?
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PRODUCT_NAME_LIMIT);
        Ok(limit)
    }

    /// 是否发送分配通知（默认开启）
    pub fn get_notify_enabled(&self) -> Result<bool, Box<dyn Error>> {
        let enabled = match self.get_config_value(config_keys::NOTIFY_ENABLED)? {
            Some(v) => match v.trim().to_lowercase().as_str() {
                "true" | "1" | "on" => true,
                "false" | "0" | "off" => false,
                _ => true,
            },
            None => true,
        };
        Ok(enabled)
    }
}
