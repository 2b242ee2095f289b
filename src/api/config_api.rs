// ==========================================
// 产品评审分配系统 - 配置API
// ==========================================
// 职责: 配置查询与更新 (config_kv 表)
// 红线: 已知键的取值先校验再落库;变更必须带操作人并记结构化日志
// ==========================================

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::validate_non_empty;
use crate::config::config_keys;

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// DTO 类型定义
// ==========================================

/// 配置项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigItem {
    pub scope_id: String,
    pub key: String,
    pub value: String,
}

// ==========================================
// ConfigApi - 配置API
// ==========================================
pub struct ConfigApi {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigApi {
    /// 创建新的 ConfigApi 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("锁获取失败: {}", e)))
    }

    /// 查询全部配置,按作用域/键排序
    pub fn list_configs(&self) -> ApiResult<Vec<ConfigItem>> {
        let conn = self.get_conn()?;

        let mut stmt = conn
            .prepare("SELECT scope_id, key, value FROM config_kv ORDER BY scope_id, key")
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        let configs = stmt
            .query_map([], |row| {
                Ok(ConfigItem {
                    scope_id: row.get(0)?,
                    key: row.get(1)?,
                    value: row.get(2)?,
                })
            })
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        Ok(configs)
    }

    /// 查询单个全局配置,不存在返回 None
    pub fn get_config(&self, key: &str) -> ApiResult<Option<ConfigItem>> {
        validate_non_empty(key, "配置键")?;
        let conn = self.get_conn()?;

        let result = conn.query_row(
            "SELECT scope_id, key, value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key.trim()],
            |row| {
                Ok(ConfigItem {
                    scope_id: row.get(0)?,
                    key: row.get(1)?,
                    value: row.get(2)?,
                })
            },
        );

        match result {
            Ok(config) => Ok(Some(config)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ApiError::DatabaseError(e.to_string())),
        }
    }

    /// 更新全局配置 (UPSERT)
    ///
    /// 已知键先做取值校验,未知键按原样保存。
    ///
    /// # 参数
    /// - key: 配置键
    /// - value: 配置值
    /// - operator: 操作人
    pub fn update_config(&self, key: &str, value: &str, operator: &str) -> ApiResult<()> {
        validate_non_empty(key, "配置键")?;
        validate_non_empty(value, "配置值")?;
        validate_non_empty(operator, "操作人")?;

        let key = key.trim();
        let value = value.trim();
        Self::validate_known_value(key, value)?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')
            "#,
            params![GLOBAL_SCOPE, key, value],
        )
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        info!(key = %key, value = %value, operator = %operator, "配置已更新");
        Ok(())
    }

    /// 已知配置键的取值校验
    fn validate_known_value(key: &str, value: &str) -> ApiResult<()> {
        match key {
            config_keys::DEFAULT_DEADLINE_DAYS => {
                if value.parse::<i64>().ok().filter(|d| *d > 0).is_none() {
                    return Err(ApiError::ValidationError(format!(
                        "配置 {} 需要正整数,收到: {}",
                        key, value
                    )));
                }
            }
            config_keys::NOTIFY_PRODUCT_NAME_LIMIT => {
                if value.parse::<usize>().ok().filter(|n| *n > 0).is_none() {
                    return Err(ApiError::ValidationError(format!(
                        "配置 {} 需要正整数,收到: {}",
                        key, value
                    )));
                }
            }
            config_keys::NOTIFY_ENABLED => {
                let normalized = value.to_lowercase();
                if !matches!(
                    normalized.as_str(),
                    "true" | "1" | "on" | "false" | "0" | "off"
                ) {
                    return Err(ApiError::ValidationError(format!(
                        "配置 {} 需要布尔值,收到: {}",
                        key, value
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;

    fn setup() -> (ConfigApi, Arc<Mutex<Connection>>) {
        let conn = Connection::open_in_memory().expect("打开内存库失败");
        crate::db::configure_sqlite_connection(&conn).expect("配置失败");
        crate::db::ensure_schema(&conn).expect("建表失败");
        let conn = Arc::new(Mutex::new(conn));
        (ConfigApi::new(conn.clone()), conn)
    }

    #[test]
    fn test_update_and_get_roundtrip() {
        let (api, conn) = setup();

        assert!(api
            .get_config(config_keys::DEFAULT_DEADLINE_DAYS)
            .expect("查询失败")
            .is_none());

        api.update_config(config_keys::DEFAULT_DEADLINE_DAYS, "21", "admin")
            .expect("更新失败");
        let item = api
            .get_config(config_keys::DEFAULT_DEADLINE_DAYS)
            .expect("查询失败")
            .expect("配置应存在");
        assert_eq!(item.scope_id, "global");
        assert_eq!(item.value, "21");

        // ConfigManager 能读到同一份配置
        let manager = ConfigManager::from_connection(conn).expect("构造失败");
        assert_eq!(manager.get_default_deadline_days().expect("读取失败"), 21);
    }

    #[test]
    fn test_update_overwrites_existing_value() {
        let (api, _conn) = setup();

        api.update_config(config_keys::NOTIFY_PRODUCT_NAME_LIMIT, "5", "admin")
            .expect("更新失败");
        api.update_config(config_keys::NOTIFY_PRODUCT_NAME_LIMIT, "8", "admin")
            .expect("更新失败");

        let configs = api.list_configs().expect("查询失败");
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].value, "8");
    }

    #[test]
    fn test_update_validates_known_keys() {
        let (api, _conn) = setup();

        assert!(matches!(
            api.update_config(config_keys::DEFAULT_DEADLINE_DAYS, "两周", "admin")
                .unwrap_err(),
            ApiError::ValidationError(_)
        ));
        assert!(matches!(
            api.update_config(config_keys::DEFAULT_DEADLINE_DAYS, "-3", "admin")
                .unwrap_err(),
            ApiError::ValidationError(_)
        ));
        assert!(matches!(
            api.update_config(config_keys::NOTIFY_ENABLED, "说不准", "admin")
                .unwrap_err(),
            ApiError::ValidationError(_)
        ));

        // 未知键不校验取值
        api.update_config("ui.theme", "dark", "admin")
            .expect("未知键应按原样保存");
    }

    #[test]
    fn test_list_configs_sorted_by_key() {
        let (api, _conn) = setup();

        api.update_config(config_keys::NOTIFY_ENABLED, "off", "admin")
            .expect("更新失败");
        api.update_config(config_keys::DEFAULT_DEADLINE_DAYS, "14", "admin")
            .expect("更新失败");

        let keys: Vec<String> = api
            .list_configs()
            .expect("查询失败")
            .into_iter()
            .map(|c| c.key)
            .collect();
        assert_eq!(
            keys,
            vec![
                config_keys::DEFAULT_DEADLINE_DAYS.to_string(),
                config_keys::NOTIFY_ENABLED.to_string(),
            ]
        );
    }
}
