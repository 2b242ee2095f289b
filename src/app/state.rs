// ==========================================
// 产品评审分配系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{AssignmentApi, CatalogApi, ConfigApi, ReviewerApi, RoundApi};
use crate::config::config_manager::ConfigManager;
use crate::db;
use crate::engine::notifier::{LogNotifier, OptionalNotifier, DEFAULT_PRODUCT_NAME_LIMIT};
use crate::repository::{
    AssignmentHistoryRepository, ProductRepository, ProductReviewRepository,
    ReviewRoundRepository, ReviewerRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
/// 在Tauri应用中作为全局状态管理
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 分配API
    pub assignment_api: Arc<AssignmentApi>,

    /// 评审人API
    pub reviewer_api: Arc<ReviewerApi>,

    /// 轮次API
    pub round_api: Arc<RoundApi>,

    /// 目录API
    pub catalog_api: Arc<CatalogApi>,

    /// 配置API
    pub config_api: Arc<ConfigApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库连接并幂等建表
    /// 2. 初始化所有Repository
    /// 3. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let mut conn =
            db::open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::perf::install_sqlite_tracing(&mut conn);

        // 建表失败即无法工作,直接中止启动
        db::ensure_schema(&conn).map_err(|e| format!("初始化数据库结构失败: {}", e))?;
        match db::read_schema_version(&conn) {
            Ok(Some(v)) if v < db::CURRENT_SCHEMA_VERSION => {
                tracing::warn!(
                    "数据库 schema_version={} 低于当前期望 {},请确认升级路径",
                    v,
                    db::CURRENT_SCHEMA_VERSION
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("读取 schema_version 失败: {}", e),
        }
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================

        let product_repo = Arc::new(ProductRepository::new(conn.clone()));
        let reviewer_repo = Arc::new(ReviewerRepository::new(conn.clone()));
        let round_repo = Arc::new(ReviewRoundRepository::new(conn.clone()));
        let review_repo = Arc::new(ProductReviewRepository::new(conn.clone()));
        let history_repo = Arc::new(AssignmentHistoryRepository::new(conn.clone()));

        // ==========================================
        // 初始化配置与通知
        // ==========================================

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // 通知名单长度读取失败不阻塞启动,退回默认值
        let name_limit = match config_manager.get_notify_product_name_limit() {
            Ok(limit) => limit,
            Err(e) => {
                tracing::warn!("读取通知产品名数量上限失败(使用默认值): {}", e);
                DEFAULT_PRODUCT_NAME_LIMIT
            }
        };
        let notifier = OptionalNotifier::with_notifier(Arc::new(LogNotifier::with_name_limit(
            name_limit,
        )));

        // ==========================================
        // 初始化API层
        // ==========================================

        let assignment_api = Arc::new(AssignmentApi::new(
            product_repo.clone(),
            reviewer_repo.clone(),
            review_repo.clone(),
            round_repo.clone(),
            config_manager.clone(),
            notifier,
        ));

        let reviewer_api = Arc::new(ReviewerApi::new(reviewer_repo.clone(), review_repo.clone()));

        let round_api = Arc::new(RoundApi::new(
            round_repo,
            review_repo,
            history_repo,
            product_repo.clone(),
            reviewer_repo,
        ));

        let catalog_api = Arc::new(CatalogApi::new(product_repo));

        let config_api = Arc::new(ConfigApi::new(conn));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            assignment_api,
            reviewer_api,
            round_api,
            catalog_api,
            config_api,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 开发环境: 用户数据目录/product-review-assign-dev/product_review_assign.db（首次运行会从项目根目录的 ./product_review_assign.db 复制一份作为初始数据）
/// - 生产环境: 用户数据目录/product-review-assign/product_review_assign.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("PRODUCT_REVIEW_ASSIGN_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    // 使用用户数据目录，避免开发期 DB 文件变化触发 `tauri dev` 的文件监控重启（看起来像“闪退重启”）。
    // 先给一个默认回退值，后续如果能拿到 data_dir 再覆盖。
    let mut path = PathBuf::from("./product_review_assign.db");

    // 尝试获取用户数据目录
    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("product-review-assign-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("product-review-assign");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("product_review_assign.db");

        // 开发环境：如果目标 DB 不存在，但项目根目录有初始 DB，则复制一份作为种子数据
        #[cfg(debug_assertions)]
        {
            if !path.exists() {
                let seed = PathBuf::from("./product_review_assign.db");
                if seed.exists() {
                    // best-effort: 复制失败不应阻塞启动（后续会自动创建空库并建表）
                    let _ = std::fs::copy(seed, &path);
                }
            }
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_bootstraps_schema() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let db_path = dir.path().join("state_test.db");

        let state = AppState::new(db_path.to_string_lossy().to_string()).expect("初始化失败");

        // 空库启动后目录与轮次查询即可用
        assert_eq!(state.catalog_api.count_products().expect("查询失败"), 0);
        assert!(state.round_api.list_rounds().expect("查询失败").is_empty());
    }
}
