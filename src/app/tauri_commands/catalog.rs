use crate::app::state::AppState;

use super::common::{emit_frontend_event, map_api_error};

// ==========================================
// 目录相关命令
// ==========================================

/// 从文件导入产品目录
#[tauri::command(rename_all = "snake_case")]
pub async fn import_catalog(
    app: tauri::AppHandle,
    state: tauri::State<'_, AppState>,
    file_path: String,
    operator: String,
) -> Result<String, String> {
    let catalog_api = state.catalog_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.import_catalog");
        catalog_api.import_catalog_file(&file_path, &operator)
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    emit_frontend_event(
        &app,
        "catalog_changed",
        serde_json::json!({
            "inserted": result.inserted,
            "overwritten": result.overwritten,
        }),
    );
    serde_json::to_string(&result).map_err(|e| format!("序列化失败: {}", e))
}

/// 查询产品目录名录
#[tauri::command(rename_all = "snake_case")]
pub async fn list_products(state: tauri::State<'_, AppState>) -> Result<String, String> {
    let catalog_api = state.catalog_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.list_products");
        catalog_api.list_products()
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    serde_json::to_string(&result).map_err(|e| format!("序列化失败: {}", e))
}
