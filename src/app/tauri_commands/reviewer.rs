use crate::app::state::AppState;

use super::common::map_api_error;

// ==========================================
// 评审人相关命令
// ==========================================

/// 登记评审人
#[tauri::command(rename_all = "snake_case")]
pub async fn create_reviewer(
    state: tauri::State<'_, AppState>,
    reviewer_id: String,
    display_name: String,
    email: String,
) -> Result<String, String> {
    let result = state
        .reviewer_api
        .create_reviewer(&reviewer_id, &display_name, &email)
        .map_err(map_api_error)?;

    serde_json::to_string(&result).map_err(|e| format!("序列化失败: {}", e))
}

/// 查询评审人名录（带在途工作量）
#[tauri::command(rename_all = "snake_case")]
pub async fn list_reviewers(state: tauri::State<'_, AppState>) -> Result<String, String> {
    let reviewer_api = state.reviewer_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.list_reviewers");
        reviewer_api.list_reviewers()
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    serde_json::to_string(&result).map_err(|e| format!("序列化失败: {}", e))
}

/// 声明/更新评审人专长
#[tauri::command(rename_all = "snake_case")]
pub async fn add_expertise(
    state: tauri::State<'_, AppState>,
    reviewer_id: String,
    scope: String,
    expertise_key: String,
    priority: i32,
) -> Result<String, String> {
    let result = state
        .reviewer_api
        .add_expertise(&reviewer_id, &scope, &expertise_key, priority)
        .map_err(map_api_error)?;

    serde_json::to_string(&result).map_err(|e| format!("序列化失败: {}", e))
}

/// 移除评审人专长
#[tauri::command(rename_all = "snake_case")]
pub async fn remove_expertise(
    state: tauri::State<'_, AppState>,
    reviewer_id: String,
    scope: String,
    expertise_key: String,
) -> Result<String, String> {
    state
        .reviewer_api
        .remove_expertise(&reviewer_id, &scope, &expertise_key)
        .map_err(map_api_error)?;

    Ok("{}".to_string())
}

/// 查询评审人的专长声明
#[tauri::command(rename_all = "snake_case")]
pub async fn list_expertise(
    state: tauri::State<'_, AppState>,
    reviewer_id: String,
) -> Result<String, String> {
    let result = state
        .reviewer_api
        .list_expertise(&reviewer_id)
        .map_err(map_api_error)?;

    serde_json::to_string(&result).map_err(|e| format!("序列化失败: {}", e))
}
