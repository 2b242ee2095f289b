use crate::app::state::AppState;

use super::common::map_api_error;

// ==========================================
// 轮次相关命令
// ==========================================

/// 查询轮次名录
#[tauri::command(rename_all = "snake_case")]
pub async fn list_rounds(state: tauri::State<'_, AppState>) -> Result<String, String> {
    let round_api = state.round_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.list_rounds");
        round_api.list_rounds()
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    serde_json::to_string(&result).map_err(|e| format!("序列化失败: {}", e))
}

/// 查询轮次详情
#[tauri::command(rename_all = "snake_case")]
pub async fn get_round_detail(
    state: tauri::State<'_, AppState>,
    round_id: String,
) -> Result<String, String> {
    let round_api = state.round_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.get_round_detail");
        round_api.round_detail(&round_id)
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    serde_json::to_string(&result).map_err(|e| format!("序列化失败: {}", e))
}

/// 查询轮次中未分配的评审行
#[tauri::command(rename_all = "snake_case")]
pub async fn list_unassigned_products(
    state: tauri::State<'_, AppState>,
    round_id: String,
) -> Result<String, String> {
    let result = state
        .round_api
        .list_unassigned_products(&round_id)
        .map_err(map_api_error)?;

    serde_json::to_string(&result).map_err(|e| format!("序列化失败: {}", e))
}

/// 查询轮次审计流水
#[tauri::command(rename_all = "snake_case")]
pub async fn get_round_history(
    state: tauri::State<'_, AppState>,
    round_id: String,
) -> Result<String, String> {
    let result = state
        .round_api
        .history_for_round(&round_id)
        .map_err(map_api_error)?;

    serde_json::to_string(&result).map_err(|e| format!("序列化失败: {}", e))
}

/// 查询单个产品的审计流水
#[tauri::command(rename_all = "snake_case")]
pub async fn get_product_history(
    state: tauri::State<'_, AppState>,
    round_id: String,
    product_id: String,
) -> Result<String, String> {
    let result = state
        .round_api
        .history_for_product(&round_id, &product_id)
        .map_err(map_api_error)?;

    serde_json::to_string(&result).map_err(|e| format!("序列化失败: {}", e))
}

/// 推进评审状态
#[tauri::command(rename_all = "snake_case")]
pub async fn update_review_status(
    state: tauri::State<'_, AppState>,
    round_id: String,
    product_id: String,
    new_status: String,
    actor: String,
) -> Result<String, String> {
    state
        .round_api
        .update_review_status(&round_id, &product_id, &new_status, &actor)
        .map_err(map_api_error)?;

    Ok("{}".to_string())
}

/// 导出轮次分配结果为 CSV 文本
#[tauri::command(rename_all = "snake_case")]
pub async fn export_round_csv(
    state: tauri::State<'_, AppState>,
    round_id: String,
) -> Result<String, String> {
    let round_api = state.round_api.clone();
    let csv_text = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.export_round_csv");
        round_api.export_round_csv(&round_id)
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    // 前端直接保存文本,不做 JSON 包装
    Ok(csv_text)
}
