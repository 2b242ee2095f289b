use crate::app::state::AppState;
use crate::engine::AssignmentPreview;

use super::common::{emit_frontend_event, map_api_error, parse_date};

// ==========================================
// 分配相关命令
// ==========================================

/// 计算分配预览（不落库）
#[tauri::command(rename_all = "snake_case")]
pub async fn preview_assignments(
    state: tauri::State<'_, AppState>,
    product_ids: Vec<String>,
    reviewer_ids: Vec<String>,
) -> Result<String, String> {
    let assignment_api = state.assignment_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.preview_assignments");
        assignment_api.preview_assignments(&product_ids, &reviewer_ids)
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    serde_json::to_string(&result).map_err(|e| format!("序列化失败: {}", e))
}

/// 提交分配预览,创建评审轮次
#[tauri::command(rename_all = "snake_case")]
pub async fn commit_assignments(
    app: tauri::AppHandle,
    state: tauri::State<'_, AppState>,
    preview: String,
    round_name: String,
    deadline: Option<String>,
    actor: String,
) -> Result<String, String> {
    let preview: AssignmentPreview =
        serde_json::from_str(&preview).map_err(|e| format!("解析分配预览失败: {}", e))?;
    let deadline = match deadline.as_deref() {
        Some(s) if !s.trim().is_empty() => Some(parse_date(s.trim())?),
        _ => None,
    };

    let result = state
        .assignment_api
        .commit_assignments(&preview, &round_name, deadline, &actor)
        .await
        .map_err(map_api_error)?;

    emit_frontend_event(
        &app,
        "round_committed",
        serde_json::json!({ "round_id": result.round_id, "round_no": result.round_no }),
    );
    serde_json::to_string(&result).map_err(|e| format!("序列化失败: {}", e))
}

/// 把一条评审行改派给新评审人
#[tauri::command(rename_all = "snake_case")]
pub async fn reassign_product(
    state: tauri::State<'_, AppState>,
    round_id: String,
    product_id: String,
    new_reviewer_id: String,
    actor: String,
    reason: Option<String>,
) -> Result<String, String> {
    state
        .assignment_api
        .reassign_product(&round_id, &product_id, &new_reviewer_id, &actor, reason)
        .map_err(map_api_error)?;

    Ok("{}".to_string())
}

/// 取消一条评审行的分配
#[tauri::command(rename_all = "snake_case")]
pub async fn unassign_product(
    state: tauri::State<'_, AppState>,
    round_id: String,
    product_id: String,
    actor: String,
    reason: Option<String>,
) -> Result<String, String> {
    state
        .assignment_api
        .unassign_product(&round_id, &product_id, &actor, reason)
        .map_err(map_api_error)?;

    Ok("{}".to_string())
}
