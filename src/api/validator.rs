// ==========================================
// 产品评审分配系统 - 请求入参校验
// ==========================================
// 职责: 公共入参的形状校验(空值/重复/越界/未知枚举)
// 红线: 校验只读,失败不得留下任何部分副作用
// ==========================================

use std::collections::HashSet;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::reviewer::{ExpertiseEntry, EXPERTISE_PRIORITY_MAX, EXPERTISE_PRIORITY_MIN};
use crate::domain::types::ExpertiseScope;

/// 校验单个字符串参数非空
///
/// # 参数
/// - value: 待校验值
/// - label: 参数名 (用于错误消息)
pub fn validate_non_empty(value: &str, label: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", label)));
    }
    Ok(())
}

/// 校验ID列表的条目: 无空白项、无重复项
///
/// 列表是否允许为空由调用方决定,此处不做空集检查
pub fn validate_id_entries(ids: &[String], label: &str) -> ApiResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(ApiError::ValidationError(format!(
                "{}列表包含空白ID",
                label
            )));
        }
        if !seen.insert(id.as_str()) {
            return Err(ApiError::ValidationError(format!(
                "{}列表包含重复ID: {}",
                label, id
            )));
        }
    }
    Ok(())
}

/// 解析专长范围字符串 (大小写不敏感)
pub fn validate_scope(scope: &str) -> ApiResult<ExpertiseScope> {
    ExpertiseScope::from_str(scope)
        .ok_or_else(|| ApiError::ValidationError(format!("未知的专长范围: {}", scope)))
}

/// 校验专长声明入参: 范围可解析,优先级落在 [1, 10]
///
/// # 返回
/// - Ok(ExpertiseScope): 解析后的专长范围
/// - Err(ApiError::ValidationError): 未知范围或优先级越界
pub fn validate_expertise_input(scope: &str, priority: i32) -> ApiResult<ExpertiseScope> {
    let parsed = validate_scope(scope)?;

    if !ExpertiseEntry::priority_in_range(priority) {
        return Err(ApiError::ValidationError(format!(
            "专长优先级越界: {} (合法区间 [{}, {}])",
            priority, EXPERTISE_PRIORITY_MIN, EXPERTISE_PRIORITY_MAX
        )));
    }

    Ok(parsed)
}
