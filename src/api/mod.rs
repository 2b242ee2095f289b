// ==========================================
// 产品评审分配系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供 Tauri 命令调用
// ==========================================

pub mod error;
pub mod assignment_api;
pub mod catalog_api;
pub mod config_api;
pub mod reviewer_api;
pub mod round_api;
pub mod validator;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use assignment_api::{AssignmentApi, CommitRoundResponse};
pub use catalog_api::CatalogApi;
pub use config_api::{ConfigApi, ConfigItem};
pub use reviewer_api::ReviewerApi;
pub use round_api::{RoundApi, RoundDetailResponse, RoundSummary};
