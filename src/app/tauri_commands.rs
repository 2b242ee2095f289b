// ==========================================
// 产品评审分配系统 - Tauri 命令（按域拆分）
// ==========================================
// 职责: Tauri 命令定义,连接前端与后端 API
// ==========================================

#![cfg(feature = "tauri-app")]

mod assignment;
mod catalog;
mod common;
mod config;
mod reviewer;
mod round;

pub use assignment::*;
pub use catalog::*;
pub use config::*;
pub use reviewer::*;
pub use round::*;
