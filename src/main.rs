// ==========================================
// 产品评审分配系统 - Tauri 主入口
// ==========================================
// 技术栈: Tauri + Rust + SQLite
// ==========================================

// 禁止控制台窗口 (Windows)
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(feature = "tauri-app")]
fn main() {
    use product_review_assign::app::tauri_commands::*;
    use product_review_assign::app::{get_default_db_path, AppState};

    // 初始化日志系统
    product_review_assign::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", product_review_assign::APP_NAME);
    tracing::info!("系统版本: {}", product_review_assign::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    // 创建AppState
    tracing::info!("正在初始化AppState...");
    let app_state = AppState::new(db_path).expect("无法初始化AppState");

    tracing::info!("AppState初始化成功");
    tracing::info!("启动Tauri应用...");

    // 启动Tauri应用
    tauri::Builder::default()
        .manage(app_state)
        .invoke_handler(tauri::generate_handler![
            // ==========================================
            // 目录相关命令 (2个)
            // ==========================================
            import_catalog,
            list_products,
            // ==========================================
            // 评审人相关命令 (5个)
            // ==========================================
            create_reviewer,
            list_reviewers,
            add_expertise,
            remove_expertise,
            list_expertise,
            // ==========================================
            // 分配相关命令 (4个)
            // ==========================================
            preview_assignments,
            commit_assignments,
            reassign_product,
            unassign_product,
            // ==========================================
            // 轮次相关命令 (7个)
            // ==========================================
            list_rounds,
            get_round_detail,
            list_unassigned_products,
            get_round_history,
            get_product_history,
            update_review_status,
            export_round_csv,
            // ==========================================
            // 配置管理相关命令 (3个)
            // ==========================================
            list_configs,
            get_config,
            update_config,
        ])
        .run(tauri::generate_context!())
        .expect("启动Tauri应用失败");

    tracing::info!("Tauri应用已退出");
}

#[cfg(not(feature = "tauri-app"))]
fn main() {
    println!("==================================================");
    println!("{}", product_review_assign::APP_NAME);
    println!("系统版本: {}", product_review_assign::VERSION);
    println!("==================================================");
    println!();
    println!("此可执行文件需要启用 tauri-app 特性");
    println!("使用: cargo run --features tauri-app");
    println!();
    println!("或者使用库模式:");
    println!("use product_review_assign::app::AppState;");
    println!();
    println!("示例数据可通过 seed_demo_data 写入:");
    println!("cargo run --bin seed_demo_data");
}
