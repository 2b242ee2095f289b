fn main() {
    // 桌面壳为可选特性，未开启 tauri-app 时跳过 Tauri 构建步骤
    if std::env::var("CARGO_FEATURE_TAURI_APP").is_ok() {
        tauri_build::build();
    }
}
