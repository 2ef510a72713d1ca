/// 日志工具模块
///
/// 提供 tracing 初始化以及日志格式化和输出的辅助函数
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::AppResult;

/// 初始化 tracing 订阅者
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 `debug` 或 `info`。
/// 重复调用是安全的（测试中会多次调用）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str, test_id: u64) -> AppResult<()> {
    let log_header = format!(
        "{}\n答题会话日志 - 试卷 #{} - {}\n{}\n\n",
        "=".repeat(60),
        test_id,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 追加一行到日志文件
pub fn append_log_line(log_file_path: &str, line: &str) -> AppResult<()> {
    use std::io::Write;

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%H:%M:%S"),
        line
    )?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(api_base_url: &str, test_id: u64, flashcard_mode: bool) {
    info!("{}", "=".repeat(60));
    if flashcard_mode {
        info!("🚀 程序启动 - 闪卡模式");
    } else {
        info!("🚀 程序启动 - 答题模式");
    }
    info!("🌐 后端地址: {}", api_base_url);
    info!("📄 试卷 ID: {}", test_id);
    info!("{}", "=".repeat(60));
}

/// 记录试卷加载信息
pub fn log_test_loaded(title: &str, question_count: usize) {
    info!("✓ 试卷已加载: {}", title);
    info!("📋 共 {} 道题目（已随机打乱）", question_count);
}

/// 打印最终统计信息
///
/// # 参数
/// - `answered`: 已作答数量
/// - `total`: 题目总数
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(answered: usize, total: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 会话结束统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已作答: {}/{}", answered, total);
    info!("⏭️ 未作答: {}", total.saturating_sub(answered));
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
