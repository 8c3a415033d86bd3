/// 日志工具模块
///
/// 提供日志初始化、运行日志文件和输出预览的辅助函数
use crate::models::JobResult;
use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::time::SystemTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 日志和接口统一使用的本地时间格式
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 本地时间 `YYYY-MM-DD HH:MM:SS`
pub fn format_time(time: SystemTime) -> String {
    chrono::DateTime::<chrono::Local>::from(time)
        .format(TIME_FORMAT)
        .to_string()
}

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；否则默认 info，详细模式下为 debug
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n报告批处理日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format(TIME_FORMAT),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 追加一条作业结果记录
///
/// # 参数
/// - `log_file_path`: 日志文件路径
/// - `tenant`: 考试文件夹名称
/// - `result`: 作业结果
pub fn append_job_summary(log_file_path: &str, tenant: &str, result: &JobResult) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    let line = format!(
        "{} | {} | {:?} | 退出码 {:?} | {}\n",
        chrono::Local::now().format(TIME_FORMAT),
        tenant,
        result.outcome,
        result.exit_code,
        result.message
    );
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(tenant: &str, timeout_secs: u64) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 报告批处理模式");
    info!("📁 考试文件夹: {}", tenant);
    info!("⏱️ 超时时间: {} 秒", timeout_secs);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(result: &JobResult, current: usize, total: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format(TIME_FORMAT)
    );
    info!("{}", "=".repeat(60));
    if result.succeeded() {
        info!("✅ {}", result.message);
    } else {
        info!("❌ {} ({:?})", result.message, result.outcome);
    }
    info!("📄 已生成报告: {}/{}", current, total);
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
