//! 上传文件检查服务 - 业务能力层
//!
//! 只负责检查收件目录中固定文件名的上传文件是否就绪，不接收上传

use crate::infrastructure::StorageLayout;
use crate::models::IntakeStatus;
use crate::utils::logging::format_time;
use tracing::debug;

/// 检查收件目录中的源文档和学生名单
pub async fn check_intake(layout: &StorageLayout) -> IntakeStatus {
    let pdf_path = layout.source_document();
    let excel_path = layout.roster_sheet();

    let pdf_meta = tokio::fs::metadata(&pdf_path).await.ok().filter(|m| m.is_file());
    let excel_exists = tokio::fs::metadata(&excel_path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);

    let timestamp = pdf_meta
        .as_ref()
        .and_then(|m| m.modified().ok())
        .map(format_time);

    let status = IntakeStatus {
        pdf_exists: pdf_meta.is_some(),
        excel_exists,
        pdf_path,
        excel_path,
        timestamp,
    };
    debug!(
        "上传文件状态: PDF {} | Excel {}",
        status.pdf_exists, status.excel_exists
    );
    status
}
