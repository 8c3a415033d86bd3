use serde::Serialize;
use std::path::PathBuf;

/// 暂存压缩包的下载句柄
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveHandle {
    /// 压缩包绝对路径（位于临时目录内）
    pub file_path: PathBuf,
    pub file_name: String,
    /// 本次打包生成的下载标识
    pub download_id: String,
    pub download_url: String,
    pub size_bytes: u64,
}

/// 直接写入调用方的压缩包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamedArchive {
    pub file_name: String,
    pub entries: usize,
    pub bytes_written: u64,
}

/// 清理结果，两种都算成功
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Removed,
    AlreadyAbsent,
}

impl CleanupOutcome {
    pub fn message(self) -> &'static str {
        match self {
            CleanupOutcome::Removed => "压缩文件清理成功",
            CleanupOutcome::AlreadyAbsent => "压缩文件不存在，无需清理",
        }
    }
}
