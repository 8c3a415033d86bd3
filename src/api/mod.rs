//! API 模块
//!
//! 负责请求 / 响应的形状和错误约定，不包含路由框架

pub mod handlers;
pub mod types;

// 重新导出常用类型
pub use handlers::ReportApi;
pub use types::{
    ArchiveBuildRequest, ArchiveBuildResponse, CleanupRequest, CleanupResponse, DownloadInfo,
    DownloadQuery, EvaluationQuery, HistoryQuery, HistoryResponse, ProgressQuery, ReportQuery,
    ReportResponse, RunJobResponse, StatusResponse, StudentExamsQuery, StudentExamsResponse,
    StudentInfo, StudentReportQuery, StudentReportResponse,
};
