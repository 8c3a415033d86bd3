//! 请求处理入口
//!
//! `ReportApi` 持有全部服务，一个方法对应一个接口。
//! 路由框架不在本 crate 内，调用方只需把请求反序列化后交给这里。
//!
//! 错误约定：
//! - 报告类失败写进响应体（`success: false`），不返回 `Err`
//! - 非法路径、非法目录名、缺少必填参数、批处理无法启动返回 `Err`，
//!   用 [`AppError::status_code`] 映射 HTTP 状态码

use crate::api::types::{
    required, ArchiveBuildRequest, ArchiveBuildResponse, CleanupRequest, CleanupResponse,
    DownloadInfo, DownloadQuery, EvaluationQuery, HistoryQuery, HistoryResponse, ProgressQuery,
    ReportQuery, ReportResponse, RunJobResponse, StatusResponse, StudentExamsQuery,
    StudentExamsResponse, StudentInfo, StudentReportQuery, StudentReportResponse,
};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{SheetExtractor, StorageLayout, TenantFolder};
use crate::models::{IntakeStatus, JobOutcome, JobRequest, ProgressSnapshot, StreamedArchive};
use crate::orchestrator::BatchJobRunner;
use crate::services::archive_service::sanitize_download_name;
use crate::services::{check_intake, ArchiveService, HistoryService, ProgressService, ReportService};
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{error, info, warn};

/// 服务入口
pub struct ReportApi {
    layout: StorageLayout,
    runner: BatchJobRunner,
    progress: ProgressService,
    reports: ReportService,
    archives: ArchiveService,
    history: HistoryService,
}

impl ReportApi {
    /// 按配置组装所有服务
    pub fn new(config: &Config) -> Self {
        let layout = StorageLayout::from_config(config);
        let extractor = SheetExtractor::new(config, layout.project_root());
        let runner = BatchJobRunner::new(config, &layout);
        Self::from_parts(
            layout,
            runner,
            extractor,
            config.default_total_students,
            &config.report_sheet_name,
        )
    }

    /// 使用自定义的运行器和提取器组装
    pub fn from_parts(
        layout: StorageLayout,
        runner: BatchJobRunner,
        extractor: SheetExtractor,
        default_total_students: usize,
        report_sheet_name: &str,
    ) -> Self {
        Self {
            progress: ProgressService::new(layout.clone(), extractor.clone(), default_total_students),
            reports: ReportService::new(layout.clone(), extractor, report_sheet_name),
            archives: ArchiveService::new(layout.clone()),
            history: HistoryService::new(layout.clone()),
            runner,
            layout,
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// GET /api/status
    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            status: "ok".to_string(),
            message: "服务器运行正常".to_string(),
        }
    }

    /// GET /api/check-files
    pub async fn check_files(&self) -> IntakeStatus {
        check_intake(&self.layout).await
    }

    /// GET /api/progress
    pub async fn progress(&self, query: &ProgressQuery) -> ProgressSnapshot {
        self.progress.get_progress(&query.tenant_key()).await
    }

    /// POST /api/run-main
    ///
    /// 执行失败和超时都是正常响应，只有进程无法启动才返回错误
    pub async fn run_job(&self, request: &JobRequest) -> AppResult<RunJobResponse> {
        let result = self.runner.run(request).await;
        if result.outcome == JobOutcome::LaunchFailed {
            let message = result.error.unwrap_or(result.message);
            error!("❌ 批处理无法启动: {}", message);
            return Err(AppError::JobLaunch(message));
        }
        Ok(RunJobResponse::from(result))
    }

    /// GET /api/report
    pub async fn report(&self, query: &ReportQuery) -> AppResult<ReportResponse> {
        let folder = query.tenant()?;
        let response = match self.reports.full_report(&folder).await {
            Ok(report) => ReportResponse {
                success: true,
                total_students: Some(report.rows.len()),
                headers: Some(report.headers),
                report: Some(report.rows),
                error: None,
            },
            Err(e) => {
                warn!("[考试 {}] ⚠️ 读取报告失败: {}", folder, e);
                ReportResponse::failure(e)
            }
        };
        Ok(response)
    }

    /// GET /api/grammar-report/:studentId
    pub async fn student_report(&self, query: &StudentReportQuery) -> AppResult<StudentReportResponse> {
        let folder = query.tenant.tenant()?;
        let identifier = query.student_id.trim();

        let response = match self.reports.student_report(&folder, identifier).await {
            Ok(student) => StudentReportResponse {
                success: true,
                report: Some(student.items()),
                student: Some(StudentInfo {
                    name: student
                        .field_containing("姓名")
                        .unwrap_or(identifier)
                        .to_string(),
                    student_id: student
                        .field_containing("学号")
                        .unwrap_or(identifier)
                        .to_string(),
                }),
                error: None,
            },
            Err(e) => {
                warn!("[考试 {}] ⚠️ 读取学生报告失败: {}", folder, e);
                StudentReportResponse::failure(e)
            }
        };
        Ok(response)
    }

    /// GET /api/student-evaluation-report
    pub async fn evaluation_report(&self, query: &EvaluationQuery) -> AppResult<String> {
        let folder = TenantFolder::parse(required(&query.folder_name, "缺少必要参数")?)?;
        let student = required(&query.student_name, "缺少必要参数")?;
        Ok(self.reports.evaluation_report(&folder, student).await?)
    }

    /// GET /api/download-reports
    ///
    /// 报告文件和汇总表格直接写入 `sink`
    pub async fn download_reports<W>(&self, query: &ReportQuery, sink: &mut W) -> AppResult<StreamedArchive>
    where
        W: AsyncWrite + Unpin,
    {
        let folder = query.tenant()?;
        Ok(self.archives.stream_reports(&folder, sink).await?)
    }

    /// POST /api/compress-exam-reports
    pub async fn compress_reports(&self, request: &ArchiveBuildRequest) -> AppResult<ArchiveBuildResponse> {
        let folder = TenantFolder::parse(&request.folder_name)?;
        let handle = self.archives.stage_archive(&folder).await?;
        Ok(ArchiveBuildResponse {
            success: true,
            message: "压缩包创建成功".to_string(),
            file_path: handle.file_path.display().to_string(),
            download_url: handle.download_url,
            file_name: handle.file_name,
            download_id: handle.download_id,
        })
    }

    /// GET /api/download-compressed-file
    pub async fn download_archive<W>(&self, query: &DownloadQuery, sink: &mut W) -> AppResult<DownloadInfo>
    where
        W: AsyncWrite + Unpin,
    {
        let raw_path = required(&query.file_path, "缺少文件路径参数")?;
        let mut file = self.archives.open_staged(Path::new(raw_path)).await?;

        let file_name = sanitize_download_name(
            query
                .file_name
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or("reports.zip"),
        );

        let bytes = tokio::io::copy(&mut file, sink)
            .await
            .map_err(|e| AppError::Other(format!("文件读取失败: {}", e)))?;
        sink.flush()
            .await
            .map_err(|e| AppError::Other(format!("文件读取失败: {}", e)))?;

        info!("📥 已发送压缩文件 {} ({} bytes)", file_name, bytes);
        Ok(DownloadInfo { file_name, bytes })
    }

    /// POST /api/cleanup-compressed-file
    pub async fn cleanup_archive(&self, request: &CleanupRequest) -> AppResult<CleanupResponse> {
        let raw_path = required(&request.file_path, "缺少文件路径参数")?;
        let outcome = self.archives.cleanup(Path::new(raw_path)).await?;
        Ok(CleanupResponse {
            success: true,
            message: outcome.message().to_string(),
        })
    }

    /// GET /api/history-reports
    pub async fn history_reports(&self, query: &HistoryQuery) -> HistoryResponse {
        match self.history.teacher_history(&query.teacher_username).await {
            Ok(reports) => HistoryResponse {
                success: true,
                reports,
                error: None,
            },
            Err(e) => HistoryResponse {
                success: false,
                reports: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    /// GET /api/student-exams
    pub async fn student_exams(&self, query: &StudentExamsQuery) -> StudentExamsResponse {
        match self.history.student_exams(&query.student_name).await {
            Ok(exams) => StudentExamsResponse {
                success: true,
                exams,
                error: None,
            },
            Err(e) => StudentExamsResponse {
                success: false,
                exams: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}
