//! 请求 / 响应结构
//!
//! 字段名与前端约定一致（camelCase），路由层直接序列化即可

use crate::error::{AppError, AppResult};
use crate::infrastructure::{TenantFolder, TenantKey};
use crate::models::{HistoryEntry, JobOutcome, JobResult, ReportItem, ReportRow, StudentExamEntry};
use serde::{Deserialize, Serialize};

/// 进度查询
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    #[serde(default)]
    pub exam_name: String,
    #[serde(default)]
    pub teacher_username: String,
}

impl ProgressQuery {
    pub fn tenant_key(&self) -> TenantKey {
        TenantKey::new(self.exam_name.as_str(), self.teacher_username.as_str())
    }
}

/// 运行批处理的响应
///
/// 批处理执行失败或超时也是正常响应，`success` 为 false
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunJobResponse {
    pub success: bool,
    pub outcome: JobOutcome,
    pub message: String,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub exit_code: Option<i32>,
}

impl From<JobResult> for RunJobResponse {
    fn from(result: JobResult) -> Self {
        Self {
            success: result.succeeded(),
            outcome: result.outcome,
            message: result.message,
            output: result.output,
            error: result.error,
            exit_code: result.exit_code,
        }
    }
}

/// 报告查询：目录名优先，否则由考试名称和老师账号推导
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    #[serde(default)]
    pub folder_name: Option<String>,
    #[serde(default)]
    pub exam_name: Option<String>,
    #[serde(default)]
    pub teacher_username: Option<String>,
}

impl ReportQuery {
    pub fn by_folder(folder_name: impl Into<String>) -> Self {
        Self {
            folder_name: Some(folder_name.into()),
            ..Self::default()
        }
    }

    pub fn by_key(exam_name: impl Into<String>, teacher_username: impl Into<String>) -> Self {
        Self {
            folder_name: None,
            exam_name: Some(exam_name.into()),
            teacher_username: Some(teacher_username.into()),
        }
    }

    /// 解析出考试目录；客户端传入的目录名必须通过校验
    pub fn tenant(&self) -> AppResult<TenantFolder> {
        match self.folder_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => TenantFolder::parse(name),
            _ => Ok(TenantKey::new(
                self.exam_name.as_deref().unwrap_or_default(),
                self.teacher_username.as_deref().unwrap_or_default(),
            )
            .folder()),
        }
    }
}

/// 整份报告的响应
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Vec<ReportRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_students: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportResponse {
    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

/// 单个学生报告查询
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReportQuery {
    #[serde(flatten)]
    pub tenant: ReportQuery,
    /// 1 开始的序号或姓名
    pub student_id: String,
}

/// 学生基本信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
    pub name: String,
    pub student_id: String,
}

/// 单个学生报告的响应
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReportResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Vec<ReportItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StudentReportResponse {
    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

/// 评价报告查询
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationQuery {
    pub folder_name: String,
    pub student_name: String,
}

/// 暂存压缩包请求
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveBuildRequest {
    pub folder_name: String,
}

/// 暂存压缩包响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveBuildResponse {
    pub success: bool,
    pub message: String,
    pub file_path: String,
    pub download_url: String,
    pub file_name: String,
    pub download_id: String,
}

/// 下载暂存压缩包
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    pub file_path: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// 下载结果，`file_name` 已清洗，可直接放进 Content-Disposition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInfo {
    pub file_name: String,
    pub bytes: u64,
}

/// 清理暂存压缩包
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupRequest {
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub success: bool,
    pub message: String,
}

/// 历史报告查询
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    #[serde(default)]
    pub teacher_username: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub success: bool,
    pub reports: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 学生考试列表查询
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentExamsQuery {
    #[serde(default)]
    pub student_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentExamsResponse {
    pub success: bool,
    pub exams: Vec<StudentExamEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 服务状态
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

/// 从必填字段中取出非空值
pub(crate) fn required<'a>(value: &'a str, message: &str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppError::invalid_request(message))
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_query_prefers_folder() {
        let query = ReportQuery {
            folder_name: Some("期中_t1".into()),
            exam_name: Some("other".into()),
            teacher_username: Some("t2".into()),
        };
        assert_eq!(query.tenant().unwrap().as_str(), "期中_t1");
    }

    #[test]
    fn test_report_query_resolves_key() {
        let query = ReportQuery::by_key("期中", "t1");
        assert_eq!(query.tenant().unwrap().as_str(), "期中_t1");
        assert_eq!(ReportQuery::default().tenant().unwrap().as_str(), "未命名考试");
    }

    #[test]
    fn test_report_query_rejects_traversal() {
        let err = ReportQuery::by_folder("../../etc").tenant().unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_student_query_flattens_tenant() {
        let query: StudentReportQuery =
            serde_json::from_str(r#"{"examName":"期中","teacherUsername":"t1","studentId":"2"}"#)
                .unwrap();
        assert_eq!(query.tenant.tenant().unwrap().as_str(), "期中_t1");
        assert_eq!(query.student_id, "2");
    }

    #[test]
    fn test_failed_job_serializes_error() {
        let response = RunJobResponse::from(JobResult::from_exit(
            Some(1),
            String::new(),
            "boom".into(),
        ));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["error"], "boom");
        assert_eq!(json["exitCode"], 1);
    }
}
