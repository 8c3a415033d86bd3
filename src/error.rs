use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 表格提取工具错误
    #[error("提取错误: {0}")]
    Extraction(#[from] ExtractError),
    /// 报告读取错误
    #[error("{0}")]
    Report(#[from] ReportError),
    /// 压缩包导出错误
    #[error("{0}")]
    Archive(#[from] ArchiveError),
    /// 批处理进程无法启动
    #[error("无法启动批处理进程: {0}")]
    JobLaunch(String),
    /// 请求参数不合法
    #[error("{0}")]
    InvalidRequest(String),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 表格提取工具错误
///
/// 每一种都表示"这个数据源不可用"，进度计算会继续尝试下一个来源
#[derive(Debug, Error)]
pub enum ExtractError {
    /// 表格文件不存在
    #[error("表格文件不存在: {}", path.display())]
    SourceMissing { path: PathBuf },
    /// 无法启动提取进程
    #[error("执行提取脚本失败: {source}")]
    Launch {
        #[source]
        source: std::io::Error,
    },
    /// 提取进程以非零退出码结束
    #[error("提取脚本退出码 {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },
    /// 工具输出不符合约定格式
    #[error("无法解析提取脚本输出: {output}")]
    InvalidOutput { output: String },
    /// 工具自身报告的错误（`{"error": "..."}`）
    #[error("{message}")]
    Reported { message: String },
}

/// 报告读取错误
#[derive(Debug, Error)]
pub enum ReportError {
    /// 处理后的表格不存在
    #[error("报告文件不存在: {}", path.display())]
    SheetMissing { path: PathBuf },
    /// 提取工具失败，内嵌工具的错误信息
    #[error("读取Excel文件失败: {0}")]
    Extraction(#[source] ExtractError),
    /// 表格中没有任何有效数据行
    #[error("Excel文件为空")]
    EmptyReport,
    /// 找不到对应学生
    #[error("找不到该学生的报告: {identifier}")]
    StudentNotFound { identifier: String },
    /// 找不到学生的评价报告文件
    #[error("未找到该学生的师生互评报告: {student}")]
    EvaluationNotFound { student: String },
    /// 考试文件夹不存在
    #[error("考试文件夹不存在: {}", path.display())]
    FolderMissing { path: PathBuf },
    /// 读取报告文件失败
    #[error("读取报告文件失败 ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 压缩包导出错误
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// 考试文件夹不存在
    #[error("考试文件夹不存在: {}", path.display())]
    TenantMissing { path: PathBuf },
    /// 没有可打包的报告文件
    #[error("没有找到可下载的报告文件: {}", path.display())]
    NothingToArchive { path: PathBuf },
    /// 路径不在临时目录内
    #[error("文件路径无效")]
    PathOutsideTempRoot,
    /// 暂存的压缩包不存在
    #[error("压缩文件不存在: {}", path.display())]
    StagedFileMissing { path: PathBuf },
    /// 文件读写失败
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    /// 压缩失败
    #[error("压缩文件失败: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// 后台压缩任务异常退出
    #[error("压缩任务异常退出: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({}): {source}", path.display())]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件格式错误
    #[error("TOML解析失败 ({}): {source}", path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl ArchiveError {
    /// 创建带上下文的 IO 错误
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            context: context.into(),
            source,
        }
    }
}

impl AppError {
    /// 创建请求参数错误
    pub fn invalid_request(message: impl Into<String>) -> Self {
        AppError::InvalidRequest(message.into())
    }

    /// 供路由层使用的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidRequest(_) => 400,
            AppError::Archive(ArchiveError::PathOutsideTempRoot) => 403,
            AppError::Archive(ArchiveError::TenantMissing { .. })
            | AppError::Archive(ArchiveError::NothingToArchive { .. })
            | AppError::Archive(ArchiveError::StagedFileMissing { .. })
            | AppError::Report(ReportError::EvaluationNotFound { .. })
            | AppError::Report(ReportError::FolderMissing { .. }) => 404,
            _ => 500,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            AppError::from(ArchiveError::PathOutsideTempRoot).status_code(),
            403
        );
        assert_eq!(AppError::invalid_request("缺少参数").status_code(), 400);
        assert_eq!(AppError::JobLaunch("boom".into()).status_code(), 500);
        assert_eq!(
            AppError::from(ArchiveError::StagedFileMissing {
                path: PathBuf::from("/tmp/x.zip")
            })
            .status_code(),
            404
        );
    }

    #[test]
    fn test_report_error_embeds_tool_message() {
        let err = ReportError::Extraction(ExtractError::Reported {
            message: "Worksheet named 'grammar_table' not found".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "读取Excel文件失败: Worksheet named 'grammar_table' not found"
        );
    }
}
