use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "report_service.toml";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 项目根目录（批处理脚本所在目录，也是 in/out/temp 的父目录）
    pub project_root: String,
    /// 上传文件收件目录
    pub inbox_dir: String,
    /// 报告输出目录，每个考试一个子目录
    pub output_dir: String,
    /// 暂存压缩包的临时目录
    pub temp_dir: String,
    /// Python 解释器路径（相对路径基于项目根目录）
    pub python_path: String,
    /// 批处理入口脚本
    pub batch_script: String,
    /// 批处理作业超时时间（秒）
    pub job_timeout_secs: u64,
    /// 进度轮询间隔（秒）
    pub progress_poll_secs: u64,
    /// 无法获取学生总数时使用的默认值
    pub default_total_students: usize,
    /// 报告所在的工作表
    pub report_sheet_name: String,
    /// 考试名称（命令行模式）
    pub exam_name: Option<String>,
    /// 老师账号（命令行模式）
    pub teacher_username: Option<String>,
    /// 输出日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_root: ".".to_string(),
            inbox_dir: "in".to_string(),
            output_dir: "out".to_string(),
            temp_dir: "temp".to_string(),
            python_path: "venv/bin/python3".to_string(),
            batch_script: "main.py".to_string(),
            job_timeout_secs: 30 * 60,
            progress_poll_secs: 5,
            default_total_students: 9,
            report_sheet_name: "grammar_table".to_string(),
            exam_name: None,
            teacher_username: None,
            output_log_file: "report_service.log".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：可选的 TOML 文件，再用环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("REPORT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let path = PathBuf::from(path);
        let base = if path.exists() {
            Self::from_toml_file(&path)?
        } else {
            debug!("配置文件 {} 不存在，使用默认配置", path.display());
            Self::default()
        };
        Ok(base.with_env_overrides())
    }

    /// 只从环境变量读取（未设置的字段使用默认值）
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取配置
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 从 TOML 文本读取配置
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            project_root: env_string("REPORT_PROJECT_ROOT").unwrap_or(self.project_root),
            inbox_dir: env_string("REPORT_INBOX_DIR").unwrap_or(self.inbox_dir),
            output_dir: env_string("REPORT_OUTPUT_DIR").unwrap_or(self.output_dir),
            temp_dir: env_string("REPORT_TEMP_DIR").unwrap_or(self.temp_dir),
            python_path: env_string("REPORT_PYTHON").unwrap_or(self.python_path),
            batch_script: env_string("REPORT_BATCH_SCRIPT").unwrap_or(self.batch_script),
            job_timeout_secs: env_parse("REPORT_JOB_TIMEOUT_SECS", "u64").unwrap_or(self.job_timeout_secs),
            progress_poll_secs: env_parse("REPORT_POLL_SECS", "u64").unwrap_or(self.progress_poll_secs),
            default_total_students: env_parse("REPORT_DEFAULT_TOTAL", "usize")
                .unwrap_or(self.default_total_students),
            report_sheet_name: env_string("REPORT_SHEET_NAME").unwrap_or(self.report_sheet_name),
            exam_name: env_string("EXAM_NAME").or(self.exam_name),
            teacher_username: env_string("TEACHER_USERNAME").or(self.teacher_username),
            output_log_file: env_string("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
            verbose_logging: env_parse("VERBOSE_LOGGING", "bool").unwrap_or(self.verbose_logging),
        }
    }
}

/// 读取非空环境变量
fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 读取并解析环境变量，解析失败时记录警告并返回 None
fn env_parse<T: FromStr>(var_name: &str, expected_type: &str) -> Option<T> {
    let value = env_string(var_name)?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            let err = ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            };
            warn!("⚠️ {}，使用默认值", err);
            None
        }
    }
}
