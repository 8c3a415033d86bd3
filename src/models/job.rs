use serde::{Deserialize, Serialize};

/// 批处理在检测到已有输出时打印的标记，之后可能会自行终止
pub const ALREADY_PROCESSED_MARKER: &str = "检测到已处理的Excel文件";

/// 运行批处理的请求
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    #[serde(default)]
    pub exam_name: Option<String>,
    #[serde(default)]
    pub teacher_username: Option<String>,
}

impl JobRequest {
    pub fn new(exam_name: Option<String>, teacher_username: Option<String>) -> Self {
        Self {
            exam_name,
            teacher_username,
        }
    }

    /// 非空的考试名称
    pub fn exam_name(&self) -> Option<&str> {
        non_empty(self.exam_name.as_deref())
    }

    /// 非空的老师账号
    pub fn teacher_username(&self) -> Option<&str> {
        non_empty(self.teacher_username.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// 作业结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum JobOutcome {
    /// 正常完成
    Succeeded,
    /// 进程结束但退出码异常
    Failed,
    /// 超时被终止
    TimedOut,
    /// 进程无法启动
    LaunchFailed,
}

/// 一次批处理运行的最终结果，每次运行只产生一个
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub outcome: JobOutcome,
    pub message: String,
    pub output: String,
    pub error: Option<String>,
    /// None 表示进程被信号终止或从未运行
    pub exit_code: Option<i32>,
}

impl JobResult {
    /// 根据进程退出信息判定结果
    ///
    /// - 退出码 0: 成功
    /// - 无退出码（被终止）且输出包含已处理标记: 成功
    /// - 其他: 执行完成但失败，stderr 作为错误信息
    pub fn from_exit(exit_code: Option<i32>, output: String, error_output: String) -> Self {
        let already_processed = exit_code.is_none() && output.contains(ALREADY_PROCESSED_MARKER);

        if exit_code == Some(0) || already_processed {
            Self {
                outcome: JobOutcome::Succeeded,
                message: "批处理执行成功".to_string(),
                output,
                error: None,
                exit_code: Some(0),
            }
        } else {
            Self {
                outcome: JobOutcome::Failed,
                message: "批处理执行完成".to_string(),
                output,
                error: Some(error_output),
                exit_code,
            }
        }
    }

    /// 超时结果，附带截至超时前的输出
    pub fn timed_out(output: String, error_output: String) -> Self {
        Self {
            outcome: JobOutcome::TimedOut,
            message: "批处理执行超时".to_string(),
            output,
            error: (!error_output.is_empty()).then_some(error_output),
            exit_code: None,
        }
    }

    /// 进程无法启动
    pub fn launch_failed(error: impl Into<String>) -> Self {
        Self {
            outcome: JobOutcome::LaunchFailed,
            message: "无法启动批处理进程".to_string(),
            output: String::new(),
            error: Some(error.into()),
            exit_code: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == JobOutcome::Succeeded
    }
}
