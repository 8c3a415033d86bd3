//! 表格提取器 - 基础设施层
//!
//! 通过外部 Python 解释器读取 Excel，只暴露"数行数"和"读工作表"两种能力

use crate::config::Config;
use crate::error::ExtractError;
use crate::infrastructure::storage;
use crate::models::SheetTable;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// 统计默认工作表行数，输出一个整数
pub const COUNT_ROWS_SCRIPT: &str = r#"
import sys
import pandas as pd

df = pd.read_excel(sys.argv[1])
print(len(df))
"#;

/// 读取指定工作表，输出 {"headers": [...], "data": [[...]]} 或 {"error": "..."}
pub const READ_SHEET_SCRIPT: &str = r#"
import json
import sys
import pandas as pd

try:
    df = pd.read_excel(sys.argv[1], sheet_name=sys.argv[2]).fillna("")
    result = {
        "headers": [str(c) for c in df.columns],
        "data": df.astype(str).values.tolist(),
    }
    print(json.dumps(result, ensure_ascii=False))
except Exception as e:
    print(json.dumps({"error": str(e)}, ensure_ascii=False))
"#;

/// 工具输出的两种合法形状
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SheetPayload {
    Failure { error: String },
    Table {
        headers: Vec<String>,
        data: Vec<Vec<String>>,
    },
}

/// 表格提取器
///
/// 职责：
/// - 以 `<解释器> -c <脚本> <表格路径> [工作表]` 的形式调用外部工具
/// - 解析标准输出
/// - 不认识进度、报告、学生
#[derive(Debug, Clone)]
pub struct SheetExtractor {
    interpreter: PathBuf,
    working_dir: PathBuf,
    count_script: String,
    sheet_script: String,
}

impl SheetExtractor {
    /// 使用项目中的 Python 解释器
    pub fn new(config: &Config, working_dir: &Path) -> Self {
        Self::with_scripts(
            resolve_program(working_dir, &config.python_path),
            working_dir,
            COUNT_ROWS_SCRIPT,
            READ_SHEET_SCRIPT,
        )
    }

    /// 自定义解释器和脚本
    pub fn with_scripts(
        interpreter: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
        count_script: impl Into<String>,
        sheet_script: impl Into<String>,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            working_dir: working_dir.into(),
            count_script: count_script.into(),
            sheet_script: sheet_script.into(),
        }
    }

    /// 读取表格默认工作表的数据行数
    pub async fn count_rows(&self, spreadsheet: &Path) -> Result<usize, ExtractError> {
        let stdout = self
            .invoke(&self.count_script, spreadsheet, None)
            .await?;
        let trimmed = stdout.trim();
        trimmed
            .parse::<usize>()
            .map_err(|_| ExtractError::InvalidOutput {
                output: trimmed.to_string(),
            })
    }

    /// 读取指定工作表
    pub async fn read_sheet(
        &self,
        spreadsheet: &Path,
        sheet_name: &str,
    ) -> Result<SheetTable, ExtractError> {
        let stdout = self
            .invoke(&self.sheet_script, spreadsheet, Some(sheet_name))
            .await?;

        let payload: SheetPayload =
            serde_json::from_str(stdout.trim()).map_err(|_| ExtractError::InvalidOutput {
                output: stdout.trim().to_string(),
            })?;

        match payload {
            SheetPayload::Failure { error } => Err(ExtractError::Reported { message: error }),
            SheetPayload::Table { headers, data } => Ok(SheetTable { headers, data }),
        }
    }

    /// 执行一次工具调用，返回标准输出
    async fn invoke(
        &self,
        script: &str,
        spreadsheet: &Path,
        sheet_name: Option<&str>,
    ) -> Result<String, ExtractError> {
        if !storage::is_file(spreadsheet).await {
            return Err(ExtractError::SourceMissing {
                path: spreadsheet.to_path_buf(),
            });
        }

        debug!(
            "调用提取工具: {} ({})",
            spreadsheet.display(),
            sheet_name.unwrap_or("默认工作表")
        );

        let mut command = Command::new(&self.interpreter);
        command
            .arg("-c")
            .arg(script)
            .arg(spreadsheet)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(sheet) = sheet_name {
            command.arg(sheet);
        }

        let output = command
            .output()
            .await
            .map_err(|source| ExtractError::Launch { source })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                "提取工具退出码异常 {:?}: {}",
                output.status.code(),
                crate::utils::logging::truncate_text(&stderr, 200)
            );
            return Err(ExtractError::NonZeroExit {
                code: output.status.code(),
                stderr,
            });
        }

        Ok(stdout)
    }
}

/// 含路径分隔符的程序路径基于项目根目录解析，裸命令名交给 PATH 查找
pub fn resolve_program(project_root: &Path, program: &str) -> PathBuf {
    let path = Path::new(program);
    if path.is_absolute() || path.components().count() > 1 {
        project_root.join(path)
    } else {
        path.to_path_buf()
    }
}
