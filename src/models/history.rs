use serde::Serialize;
use std::path::PathBuf;

/// 老师的一次历史报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub folder_name: String,
    pub exam_name: String,
    pub student_count: usize,
    pub create_time: String,
    pub has_excel: bool,
}

/// 学生参加过的一场考试
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentExamEntry {
    pub folder_name: String,
    pub exam_name: String,
    pub create_time: String,
    pub has_grammar_report: bool,
    pub has_evaluation_report: bool,
}

/// 收件目录中上传文件的状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeStatus {
    pub pdf_exists: bool,
    pub excel_exists: bool,
    pub pdf_path: PathBuf,
    pub excel_path: PathBuf,
    /// 源文档修改时间
    pub timestamp: Option<String>,
}

impl IntakeStatus {
    pub fn ready(&self) -> bool {
        self.pdf_exists && self.excel_exists
    }
}
