//! 报告读取服务 - 业务能力层
//!
//! 只负责"读报告"能力：汇总表格转为行数据、按学生查找、读取学生的评价报告

use crate::error::ReportError;
use crate::infrastructure::storage::{self, report_file_names};
use crate::infrastructure::{SheetExtractor, StorageLayout, TenantFolder};
use crate::models::{ReportRow, SheetReport, SheetTable, StudentReport};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

/// 姓名列的表头关键字
const NAME_HEADER_KEYWORDS: [&str; 2] = ["姓名", "name"];

/// 报告读取服务
///
/// 职责：
/// - 调用提取工具读取固定工作表
/// - 过滤空行
/// - 按序号或姓名定位学生
pub struct ReportService {
    layout: StorageLayout,
    extractor: SheetExtractor,
    sheet_name: String,
}

impl ReportService {
    pub fn new(layout: StorageLayout, extractor: SheetExtractor, sheet_name: impl Into<String>) -> Self {
        Self {
            layout,
            extractor,
            sheet_name: sheet_name.into(),
        }
    }

    /// 读取考试目录中的汇总报告
    pub async fn full_report(&self, folder: &TenantFolder) -> Result<SheetReport, ReportError> {
        let report = self
            .report_from(&self.layout.processed_sheet(folder))
            .await?;
        info!("[考试 {}] 📊 读取报告 {} 行", folder, report.rows.len());
        Ok(report)
    }

    /// 读取任意位置的汇总表格
    pub async fn report_from(&self, spreadsheet: &Path) -> Result<SheetReport, ReportError> {
        if !storage::is_file(spreadsheet).await {
            return Err(ReportError::SheetMissing {
                path: spreadsheet.to_path_buf(),
            });
        }

        let table = self
            .extractor
            .read_sheet(spreadsheet, &self.sheet_name)
            .await
            .map_err(ReportError::Extraction)?;

        Ok(build_report(table))
    }

    /// 读取单个学生的报告
    ///
    /// `identifier` 为 1 开始的序号或姓名的一部分
    pub async fn student_report(
        &self,
        folder: &TenantFolder,
        identifier: &str,
    ) -> Result<StudentReport, ReportError> {
        let report = self.full_report(folder).await?;
        if report.rows.is_empty() {
            return Err(ReportError::EmptyReport);
        }
        let student = locate_student(&report, identifier)?;
        debug!(
            "[考试 {}] 学生 {} 定位到第 {} 行",
            folder,
            identifier,
            student.index + 1
        );
        Ok(student)
    }

    /// 读取学生的评价报告（Markdown 原文）
    ///
    /// 优先匹配 `<学生>.md`，否则取第一个文件名包含学生姓名的报告
    pub async fn evaluation_report(
        &self,
        folder: &TenantFolder,
        student: &str,
    ) -> Result<String, ReportError> {
        let student = student.trim();
        let dir = self.layout.tenant_dir(folder);

        let names = match report_file_names(&dir).await {
            Ok(names) => names,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ReportError::FolderMissing { path: dir });
            }
            Err(source) => return Err(ReportError::Io { path: dir, source }),
        };

        let file_name = (!student.is_empty())
            .then(|| pick_report_file(&names, student))
            .flatten()
            .ok_or_else(|| ReportError::EvaluationNotFound {
                student: student.to_string(),
            })?;

        let path = dir.join(file_name);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ReportError::Io { path, source })
    }
}

/// 表格转报告，去掉所有单元格都为空的行
pub fn build_report(table: SheetTable) -> SheetReport {
    let rows = table
        .data
        .iter()
        .map(|values| ReportRow::from_cells(&table.headers, values))
        .filter(|row| !row.is_blank())
        .collect();

    SheetReport {
        headers: table.headers,
        rows,
    }
}

/// 定位学生
///
/// 1. 在范围内的正整数按 1 开始的序号处理
/// 2. 否则在姓名列（表头包含"姓名"或"name"）中找第一个包含该标识的行
pub fn locate_student(report: &SheetReport, identifier: &str) -> Result<StudentReport, ReportError> {
    let identifier = identifier.trim();
    let not_found = || ReportError::StudentNotFound {
        identifier: identifier.to_string(),
    };
    if identifier.is_empty() {
        return Err(not_found());
    }

    if let Ok(position) = identifier.parse::<usize>() {
        if (1..=report.rows.len()).contains(&position) {
            let index = position - 1;
            return Ok(StudentReport {
                index,
                row: report.rows[index].clone(),
            });
        }
    }

    let name_header = name_column(&report.headers).ok_or_else(not_found)?;
    report
        .rows
        .iter()
        .position(|row| {
            row.get(name_header)
                .is_some_and(|name| !name.is_empty() && name.contains(identifier))
        })
        .map(|index| StudentReport {
            index,
            row: report.rows[index].clone(),
        })
        .ok_or_else(not_found)
}

/// 第一个表头包含姓名关键字的列
fn name_column(headers: &[String]) -> Option<&str> {
    headers
        .iter()
        .find(|header| {
            let lowered = header.to_lowercase();
            NAME_HEADER_KEYWORDS.iter().any(|kw| lowered.contains(kw))
        })
        .map(String::as_str)
}

fn pick_report_file<'a>(names: &'a [String], student: &str) -> Option<&'a String> {
    let exact = format!("{}.md", student);
    names
        .iter()
        .find(|name| **name == exact)
        .or_else(|| names.iter().find(|name| name.contains(student)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[[&str; 3]]) -> SheetTable {
        SheetTable {
            headers: vec!["学号".into(), "学生姓名".into(), "总评".into()],
            data: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    fn five_students() -> SheetReport {
        build_report(table(&[
            ["1", "Bob", "A"],
            ["2", "Alice", "B"],
            ["3", "Carol", "A"],
            ["4", "Alice Smith", "C"],
            ["5", "Dave", "B"],
        ]))
    }

    #[test]
    fn test_blank_rows_are_dropped() {
        let report = build_report(table(&[["1", "Bob", "A"], ["", "  ", ""], ["2", "Eve", ""]]));
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[1].get("学生姓名"), Some("Eve"));
    }

    #[test]
    fn test_positional_lookup_is_one_based() {
        let student = locate_student(&five_students(), "2").unwrap();
        assert_eq!(student.index, 1);
        assert_eq!(student.row.get("学生姓名"), Some("Alice"));
    }

    #[test]
    fn test_name_lookup_takes_first_match() {
        let student = locate_student(&five_students(), "Alice").unwrap();
        assert_eq!(student.index, 1);
    }

    #[test]
    fn test_unknown_student_is_not_found() {
        let err = locate_student(&five_students(), "Zephyr").unwrap_err();
        assert!(matches!(err, ReportError::StudentNotFound { .. }));
        assert!(locate_student(&five_students(), "  ").is_err());
    }

    #[test]
    fn test_out_of_range_number_falls_back_to_name() {
        let report = build_report(SheetTable {
            headers: vec!["Name".into()],
            data: vec![vec!["Agent 007".into()], vec!["Bond".into()]],
        });
        assert_eq!(locate_student(&report, "007").unwrap().index, 0);
        assert!(locate_student(&report, "9").is_err());
    }

    #[test]
    fn test_no_name_column_means_positional_only() {
        let report = build_report(SheetTable {
            headers: vec!["分数".into()],
            data: vec![vec!["90".into()]],
        });
        assert!(locate_student(&report, "1").is_ok());
        assert!(locate_student(&report, "90").is_err());
    }

    #[test]
    fn test_pick_report_file_prefers_exact() {
        let names = vec!["张三丰.md".to_string(), "张三.md".to_string()];
        assert_eq!(pick_report_file(&names, "张三").unwrap(), "张三.md");
        assert_eq!(pick_report_file(&names, "三丰").unwrap(), "张三丰.md");
        assert!(pick_report_file(&names, "李四").is_none());
    }
}
