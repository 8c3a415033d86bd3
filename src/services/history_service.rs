//! 历史记录服务 - 业务能力层
//!
//! 只负责"列出历史考试"能力：按老师或按学生扫描输出目录

use crate::error::AppError;
use crate::infrastructure::storage::{self, report_file_names};
use crate::infrastructure::tenant::sanitize_segment;
use crate::infrastructure::{StorageLayout, TenantFolder};
use crate::models::{HistoryEntry, StudentExamEntry};
use std::io::ErrorKind;
use std::path::Path;
use std::time::SystemTime;
use crate::utils::logging::format_time;
use tracing::{debug, warn};

/// 学生端不知道老师账号，按默认账号去掉目录后缀
pub const DEFAULT_TEACHER_ACCOUNT: &str = "teacher";

/// 历史记录服务
pub struct HistoryService {
    layout: StorageLayout,
}

/// 扫描到的一个考试目录
struct TenantDir {
    folder: TenantFolder,
    modified: SystemTime,
    reports: Vec<String>,
}

impl HistoryService {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// 老师的历史报告，最新的在前
    pub async fn teacher_history(&self, teacher_username: &str) -> Result<Vec<HistoryEntry>, AppError> {
        let teacher = sanitize_segment(teacher_username);
        if teacher.is_empty() {
            return Err(AppError::invalid_request("缺少老师账号参数"));
        }

        let mut dirs: Vec<TenantDir> = self
            .scan_tenant_dirs()
            .await
            .into_iter()
            .filter(|dir| dir.folder.owned_exam_name(&teacher).is_some())
            .collect();
        sort_newest_first(&mut dirs);

        let mut entries = Vec::with_capacity(dirs.len());
        for dir in dirs {
            let Some(exam_name) = dir.folder.owned_exam_name(&teacher) else {
                continue;
            };
            entries.push(HistoryEntry {
                exam_name: exam_name.to_string(),
                student_count: dir.reports.len(),
                create_time: format_time(dir.modified),
                has_excel: storage::is_file(&self.layout.processed_sheet(&dir.folder)).await,
                folder_name: dir.folder.as_str().to_string(),
            });
        }

        debug!("老师 {} 共有 {} 份历史报告", teacher, entries.len());
        Ok(entries)
    }

    /// 学生参加过的考试，最新的在前
    pub async fn student_exams(&self, student_name: &str) -> Result<Vec<StudentExamEntry>, AppError> {
        let student = student_name.trim();
        if student.is_empty() {
            return Err(AppError::invalid_request("缺少学生姓名参数"));
        }

        let mut dirs: Vec<TenantDir> = self
            .scan_tenant_dirs()
            .await
            .into_iter()
            .filter(|dir| dir.reports.iter().any(|name| name.contains(student)))
            .collect();
        sort_newest_first(&mut dirs);

        let mut entries = Vec::with_capacity(dirs.len());
        for dir in dirs {
            entries.push(StudentExamEntry {
                exam_name: dir.folder.exam_name_for(DEFAULT_TEACHER_ACCOUNT),
                create_time: format_time(dir.modified),
                has_grammar_report: storage::is_file(&self.layout.processed_sheet(&dir.folder)).await,
                has_evaluation_report: true,
                folder_name: dir.folder.as_str().to_string(),
            });
        }

        debug!("学生 {} 共参加 {} 场考试", student, entries.len());
        Ok(entries)
    }

    /// 列出输出目录下的所有考试目录；输出目录不存在时为空
    async fn scan_tenant_dirs(&self) -> Vec<TenantDir> {
        let root = self.layout.output_root();
        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!("⚠️ 读取输出目录失败 {}: {}", root.display(), e);
                }
                return Vec::new();
            }
        };

        let mut dirs = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("⚠️ 遍历输出目录失败: {}", e);
                    break;
                }
            };

            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let Ok(folder) = TenantFolder::parse(&name) else {
                debug!("跳过无法识别的目录: {}", name);
                continue;
            };

            dirs.push(TenantDir {
                reports: list_reports(&entry.path()).await,
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                folder,
            });
        }
        dirs
    }
}

async fn list_reports(dir: &Path) -> Vec<String> {
    report_file_names(dir).await.unwrap_or_else(|e| {
        warn!("⚠️ 读取考试目录失败 {}: {}", dir.display(), e);
        Vec::new()
    })
}

fn sort_newest_first(dirs: &mut [TenantDir]) {
    dirs.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| a.folder.as_str().cmp(b.folder.as_str()))
    });
}
