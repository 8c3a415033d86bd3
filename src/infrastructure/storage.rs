//! 存储目录布局 - 基础设施层
//!
//! 没有数据库，目录结构就是数据模型：
//!
//! ```text
//! {project_root}/
//!   in/1.pdf, in/1.xlsx                 上传的原始文件（固定文件名）
//!   out/{考试目录}/*.md                   每个学生一份报告
//!   out/{考试目录}/output_processed.xlsx  汇总表格
//!   temp/*.zip                           暂存的压缩包
//! ```

use crate::config::Config;
use crate::infrastructure::tenant::TenantFolder;
use std::path::{Component, Path, PathBuf};

/// 上传的源文档
pub const SOURCE_DOCUMENT: &str = "1.pdf";
/// 上传的学生名单表格
pub const ROSTER_SHEET: &str = "1.xlsx";
/// 批处理生成的汇总表格
pub const PROCESSED_SHEET: &str = "output_processed.xlsx";
/// 批处理生成的中间表格
pub const RAW_OUTPUT_SHEET: &str = "output.xlsx";
/// 学生报告文件扩展名
pub const REPORT_EXTENSION: &str = "md";

/// 存储目录布局
///
/// 所有路径在构造时转换为绝对路径并做词法规范化
#[derive(Debug, Clone)]
pub struct StorageLayout {
    project_root: PathBuf,
    inbox_dir: PathBuf,
    output_root: PathBuf,
    temp_root: PathBuf,
}

impl StorageLayout {
    /// 从配置构建
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.project_root,
            &config.inbox_dir,
            &config.output_dir,
            &config.temp_dir,
        )
    }

    /// 子目录为相对路径时基于项目根目录解析
    pub fn new(
        project_root: impl AsRef<Path>,
        inbox_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
        temp_dir: impl AsRef<Path>,
    ) -> Self {
        let project_root = absolutize(project_root.as_ref());
        Self {
            inbox_dir: normalize_lexically(&project_root.join(inbox_dir)),
            output_root: normalize_lexically(&project_root.join(output_dir)),
            temp_root: normalize_lexically(&project_root.join(temp_dir)),
            project_root,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn inbox_dir(&self) -> &Path {
        &self.inbox_dir
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// 考试目录: {output_root}/{folder}
    pub fn tenant_dir(&self, folder: &TenantFolder) -> PathBuf {
        self.output_root.join(folder.as_str())
    }

    pub fn processed_sheet(&self, folder: &TenantFolder) -> PathBuf {
        self.tenant_dir(folder).join(PROCESSED_SHEET)
    }

    pub fn raw_output_sheet(&self, folder: &TenantFolder) -> PathBuf {
        self.tenant_dir(folder).join(RAW_OUTPUT_SHEET)
    }

    pub fn roster_sheet(&self) -> PathBuf {
        self.inbox_dir.join(ROSTER_SHEET)
    }

    pub fn source_document(&self) -> PathBuf {
        self.inbox_dir.join(SOURCE_DOCUMENT)
    }
}

/// 是否为学生报告文件
pub fn is_report_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(REPORT_EXTENSION)
}

/// 列出目录中的报告文件名（按文件名排序）
///
/// 目录可能正在被批处理写入，结果只是某一时刻的快照
pub async fn report_file_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        // 文件可能在列目录和取类型之间被删除
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file && is_report_file(&path) {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }

    names.sort();
    Ok(names)
}

/// 路径是否为普通文件，读不到元数据时视为不存在
pub async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// 路径是否为目录
pub async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// 相对路径基于当前工作目录解析
fn absolutize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    normalize_lexically(&absolute)
}

/// 只做词法处理的路径规范化：去掉 `.`，折叠 `..`，不访问文件系统
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if normalized.file_name().is_some() {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
