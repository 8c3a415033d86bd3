//! 压缩包导出服务 - 业务能力层
//!
//! 两种导出方式：
//! - 直接写入：报告文件 + 汇总表格压缩后写入调用方提供的输出流
//! - 暂存：整个考试目录压缩到临时目录，返回下载句柄，由调用方负责清理
//!
//! 暂存文件在每次读取和删除前都要做词法校验，必须位于临时目录内

use crate::error::ArchiveError;
use crate::infrastructure::storage::{self, report_file_names, PROCESSED_SHEET};
use crate::infrastructure::{StorageLayout, TenantFolder};
use crate::models::{ArchiveHandle, CleanupOutcome, StreamedArchive};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use std::fs;
use std::io::{ErrorKind, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// 下载接口路径
pub const DOWNLOAD_ENDPOINT: &str = "/api/download-compressed-file";

/// 与浏览器 encodeURIComponent 保持一致的保留字符
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// 压缩包导出服务
///
/// 职责：
/// - 打包考试目录
/// - 管理临时目录中的暂存压缩包（创建、读取、清理）
/// - 拒绝任何不在临时目录内的路径
pub struct ArchiveService {
    layout: StorageLayout,
}

impl ArchiveService {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// 将报告文件和汇总表格压缩后写入 `sink`
    ///
    /// 压缩在后台线程写入匿名临时文件，完成后再复制到 `sink`，
    /// 压缩失败时 `sink` 不会收到任何数据
    pub async fn stream_reports<W>(
        &self,
        folder: &TenantFolder,
        sink: &mut W,
    ) -> Result<StreamedArchive, ArchiveError>
    where
        W: AsyncWrite + Unpin,
    {
        let dir = self.layout.tenant_dir(folder);
        let names = match report_file_names(&dir).await {
            Ok(names) => names,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ArchiveError::TenantMissing { path: dir });
            }
            Err(e) => return Err(ArchiveError::io("读取考试文件夹失败", e)),
        };

        let mut files: Vec<PathBuf> = names.iter().map(|name| dir.join(name)).collect();
        let processed = dir.join(PROCESSED_SHEET);
        if storage::is_file(&processed).await {
            files.push(processed);
        }
        if files.is_empty() {
            return Err(ArchiveError::NothingToArchive { path: dir });
        }

        let entries = files.len();
        info!("[考试 {}] 📦 开始打包 {} 个文件", folder, entries);

        let staging = tokio::task::spawn_blocking(move || zip_files_sync(&files)).await??;
        let mut staging = tokio::fs::File::from_std(staging);

        let bytes_written = tokio::io::copy(&mut staging, sink)
            .await
            .map_err(|e| ArchiveError::io("写入压缩流失败", e))?;
        sink.flush()
            .await
            .map_err(|e| ArchiveError::io("写入压缩流失败", e))?;

        info!("[考试 {}] ✅ 打包完成: {} bytes", folder, bytes_written);
        Ok(StreamedArchive {
            file_name: format!("{}_reports.zip", folder),
            entries,
            bytes_written,
        })
    }

    /// 将整个考试目录压缩到临时目录
    ///
    /// 文件名为 `<考试目录>_reports_<毫秒时间戳>.zip`，压缩包内的条目以考试目录名为前缀
    pub async fn stage_archive(&self, folder: &TenantFolder) -> Result<ArchiveHandle, ArchiveError> {
        let dir = self.layout.tenant_dir(folder);
        if !storage::is_dir(&dir).await {
            return Err(ArchiveError::TenantMissing { path: dir });
        }

        let temp_root = self.layout.temp_root();
        tokio::fs::create_dir_all(temp_root)
            .await
            .map_err(|e| ArchiveError::io("创建临时目录失败", e))?;

        let file_name = format!(
            "{}_reports_{}.zip",
            folder,
            chrono::Utc::now().timestamp_millis()
        );
        let zip_path = temp_root.join(&file_name);

        info!("[考试 {}] 📦 开始压缩考试文件夹", folder);
        let size_bytes = {
            let src = dir.clone();
            let dst = zip_path.clone();
            let prefix = folder.as_str().to_string();
            let result = tokio::task::spawn_blocking(move || zip_dir_sync(&src, &dst, &prefix)).await?;
            if let Err(e) = &result {
                warn!("[考试 {}] ❌ 压缩失败: {}", folder, e);
            }
            result?
        };
        info!(
            "[考试 {}] ✅ 压缩完成，文件大小: {} bytes",
            folder, size_bytes
        );

        Ok(ArchiveHandle {
            download_url: download_url(&zip_path, &file_name),
            download_id: Uuid::new_v4().to_string(),
            file_path: zip_path,
            file_name,
            size_bytes,
        })
    }

    /// 打开暂存的压缩包用于下载
    pub async fn open_staged(&self, raw_path: &Path) -> Result<tokio::fs::File, ArchiveError> {
        let path = self.validate_staged_path(raw_path)?;
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ArchiveError::StagedFileMissing { path })
            }
            Err(e) => Err(ArchiveError::io("文件读取失败", e)),
        }
    }

    /// 删除暂存的压缩包，重复调用同样成功
    pub async fn cleanup(&self, raw_path: &Path) -> Result<CleanupOutcome, ArchiveError> {
        let path = self.validate_staged_path(raw_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("🧹 已清理压缩文件: {}", path.display());
                Ok(CleanupOutcome::Removed)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("压缩文件不存在，无需清理: {}", path.display());
                Ok(CleanupOutcome::AlreadyAbsent)
            }
            Err(e) => Err(ArchiveError::io("清理压缩文件失败", e)),
        }
    }

    /// 词法校验：绝对路径、没有 `.`/`..`、位于临时目录内且不是临时目录本身
    ///
    /// 不访问文件系统，无论文件是否存在都先做这一步
    pub fn validate_staged_path(&self, raw_path: &Path) -> Result<PathBuf, ArchiveError> {
        let temp_root = self.layout.temp_root();
        let has_dots = raw_path
            .components()
            .any(|c| matches!(c, Component::CurDir | Component::ParentDir));

        if !raw_path.is_absolute()
            || has_dots
            || !raw_path.starts_with(temp_root)
            || raw_path == temp_root
        {
            warn!("⚠️ 拒绝访问临时目录外的路径: {}", raw_path.display());
            return Err(ArchiveError::PathOutsideTempRoot);
        }
        Ok(raw_path.to_path_buf())
    }
}

/// 下载时使用的文件名，非 `[a-zA-Z0-9._-]` 字符替换为 `_`
pub fn sanitize_download_name(name: &str) -> String {
    match Regex::new(r"[^a-zA-Z0-9._-]") {
        Ok(re) => re.replace_all(name, "_").to_string(),
        Err(_) => "reports.zip".to_string(),
    }
}

/// 下载链接：`/api/download-compressed-file?filePath=..&fileName=..`
pub fn download_url(file_path: &Path, file_name: &str) -> String {
    format!(
        "{}?filePath={}&fileName={}",
        DOWNLOAD_ENDPOINT,
        utf8_percent_encode(&file_path.to_string_lossy(), URI_COMPONENT),
        utf8_percent_encode(file_name, URI_COMPONENT)
    )
}

/// 把若干文件平铺压缩到匿名临时文件，返回已回到开头的文件
fn zip_files_sync(files: &[PathBuf]) -> Result<fs::File, ArchiveError> {
    let file = tempfile::tempfile().map_err(|e| ArchiveError::io("创建临时文件失败", e))?;
    let mut zip = ZipWriter::new(file);
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let bytes = fs::read(path)
            .map_err(|e| ArchiveError::io(format!("读取文件失败 {}", path.display()), e))?;
        zip.start_file(name, options)?;
        zip.write_all(&bytes)
            .map_err(|e| ArchiveError::io("写入压缩包失败", e))?;
    }

    let mut file = zip.finish()?;
    file.seek(SeekFrom::Start(0))
        .map_err(|e| ArchiveError::io("回到压缩文件开头失败", e))?;
    Ok(file)
}

/// 递归压缩目录，条目名为 `<prefix>/<相对路径>`，返回压缩包大小
///
/// 先写入同目录下的临时文件，全部成功后才改名为 `zip_path`；
/// 中途失败时临时文件随 drop 删除，不会留下没有句柄的半成品
fn zip_dir_sync(src_dir: &Path, zip_path: &Path, prefix: &str) -> Result<u64, ArchiveError> {
    let parent = zip_path.parent().unwrap_or_else(|| Path::new("."));
    let staging = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| ArchiveError::io(format!("创建压缩文件失败 {}", parent.display()), e))?;
    let mut zip = ZipWriter::new(staging);
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(src_dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();

        // 跳过根目录本身
        let rel = match path.strip_prefix(src_dir).ok() {
            Some(r) if !r.as_os_str().is_empty() => r,
            _ => continue,
        };
        let name = format!("{}/{}", prefix, rel.to_string_lossy().replace('\\', "/"));

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", name), options)?;
        } else {
            let bytes = fs::read(path)
                .map_err(|e| ArchiveError::io(format!("读取文件失败 {}", path.display()), e))?;
            zip.start_file(name, options)?;
            zip.write_all(&bytes)
                .map_err(|e| ArchiveError::io("写入压缩包失败", e))?;
        }
    }

    let staging = zip.finish()?;
    let size = staging
        .as_file()
        .metadata()
        .map_err(|e| ArchiveError::io("读取压缩文件大小失败", e))?
        .len();
    staging
        .persist(zip_path)
        .map_err(|e| ArchiveError::io(format!("保存压缩文件失败 {}", zip_path.display()), e.error))?;
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ArchiveService {
        ArchiveService::new(StorageLayout::new("/srv/grading", "in", "out", "temp"))
    }

    #[test]
    fn test_rejects_paths_outside_temp_root() {
        let service = service();
        for raw in [
            "/etc/passwd",
            "/srv/grading/temp",
            "/srv/grading/temp/../out/a.zip",
            "/srv/grading/temporary/a.zip",
            "temp/a.zip",
        ] {
            assert!(
                matches!(
                    service.validate_staged_path(Path::new(raw)),
                    Err(ArchiveError::PathOutsideTempRoot)
                ),
                "{} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_accepts_paths_inside_temp_root() {
        let path = Path::new("/srv/grading/temp/期中_t1_reports_1700000000000.zip");
        assert_eq!(service().validate_staged_path(path).unwrap(), path);
    }

    #[test]
    fn test_sanitize_download_name() {
        assert_eq!(sanitize_download_name("期中_t1_reports.zip"), "___t1_reports.zip");
        assert_eq!(sanitize_download_name("a b\"c.zip"), "a_b_c.zip");
    }

    #[test]
    fn test_download_url_encodes_like_browser() {
        let url = download_url(Path::new("/srv/temp/A B_reports_1.zip"), "A B_reports_1.zip");
        assert_eq!(
            url,
            "/api/download-compressed-file?filePath=%2Fsrv%2Ftemp%2FA%20B_reports_1.zip&fileName=A%20B_reports_1.zip"
        );
    }
}
