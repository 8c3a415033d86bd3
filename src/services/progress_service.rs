//! 进度计算服务 - 业务能力层
//!
//! 只负责"算进度"能力：扫描考试目录数报告，再按固定顺序估计学生总数

use crate::infrastructure::storage::report_file_names;
use crate::infrastructure::{SheetExtractor, StorageLayout, TenantFolder, TenantKey};
use crate::models::ProgressSnapshot;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

/// 学生总数的来源，按优先级排列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalSource {
    /// 考试目录中的汇总表格
    ProcessedSheet,
    /// 收件目录中上传的学生名单
    Roster,
    /// 考试目录中的中间表格
    RawOutputSheet,
}

impl TotalSource {
    /// 依次尝试的来源，全部不可用时使用默认值
    pub const CHAIN: [TotalSource; 3] = [
        TotalSource::ProcessedSheet,
        TotalSource::Roster,
        TotalSource::RawOutputSheet,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TotalSource::ProcessedSheet => "汇总表格",
            TotalSource::Roster => "学生名单",
            TotalSource::RawOutputSheet => "中间表格",
        }
    }

    fn path(self, layout: &StorageLayout, folder: &TenantFolder) -> PathBuf {
        match self {
            TotalSource::ProcessedSheet => layout.processed_sheet(folder),
            TotalSource::Roster => layout.roster_sheet(),
            TotalSource::RawOutputSheet => layout.raw_output_sheet(folder),
        }
    }
}

/// 进度计算服务
///
/// 职责：
/// - 统计考试目录中的报告文件数
/// - 沿来源链估计学生总数
/// - 永不失败，任何来源不可用都只是跳到下一个
pub struct ProgressService {
    layout: StorageLayout,
    extractor: SheetExtractor,
    default_total: usize,
}

impl ProgressService {
    pub fn new(layout: StorageLayout, extractor: SheetExtractor, default_total: usize) -> Self {
        Self {
            layout,
            extractor,
            default_total,
        }
    }

    /// 按考试名称和老师账号查询进度
    pub async fn get_progress(&self, key: &TenantKey) -> ProgressSnapshot {
        self.progress_for(&key.folder()).await
    }

    /// 按考试目录查询进度
    pub async fn progress_for(&self, folder: &TenantFolder) -> ProgressSnapshot {
        let dir = self.layout.tenant_dir(folder);

        let current = match report_file_names(&dir).await {
            Ok(names) => names.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("[考试 {}] 考试目录尚未创建", folder);
                0
            }
            Err(e) => {
                warn!("[考试 {}] ⚠️ 读取考试目录失败: {}", folder, e);
                0
            }
        };

        let artifact_ready = tokio::fs::try_exists(self.layout.processed_sheet(folder))
            .await
            .unwrap_or(false);

        let total = self.estimate_total(folder).await;
        let snapshot = ProgressSnapshot::compute(current, total, artifact_ready);

        debug!(
            "[考试 {}] 进度 {}/{} ({}%)",
            folder, snapshot.current_progress, snapshot.total_students, snapshot.percentage
        );
        snapshot
    }

    /// 第一个给出正整数的来源生效
    async fn estimate_total(&self, folder: &TenantFolder) -> usize {
        for source in TotalSource::CHAIN {
            let path = source.path(&self.layout, folder);
            match self.extractor.count_rows(&path).await {
                Ok(count) if count > 0 => {
                    debug!("[考试 {}] 学生总数来自{}: {}", folder, source.label(), count);
                    return count;
                }
                Ok(_) => debug!("[考试 {}] {}没有数据行", folder, source.label()),
                Err(e) => debug!("[考试 {}] {}不可用: {}", folder, source.label(), e),
            }
        }

        debug!(
            "[考试 {}] 无可用来源，使用默认学生总数 {}",
            folder, self.default_total
        );
        self.default_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_order() {
        assert_eq!(
            TotalSource::CHAIN,
            [
                TotalSource::ProcessedSheet,
                TotalSource::Roster,
                TotalSource::RawOutputSheet
            ]
        );
    }

    #[test]
    fn test_source_paths() {
        let layout = StorageLayout::new("/srv/grading", "in", "out", "temp");
        let folder = TenantKey::new("期中", "t1").folder();
        assert_eq!(
            TotalSource::Roster.path(&layout, &folder),
            PathBuf::from("/srv/grading/in/1.xlsx")
        );
        assert_eq!(
            TotalSource::RawOutputSheet.path(&layout, &folder),
            PathBuf::from("/srv/grading/out/期中_t1/output.xlsx")
        );
    }
}
