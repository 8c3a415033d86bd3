use serde::Serialize;

/// 进度快照
///
/// 每次请求实时计算，不缓存、不持久化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// 已生成的学生报告数
    pub current_progress: usize,
    /// 学生总数，始终 >= max(current_progress, 1)
    pub total_students: usize,
    /// 0-100
    pub percentage: u8,
    /// 汇总表格是否已生成
    pub artifact_ready: bool,
}

impl ProgressSnapshot {
    /// 由报告数和估计的总人数计算快照
    ///
    /// 总人数会被抬高到不小于报告数且不小于 1
    pub fn compute(current_progress: usize, estimated_total: usize, artifact_ready: bool) -> Self {
        let total_students = estimated_total.max(current_progress).max(1);
        let ratio = current_progress as f64 / total_students as f64;
        let percentage = (ratio * 100.0).round().clamp(0.0, 100.0) as u8;

        Self {
            current_progress,
            total_students,
            percentage,
            artifact_ready,
        }
    }
}
