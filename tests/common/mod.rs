//! 集成测试共用的目录和假工具
//!
//! 外部 Python 用 `sh -c` 代替：提取工具的调用形式是
//! `<解释器> -c <脚本> <表格路径> [工作表]`，在 sh 中表格路径是 `$0`，工作表是 `$1`

#![allow(dead_code)]

use report_orchestrator::api::ReportApi;
use report_orchestrator::infrastructure::SheetExtractor;
use report_orchestrator::{BatchJobRunner, StorageLayout, TenantKey};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 行数模式：表格文件的内容就是工具的输出
pub const COUNT_SCRIPT: &str = r#"cat "$0""#;

/// 工作表模式：只认 grammar_table，表格文件的内容就是 JSON 输出
pub const SHEET_SCRIPT: &str = r#"if [ "$1" = "grammar_table" ]; then cat "$0"; else echo '{"error":"no such sheet"}'; fi"#;

/// 一个临时的项目根目录
pub struct Fixture {
    pub root: TempDir,
    pub layout: StorageLayout,
}

impl Fixture {
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt::try_init();
        let root = tempfile::tempdir().expect("创建临时目录失败");
        let layout = StorageLayout::new(root.path(), "in", "out", "temp");
        Self { root, layout }
    }

    pub fn extractor(&self) -> SheetExtractor {
        SheetExtractor::with_scripts("sh", self.layout.project_root(), COUNT_SCRIPT, SHEET_SCRIPT)
    }

    /// 用 `sh -c <script>` 代替批处理
    pub fn runner(&self, script: &str) -> BatchJobRunner {
        BatchJobRunner::with_command(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            self.layout.project_root(),
        )
    }

    pub fn api(&self, job_script: &str) -> ReportApi {
        ReportApi::from_parts(
            self.layout.clone(),
            self.runner(job_script),
            self.extractor(),
            9,
            "grammar_table",
        )
    }

    /// 创建考试目录并返回路径
    pub fn tenant_dir(&self, exam: &str, teacher: &str) -> PathBuf {
        let dir = self.layout.tenant_dir(&TenantKey::new(exam, teacher).folder());
        fs::create_dir_all(&dir).expect("创建考试目录失败");
        dir
    }

    pub fn inbox(&self) -> PathBuf {
        let dir = self.layout.inbox_dir().to_path_buf();
        fs::create_dir_all(&dir).expect("创建收件目录失败");
        dir
    }
}

pub fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("创建父目录失败");
    }
    fs::write(path, content).expect("写入文件失败");
}

/// 写入若干学生报告
pub fn write_reports(dir: &Path, names: &[&str]) {
    for name in names {
        write(&dir.join(format!("{}.md", name)), &format!("# {}\n", name));
    }
}
