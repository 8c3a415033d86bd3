//! 命令行驱动 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：写日志文件头，按配置组装运行器和进度服务
//! 2. **上传检查**：确认收件目录中的源文档和学生名单
//! 3. **运行作业**：启动批处理，同时按固定间隔轮询进度
//! 4. **收尾统计**：输出最终进度，追加作业记录

use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::{SheetExtractor, StorageLayout, TenantKey};
use crate::models::{JobOutcome, JobRequest, JobResult};
use crate::orchestrator::BatchJobRunner;
use crate::services::{check_intake, ProgressService};
use crate::utils::logging::{append_job_summary, init_log_file, log_startup, print_final_stats};
use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    layout: StorageLayout,
    runner: BatchJobRunner,
    progress: ProgressService,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        let layout = StorageLayout::from_config(&config);
        let extractor = SheetExtractor::new(&config, layout.project_root());
        let runner = BatchJobRunner::new(&config, &layout);
        let progress =
            ProgressService::new(layout.clone(), extractor, config.default_total_students);

        Ok(Self {
            config,
            layout,
            runner,
            progress,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let request = JobRequest::new(
            self.config.exam_name.clone(),
            self.config.teacher_username.clone(),
        );
        let key = TenantKey::new(
            request.exam_name().unwrap_or_default(),
            request.teacher_username().unwrap_or_default(),
        );
        let folder = key.folder();

        log_startup(folder.as_str(), self.config.job_timeout_secs);

        let intake = check_intake(&self.layout).await;
        if intake.ready() {
            info!("📄 上传文件就绪: {}", intake.pdf_path.display());
        } else {
            warn!(
                "⚠️ 上传文件不完整 (PDF: {}, Excel: {})，批处理可能失败",
                intake.pdf_exists, intake.excel_exists
            );
        }

        let result = self.run_with_progress(&request, &key).await;

        let snapshot = self.progress.get_progress(&key).await;
        print_final_stats(
            &result,
            snapshot.current_progress,
            snapshot.total_students,
            &self.config.output_log_file,
        );
        append_job_summary(&self.config.output_log_file, folder.as_str(), &result)?;

        if result.outcome == JobOutcome::LaunchFailed {
            let message = result.error.unwrap_or(result.message);
            return Err(AppError::JobLaunch(message).into());
        }
        Ok(())
    }

    /// 运行批处理，期间按间隔输出进度
    async fn run_with_progress(&self, request: &JobRequest, key: &TenantKey) -> JobResult {
        let job = self.runner.run(request);
        tokio::pin!(job);

        let period = Duration::from_secs(self.config.progress_poll_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        // 第一次 tick 立即完成，跳过
        ticker.tick().await;

        loop {
            tokio::select! {
                result = &mut job => break result,
                _ = ticker.tick() => {
                    let snapshot = self.progress.get_progress(key).await;
                    info!(
                        "[考试 {}] 📈 进度 {}/{} ({}%)",
                        key.folder(),
                        snapshot.current_progress,
                        snapshot.total_students,
                        snapshot.percentage
                    );
                }
            }
        }
    }
}
