//! 批处理作业运行器 - 编排层
//!
//! ## 职责
//!
//! 启动外部批处理进程并全程监管，直到产生唯一的 [`JobResult`]。
//!
//! ## 运行方式
//!
//! ```text
//! spawn(<python> main.py)
//!     ├── stdout 读取任务 ─┐
//!     ├── stderr 读取任务 ─┴─> 退出监控任务 ──┐
//!     └── 超时任务 ───────────────────────────┴─> CompletionLatch ─> run() 返回
//! ```
//!
//! - 输出按字节累积，结束时统一转换为文本，多字节字符不会被切断
//! - 超时任务赢得竞争后通知退出监控任务强制终止进程
//! - 结果送出后，其他路径再触发都会被忽略

use crate::config::Config;
use crate::infrastructure::extractor::resolve_program;
use crate::infrastructure::{StorageLayout, TenantKey};
use crate::models::{JobRequest, JobResult};
use crate::orchestrator::completion::CompletionLatch;
use crate::utils::logging::truncate_text;
use futures::future::join;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

/// 默认超时时间：30 分钟
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// 单次读取的缓冲区大小
const READ_CHUNK_SIZE: usize = 8 * 1024;

type SharedBuffer = Arc<Mutex<Vec<u8>>>;

/// 批处理作业运行器
#[derive(Debug, Clone)]
pub struct BatchJobRunner {
    program: PathBuf,
    args: Vec<String>,
    working_dir: PathBuf,
    extra_env: Vec<(String, String)>,
    timeout: Duration,
}

impl BatchJobRunner {
    /// `<python> main.py`，在项目根目录运行，PYTHONPATH 指向项目根目录
    pub fn new(config: &Config, layout: &StorageLayout) -> Self {
        let root = layout.project_root();
        Self {
            program: resolve_program(root, &config.python_path),
            args: vec![config.batch_script.clone()],
            working_dir: root.to_path_buf(),
            extra_env: vec![("PYTHONPATH".to_string(), root.display().to_string())],
            timeout: Duration::from_secs(config.job_timeout_secs),
        }
    }

    /// 运行任意命令（使用默认超时）
    pub fn with_command(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
            extra_env: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 运行一次批处理作业
    ///
    /// 永远返回一个结果；启动失败、执行失败、超时都体现在 [`JobResult::outcome`] 中
    pub async fn run(&self, request: &JobRequest) -> JobResult {
        let tenant = TenantKey::new(
            request.exam_name().unwrap_or_default(),
            request.teacher_username().unwrap_or_default(),
        )
        .folder();

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .envs(self.extra_env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(exam_name) = request.exam_name() {
            command.env("EXAM_NAME", exam_name);
        }
        if let Some(teacher) = request.teacher_username() {
            command.env("TEACHER_USERNAME", teacher);
        }

        info!(
            "[考试 {}] 🚀 启动批处理: {} {}",
            tenant,
            self.program.display(),
            self.args.join(" ")
        );

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("[考试 {}] ❌ 无法启动批处理进程: {}", tenant, e);
                return JobResult::launch_failed(e.to_string());
            }
        };

        let (latch, result_rx) = CompletionLatch::channel();
        let latch = Arc::new(latch);
        let stdout_buf: SharedBuffer = Arc::default();
        let stderr_buf: SharedBuffer = Arc::default();

        let stdout_reader = tokio::spawn(pump(child.stdout.take(), stdout_buf.clone(), "stdout"));
        let stderr_reader = tokio::spawn(pump(child.stderr.take(), stderr_buf.clone(), "stderr"));

        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        // 退出监控：等待进程结束（或收到终止通知），读完剩余输出后送出结果
        {
            let latch = latch.clone();
            let stdout_buf = stdout_buf.clone();
            let stderr_buf = stderr_buf.clone();
            let tenant = tenant.clone();
            tokio::spawn(async move {
                let status = tokio::select! {
                    status = child.wait() => status,
                    Ok(()) = kill_rx => {
                        if let Err(e) = child.start_kill() {
                            warn!("[考试 {}] ⚠️ 终止进程失败: {}", tenant, e);
                        }
                        child.wait().await
                    }
                };

                let _ = join(stdout_reader, stderr_reader).await;
                let output = to_text(&stdout_buf).await;
                let error_output = to_text(&stderr_buf).await;

                let result = match status {
                    Ok(status) => JobResult::from_exit(status.code(), output, error_output),
                    Err(e) => {
                        warn!("[考试 {}] ⚠️ 等待进程结束失败: {}", tenant, e);
                        JobResult::from_exit(None, output, e.to_string())
                    }
                };
                if !latch.fire(result) {
                    debug!("[考试 {}] 进程退出时结果已送出，忽略", tenant);
                }
            });
        }

        // 超时：送出超时结果并通知终止进程
        let timer = {
            let latch = latch.clone();
            let timeout = self.timeout;
            let tenant = tenant.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                let output = to_text(&stdout_buf).await;
                let error_output = to_text(&stderr_buf).await;
                if latch.fire(JobResult::timed_out(output, error_output)) {
                    warn!(
                        "[考试 {}] ⏱️ 批处理超过 {} 秒未结束，强制终止",
                        tenant,
                        timeout.as_secs()
                    );
                    let _ = kill_tx.send(());
                }
            })
        };

        let result = match result_rx.await {
            Ok(result) => result,
            Err(_) => JobResult::launch_failed("批处理监控任务意外退出"),
        };
        timer.abort();

        if result.succeeded() {
            info!("[考试 {}] ✅ {}", tenant, result.message);
        } else {
            warn!(
                "[考试 {}] ❌ {} ({:?}, 退出码 {:?})",
                tenant, result.message, result.outcome, result.exit_code
            );
        }
        result
    }
}

/// 持续读取输出流到共享缓冲区，直到 EOF
async fn pump<R>(reader: Option<R>, buffer: SharedBuffer, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return;
    };
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                debug!(
                    "[{}] {}",
                    stream,
                    truncate_text(String::from_utf8_lossy(&chunk[..n]).trim_end(), 200)
                );
                buffer.lock().await.extend_from_slice(&chunk[..n]);
            }
            Err(e) => {
                warn!("⚠️ 读取 {} 失败: {}", stream, e);
                break;
            }
        }
    }
}

async fn to_text(buffer: &SharedBuffer) -> String {
    String::from_utf8_lossy(&buffer.lock().await).to_string()
}
