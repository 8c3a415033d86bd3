//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 负责外部批处理进程的启动、监管和结束判定，是唯一会创建子进程的地方
//! （提取工具的调用属于基础设施层）。
//!
//! ## 模块划分
//!
//! ### `completion` - 单次完成信号
//! - 多条路径竞争同一个结果，第一个到达的生效
//!
//! ### `job_runner` - 批处理作业运行器
//! - 构造命令和环境变量（EXAM_NAME / TEACHER_USERNAME / PYTHONPATH）
//! - 增量收集 stdout / stderr
//! - 强制超时
//! - 判定成功、失败、超时、启动失败
//!
//! ## 层次关系
//!
//! ```text
//! app::App (命令行驱动)  /  api::ReportApi (请求入口)
//!     ↓
//! orchestrator::BatchJobRunner
//!     ↓
//! 外部批处理进程（写入 out/<考试目录>/）
//! ```

pub mod completion;
pub mod job_runner;

pub use completion::CompletionLatch;
pub use job_runner::BatchJobRunner;
