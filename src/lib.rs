//! # Report Orchestrator
//!
//! 批改报告生成的编排与进度跟踪
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 目录布局和外部工具，只暴露能力
//! - `tenant` - 唯一的"考试 + 老师 → 目录名"推导
//! - `StorageLayout` - in / out / temp 目录
//! - `SheetExtractor` - 通过外部解释器读取表格
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个服务只管一件事
//! - `ProgressService` - 算进度
//! - `ReportService` - 读报告
//! - `ArchiveService` - 打包导出
//! - `HistoryService` - 历史考试
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/job_runner` - 启动并监管批处理进程，产生唯一结果
//! - `app` - 命令行驱动：运行作业并轮询进度
//!
//! ### ④ 接口层（API）
//! - `api/` - 请求 / 响应结构和错误约定，路由框架由调用方提供
//!
//! ## 模块结构

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use api::ReportApi;
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{resolve_tenant_dir_name, StorageLayout, TenantFolder, TenantKey};
pub use models::{JobOutcome, JobRequest, JobResult, ProgressSnapshot};
pub use orchestrator::BatchJobRunner;
