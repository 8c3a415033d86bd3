//! 基础设施层
//!
//! 持有目录布局和外部工具，只暴露能力，不处理业务流程

pub mod extractor;
pub mod storage;
pub mod tenant;

pub use extractor::SheetExtractor;
pub use storage::StorageLayout;
pub use tenant::{resolve_tenant_dir_name, TenantFolder, TenantKey};
