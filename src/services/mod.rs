pub mod archive_service;
pub mod history_service;
pub mod intake_service;
pub mod progress_service;
pub mod report_service;

pub use archive_service::ArchiveService;
pub use history_service::HistoryService;
pub use intake_service::check_intake;
pub use progress_service::{ProgressService, TotalSource};
pub use report_service::ReportService;
