pub mod archive;
pub mod history;
pub mod job;
pub mod progress;
pub mod report;

pub use archive::{ArchiveHandle, CleanupOutcome, StreamedArchive};
pub use history::{HistoryEntry, IntakeStatus, StudentExamEntry};
pub use job::{JobOutcome, JobRequest, JobResult, ALREADY_PROCESSED_MARKER};
pub use progress::ProgressSnapshot;
pub use report::{ReportItem, ReportRow, SheetReport, SheetTable, StudentReport};
