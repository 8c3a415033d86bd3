#![cfg(unix)]

mod common;

use common::{write, write_reports, Fixture};
use report_orchestrator::api::{ArchiveBuildRequest, CleanupRequest, DownloadQuery, ReportQuery};
use report_orchestrator::infrastructure::storage::PROCESSED_SHEET;
use std::io::Cursor;
use tokio_test::{assert_err, assert_ok};

fn entry_names(bytes: Vec<u8>) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("不是合法的压缩包");
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).expect("读取条目失败").name().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_stage_download_and_cleanup_twice() {
    let fixture = Fixture::new();
    let dir = fixture.tenant_dir("期中", "t1");
    write_reports(&dir, &["张三", "李四"]);
    write(&dir.join(PROCESSED_SHEET), "xlsx bytes");
    write(&dir.join("images/chart.png"), "png bytes");
    let api = fixture.api("exit 0");

    let built = assert_ok!(
        api.compress_reports(&ArchiveBuildRequest {
            folder_name: "期中_t1".into(),
        })
        .await
    );
    assert!(built.success);
    assert!(built.file_name.starts_with("期中_t1_reports_"));
    assert!(built.file_name.ends_with(".zip"));
    assert!(built.download_url.starts_with("/api/download-compressed-file?filePath="));
    assert!(!built.download_id.is_empty());
    assert!(built
        .file_path
        .starts_with(fixture.layout.temp_root().to_str().unwrap()));

    let mut downloaded = Vec::<u8>::new();
    let info = assert_ok!(
        api.download_archive(
            &DownloadQuery {
                file_path: built.file_path.clone(),
                file_name: Some(built.file_name.clone()),
            },
            &mut downloaded,
        )
        .await
    );
    assert_eq!(info.bytes as usize, downloaded.len());
    assert!(info
        .file_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._-".contains(c)));

    assert_eq!(
        entry_names(downloaded),
        vec![
            "期中_t1/images/".to_string(),
            "期中_t1/images/chart.png".to_string(),
            "期中_t1/output_processed.xlsx".to_string(),
            "期中_t1/张三.md".to_string(),
            "期中_t1/李四.md".to_string(),
        ]
    );

    let request = CleanupRequest {
        file_path: built.file_path.clone(),
    };
    let first = assert_ok!(api.cleanup_archive(&request).await);
    assert!(first.success);
    assert_eq!(first.message, "压缩文件清理成功");

    let second = assert_ok!(api.cleanup_archive(&request).await);
    assert!(second.success);
    assert_eq!(second.message, "压缩文件不存在，无需清理");

    let gone = assert_err!(
        api.download_archive(
            &DownloadQuery {
                file_path: built.file_path,
                file_name: None,
            },
            &mut Vec::<u8>::new(),
        )
        .await
    );
    assert_eq!(gone.status_code(), 404);
}

#[tokio::test]
async fn test_paths_outside_temp_root_are_rejected() {
    let fixture = Fixture::new();
    let api = fixture.api("exit 0");
    let temp_root = fixture.layout.temp_root().to_path_buf();
    let traversal = format!("{}/../out/期中_t1/张三.md", temp_root.display());

    for raw in ["/etc/passwd", traversal.as_str(), "temp/a.zip"] {
        let mut sink = Vec::<u8>::new();
        let err = assert_err!(
            api.download_archive(
                &DownloadQuery {
                    file_path: raw.to_string(),
                    file_name: None,
                },
                &mut sink,
            )
            .await
        );
        assert_eq!(err.to_string(), "文件路径无效");
        assert_eq!(err.status_code(), 403);
        assert!(sink.is_empty());

        let err = assert_err!(
            api.cleanup_archive(&CleanupRequest {
                file_path: raw.to_string(),
            })
            .await
        );
        assert_eq!(err.status_code(), 403);
    }

    // 文件确实存在也不行
    assert!(std::path::Path::new("/etc/passwd").exists());
}

#[tokio::test]
async fn test_missing_file_path_is_invalid_request() {
    let fixture = Fixture::new();
    let api = fixture.api("exit 0");

    let err = assert_err!(
        api.cleanup_archive(&CleanupRequest {
            file_path: "  ".into(),
        })
        .await
    );
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_stream_only_reports_and_processed_sheet() {
    let fixture = Fixture::new();
    let dir = fixture.tenant_dir("期中", "t1");
    write_reports(&dir, &["张三", "李四"]);
    write(&dir.join(PROCESSED_SHEET), "xlsx bytes");
    write(&dir.join("notes.txt"), "not a report");
    write(&dir.join("output.xlsx"), "raw");
    let api = fixture.api("exit 0");

    let mut sink = Vec::<u8>::new();
    let streamed = assert_ok!(
        api.download_reports(&ReportQuery::by_key("期中", "t1"), &mut sink)
            .await
    );

    assert_eq!(streamed.file_name, "期中_t1_reports.zip");
    assert_eq!(streamed.entries, 3);
    assert_eq!(streamed.bytes_written as usize, sink.len());
    assert_eq!(
        entry_names(sink),
        vec![
            "output_processed.xlsx".to_string(),
            "张三.md".to_string(),
            "李四.md".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_stream_missing_or_empty_tenant() {
    let fixture = Fixture::new();
    let api = fixture.api("exit 0");

    let missing = assert_err!(
        api.download_reports(&ReportQuery::by_key("不存在", "t1"), &mut Vec::<u8>::new())
            .await
    );
    assert_eq!(missing.status_code(), 404);

    let dir = fixture.tenant_dir("期中", "t1");
    write(&dir.join("notes.txt"), "not a report");
    let mut sink = Vec::<u8>::new();
    let empty = assert_err!(
        api.download_reports(&ReportQuery::by_key("期中", "t1"), &mut sink)
            .await
    );
    assert_eq!(empty.status_code(), 404);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_compress_rejects_bad_folder_names() {
    let fixture = Fixture::new();
    let api = fixture.api("exit 0");

    let err = assert_err!(
        api.compress_reports(&ArchiveBuildRequest {
            folder_name: "../in".into(),
        })
        .await
    );
    assert_eq!(err.status_code(), 400);

    let err = assert_err!(
        api.compress_reports(&ArchiveBuildRequest {
            folder_name: "期末_t1".into(),
        })
        .await
    );
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_failed_staging_leaves_no_partial_archive() {
    let fixture = Fixture::new();
    let dir = fixture.tenant_dir("期中", "t1");
    write_reports(&dir, &["张三"]);
    std::os::unix::fs::symlink(dir.join("不存在.md"), dir.join("broken.md")).expect("创建链接失败");
    let api = fixture.api("exit 0");

    assert_err!(
        api.compress_reports(&ArchiveBuildRequest {
            folder_name: "期中_t1".into(),
        })
        .await
    );

    let temp_root = fixture.layout.temp_root();
    let leftovers: Vec<_> = std::fs::read_dir(temp_root)
        .expect("临时目录应已创建")
        .map(|entry| entry.expect("读取条目失败").file_name())
        .collect();
    assert!(leftovers.is_empty(), "残留文件: {:?}", leftovers);
}
