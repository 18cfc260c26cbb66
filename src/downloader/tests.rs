use super::test_helpers::*;
use super::*;
use crate::error::{Error, NotifyError};
use crate::fs::LocalFileSystem;
use crate::progress::NoProgress;
use crate::types::DownloadRequest;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn scenario_request() -> DownloadRequest {
    DownloadRequest::new("u1").with_requester("r1")
}

#[tokio::test]
async fn test_download_stores_notifies_and_reports_progress() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (downloader, _dir) = create_test_downloader(
        Arc::new(ScriptedFetcher::test_video()),
        Some(notifier.clone()),
    );
    let progress = RecordingProgress::default();

    let completed = downloader
        .download(&scenario_request(), &progress, &CancellationToken::new())
        .await
        .unwrap();

    // One 13-byte file named after the id
    assert_eq!(completed.bytes_written, 13);
    assert_eq!(stored_files(&downloader), vec![completed.path.clone()]);
    assert_eq!(std::fs::read(&completed.path).unwrap(), b"video_content");
    assert_eq!(completed.item.stored_name, format!("{}.mp4", completed.id));

    // start(13), updates summing to 13, finish()
    let events = progress.events();
    assert_eq!(events.first(), Some(&ProgressEvent::Start(13)));
    assert_eq!(events.last(), Some(&ProgressEvent::Finish));
    let updates = progress.updates();
    assert!(updates.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(updates.last(), Some(&13));

    // Record saved under the generated id
    let item = downloader.store().get(&completed.id).unwrap();
    assert_eq!(item.source_url, "u1");
    assert_eq!(item.requester, "r1");
    assert_eq!(item.filename, "Test_Video");
    assert_eq!(item.media_type, "video/mp4");

    // Exactly one notification referencing the id
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message, completed.id.to_string());
    assert_eq!(sent[0].recipient, "r1");
    assert_eq!(sent[0].title, "Test Video");
}

#[tokio::test]
async fn test_fetch_failure_has_no_side_effects() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (downloader, _dir) = create_test_downloader(
        Arc::new(ScriptedFetcher::test_video()),
        Some(notifier.clone()),
    );
    let progress = RecordingProgress::default();

    let err = downloader
        .download(&DownloadRequest::new("bad"), &progress, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::Fetch { url, source } => {
            assert_eq!(url, "bad");
            assert_eq!(source.to_string(), "video not found");
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
    assert!(stored_files(&downloader).is_empty());
    assert!(downloader.store().is_empty());
    assert!(notifier.sent().is_empty());
    assert!(progress.events().is_empty());
}

#[tokio::test]
async fn test_no_encodings_is_fetch_error() {
    let mut fetcher = ScriptedFetcher::test_video();
    fetcher.encodings.clear();
    let (downloader, _dir) = create_test_downloader(Arc::new(fetcher), None);

    let err = downloader
        .download(&scenario_request(), &NoProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Fetch { .. }));
    assert!(stored_files(&downloader).is_empty());
}

#[tokio::test]
async fn test_stream_failure_has_no_side_effects() {
    let mut fetcher = ScriptedFetcher::test_video();
    fetcher.fail_open = true;
    let (downloader, _dir) = create_test_downloader(Arc::new(fetcher), None);
    let progress = RecordingProgress::default();

    let err = downloader
        .download(&scenario_request(), &progress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Stream { .. }));
    assert!(stored_files(&downloader).is_empty());
    assert!(progress.events().is_empty());
}

#[tokio::test]
async fn test_missing_url_is_rejected_before_fetching() {
    let fetcher = Arc::new(ScriptedFetcher::test_video());
    let (downloader, _dir) = create_test_downloader(fetcher.clone(), None);

    let err = downloader
        .download(&DownloadRequest::new(""), &NoProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingField("url")));
    assert_eq!(fetcher.resolved.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_under_delivering_source_is_not_an_error() {
    let mut fetcher = ScriptedFetcher::test_video();
    fetcher.announced_bytes = Some(100);
    let (downloader, _dir) = create_test_downloader(Arc::new(fetcher), None);
    let progress = RecordingProgress::default();

    let completed = downloader
        .download(&scenario_request(), &progress, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(progress.events().first(), Some(&ProgressEvent::Start(100)));
    assert_eq!(progress.updates().last(), Some(&13));
    assert_eq!(completed.bytes_written, 13);
    assert_eq!(std::fs::metadata(&completed.path).unwrap().len(), 13);
}

#[tokio::test]
async fn test_progress_follows_each_chunk() {
    let fetcher = ScriptedFetcher::test_video().with_end(StreamEnd::Chunked);
    let (downloader, _dir) = create_test_downloader(Arc::new(fetcher), None);
    let progress = RecordingProgress::default();

    let completed = downloader
        .download(&scenario_request(), &progress, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(progress.updates(), vec![6, 13]);
    assert_eq!(std::fs::read(&completed.path).unwrap(), b"video_content");
}

#[tokio::test]
async fn test_create_failure_is_storage_error() {
    let fs = Arc::new(FailingFileSystem::new(FailAt::Create));
    let (downloader, _dir) = create_test_downloader_with_fs(
        Arc::new(ScriptedFetcher::test_video()),
        fs,
        None,
    );
    let progress = RecordingProgress::default();

    let err = downloader
        .download(&scenario_request(), &progress, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::Storage { operation, .. } => assert_eq!(operation, "creating file"),
        other => panic!("expected storage error, got {other:?}"),
    }
    assert!(progress.events().is_empty());
    assert!(downloader.store().is_empty());
}

#[tokio::test]
async fn test_write_failure_is_storage_error_without_record() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (downloader, _dir) = create_test_downloader_with_fs(
        Arc::new(ScriptedFetcher::test_video()),
        Arc::new(FailingFileSystem::new(FailAt::Write)),
        Some(notifier.clone()),
    );
    let progress = RecordingProgress::default();

    let err = downloader
        .download(&scenario_request(), &progress, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::Storage { operation, .. } => assert_eq!(operation, "writing to"),
        other => panic!("expected storage error, got {other:?}"),
    }
    assert_eq!(progress.events(), vec![ProgressEvent::Start(13)]);
    assert!(downloader.store().is_empty());
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_interrupted_source_leaves_partial_file() {
    let fetcher = ScriptedFetcher::test_video().with_end(StreamEnd::Fail);
    let (downloader, _dir) = create_test_downloader(Arc::new(fetcher), None);

    let err = downloader
        .download(&scenario_request(), &NoProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::Storage { operation, path, .. } => {
            assert_eq!(operation, "copying stream to");
            // Partial files are reconciled by the caller
            assert!(path.exists());
        }
        other => panic!("expected storage error, got {other:?}"),
    }
    assert!(downloader.store().is_empty());
}

#[tokio::test]
async fn test_notify_failure_keeps_file_and_record() {
    let notifier = Arc::new(RecordingNotifier::failing(500));
    let (downloader, _dir) = create_test_downloader(
        Arc::new(ScriptedFetcher::test_video()),
        Some(notifier.clone()),
    );

    let err = downloader
        .download(&scenario_request(), &NoProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    let id = match err {
        Error::Notify {
            id,
            source: NotifyError::Status(500),
        } => id,
        other => panic!("expected notify error, got {other:?}"),
    };
    assert_eq!(notifier.sent().len(), 1);
    let item = downloader.store().get(&id).unwrap();
    let path = downloader.config().video_dir().join(&item.stored_name);
    assert_eq!(std::fs::read(path).unwrap(), b"video_content");
}

#[tokio::test]
async fn test_cancel_mid_copy_removes_partial_file() {
    let notifier = Arc::new(RecordingNotifier::default());
    let fetcher = ScriptedFetcher::test_video().with_end(StreamEnd::Stall);
    let (downloader, _dir) = create_test_downloader(Arc::new(fetcher), Some(notifier.clone()));
    let progress = RecordingProgress::default();
    let token = CancellationToken::new();
    let request = scenario_request();

    let cancel_after_first_chunk = async {
        while progress.updates().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        // The copy loop is now blocked on the stalled source
        assert_eq!(stored_files(&downloader).len(), 1);
        token.cancel();
    };

    let (result, ()) = tokio::join!(
        downloader.download(&request, &progress, &token),
        cancel_after_first_chunk
    );

    assert!(matches!(result, Err(Error::Cancelled { .. })));
    assert!(stored_files(&downloader).is_empty());
    assert!(downloader.store().is_empty());
    assert!(notifier.sent().is_empty());
    assert!(!progress.events().contains(&ProgressEvent::Finish));
}

#[tokio::test]
async fn test_cancelled_before_start_creates_nothing_lasting() {
    let (downloader, _dir) =
        create_test_downloader(Arc::new(ScriptedFetcher::test_video()), None);
    let token = CancellationToken::new();
    token.cancel();

    let result = downloader
        .download(&scenario_request(), &NoProgress, &token)
        .await;

    assert!(matches!(result, Err(Error::Cancelled { .. })));
    assert!(stored_files(&downloader).is_empty());
}

#[tokio::test]
async fn test_cancel_closes_then_removes() {
    let (downloader, _dir) =
        create_test_downloader(Arc::new(ScriptedFetcher::test_video()), None);
    let path = downloader.config().video_dir().join("partial.mp4");

    let writer = LocalFileSystem.create_new(&path).await.unwrap();
    downloader
        .cancel(OpenFile::new(path.clone(), writer))
        .await
        .unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_cancel_of_already_removed_file_fails_cleanly() {
    let (downloader, _dir) =
        create_test_downloader(Arc::new(ScriptedFetcher::test_video()), None);
    let path = downloader.config().video_dir().join("partial.mp4");

    let writer = LocalFileSystem.create_new(&path).await.unwrap();
    std::fs::remove_file(&path).unwrap();

    match downloader.cancel(OpenFile::new(path, writer)).await {
        Err(Error::Storage { operation, .. }) => assert_eq!(operation, "removing"),
        other => panic!("expected storage error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_close_failure_skips_removal() {
    let fs = Arc::new(FailingFileSystem::new(FailAt::Close));
    let (downloader, _dir) = create_test_downloader_with_fs(
        Arc::new(ScriptedFetcher::test_video()),
        fs.clone(),
        None,
    );
    let path = downloader.config().video_dir().join("partial.mp4");
    let writer = fs.create_new(&path).await.unwrap();

    match downloader.cancel(OpenFile::new(path, writer)).await {
        Err(Error::Storage { operation, .. }) => assert_eq!(operation, "closing"),
        other => panic!("expected storage error, got {other:?}"),
    }
    assert_eq!(fs.removes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_downloads_keep_records_and_files_in_lockstep() {
    let (downloader, _dir) =
        create_test_downloader(Arc::new(ScriptedFetcher::test_video()), None);

    let mut handles = Vec::new();
    for i in 0..8 {
        let downloader = downloader.clone();
        handles.push(tokio::spawn(async move {
            let request = DownloadRequest::new(format!("u{i}")).with_requester("r1");
            downloader
                .download(&request, &NoProgress, &CancellationToken::new())
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);

    assert_eq!(downloader.store().len(), 8);
    assert_eq!(stored_files(&downloader).len(), 8);
    for id in &ids {
        let item = downloader.store().get(id).unwrap();
        assert!(downloader.config().video_dir().join(&item.stored_name).is_file());
    }
}
