//! End-to-end tests of the log pipeline: real follower process, real
//! queue, real shipper, recording backend.

mod common;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use common::RecordingBackend;
use hostwatch_agent::backend::Backend;
use hostwatch_agent::logs::queue::EventQueue;
use hostwatch_agent::logs::shipper::LogShipper;
use hostwatch_agent::logs::source::{LogOrigin, LogSource};
use hostwatch_agent::logs::tailer::LogTailer;

async fn wait_for_queued(queue: &EventQueue, count: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while queue.len() < count && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_lines_written_in_one_interval_ship_as_one_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    std::fs::File::create(&path).unwrap();

    let source = LogSource {
        name: "app.log".to_string(),
        origin: LogOrigin::File(path.clone()),
    };
    let queue = EventQueue::new();
    let cancel = CancellationToken::new();
    let tailer = LogTailer::new(source.clone(), queue.clone(), cancel.clone()).spawn();

    let backend = Arc::new(RecordingBackend::new());
    let mut shipper = LogShipper::initialize(
        Arc::clone(&backend) as Arc<dyn Backend>,
        "/system/default/i-test",
        vec![(source, queue.clone())],
    )
    .await
    .unwrap();

    // Let the follower subscribe, then write three lines within one interval
    tokio::time::sleep(Duration::from_millis(300)).await;
    {
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap();
        writeln!(file, "first line").unwrap();
        writeln!(file, "second line").unwrap();
        writeln!(file, "third line").unwrap();
    }
    wait_for_queued(&queue, 3).await;

    // One shipping tick: exactly one append carrying the lines in order
    let shipped = shipper.ship_all().await.unwrap();
    assert_eq!(shipped, 3);

    let appends = backend.appends.lock().unwrap().clone();
    assert_eq!(appends.len(), 1);
    assert_eq!(appends[0].group, "/system/default/i-test");
    assert_eq!(appends[0].stream, "app.log");
    assert_eq!(
        appends[0].messages,
        vec!["first line", "second line", "third line"]
    );

    // A tick with no new lines makes no backend call at all
    let shipped = shipper.ship_all().await.unwrap();
    assert_eq!(shipped, 0);
    assert_eq!(backend.append_count(), 1);

    cancel.cancel();
    tailer.await.unwrap();
}

#[tokio::test]
async fn test_appends_chain_tokens_across_intervals() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chained.log");
    std::fs::File::create(&path).unwrap();

    let source = LogSource {
        name: "chained.log".to_string(),
        origin: LogOrigin::File(path.clone()),
    };
    let queue = EventQueue::new();
    let cancel = CancellationToken::new();
    let tailer = LogTailer::new(source.clone(), queue.clone(), cancel.clone()).spawn();

    let backend = Arc::new(RecordingBackend::new());
    let mut shipper = LogShipper::initialize(
        Arc::clone(&backend) as Arc<dyn Backend>,
        "/group",
        vec![(source, queue.clone())],
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .unwrap();

    writeln!(file, "interval one").unwrap();
    file.flush().unwrap();
    wait_for_queued(&queue, 1).await;
    shipper.ship_all().await.unwrap();

    writeln!(file, "interval two").unwrap();
    file.flush().unwrap();
    wait_for_queued(&queue, 1).await;
    shipper.ship_all().await.unwrap();

    let appends = backend.appends.lock().unwrap().clone();
    assert_eq!(appends.len(), 2);
    // Fresh stream: first append has no token, second uses the returned one
    assert_eq!(appends[0].token, None);
    assert_eq!(appends[1].token, Some("tok-1".to_string()));

    cancel.cancel();
    tailer.await.unwrap();
}

#[tokio::test]
async fn test_tailer_survives_file_rotation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rotating.log");
    std::fs::File::create(&path).unwrap();

    let source = LogSource {
        name: "rotating.log".to_string(),
        origin: LogOrigin::File(path.clone()),
    };
    let queue = EventQueue::new();
    let cancel = CancellationToken::new();
    let tailer = LogTailer::new(source, queue.clone(), cancel.clone()).spawn();

    tokio::time::sleep(Duration::from_millis(300)).await;
    {
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap();
        writeln!(file, "before rotation").unwrap();
    }
    wait_for_queued(&queue, 1).await;

    // Rotate: remove and recreate under the same name
    std::fs::remove_file(&path).unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    std::fs::write(&path, "after rotation\n").unwrap();
    wait_for_queued(&queue, 2).await;

    let messages: Vec<String> = queue.drain().into_iter().map(|e| e.message).collect();
    assert_eq!(messages, vec!["before rotation", "after rotation"]);

    cancel.cancel();
    tailer.await.unwrap();
}
