//! Live tailing against real files that grow while being watched

use poe_log_watcher::{
    watch, CancellationToken, EventStream, LogEvent, LogTailer, TailConfig, TailError,
};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

const PREFIX: &str = "2023/01/01 12:00:00 123456789 abc [INFO Client 1234]";
const WAIT: Duration = Duration::from_secs(5);

fn chat(name: &str, message: &str) -> String {
    format!("{} #{}: {}\r\n", PREFIX, name, message)
}

fn append(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
}

fn fast_config() -> TailConfig {
    TailConfig::default().with_poll_interval(Duration::from_millis(5))
}

/// Give the tailer time to observe and consume what was written
async fn settle() {
    sleep(Duration::from_millis(60)).await;
}

async fn next_event(stream: &mut EventStream) -> LogEvent {
    timeout(WAIT, stream.next())
        .await
        .expect("timed out waiting for event")
        .expect("stream ended early")
}

fn message_of(event: &LogEvent) -> &str {
    match event {
        LogEvent::PublicChatMessage { message, .. } => message,
        other => panic!("Expected PublicChatMessage, got {:?}", other),
    }
}

#[tokio::test]
async fn test_open_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();

    let result = watch(dir.path().join("Client.txt"), fast_config(), &cancel).await;
    assert!(matches!(result, Err(TailError::Open { .. })));
}

#[tokio::test]
async fn test_open_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = LogTailer::open(dir.path(), fast_config()).await;
    assert!(matches!(result, Err(TailError::Open { .. })));
}

#[tokio::test]
async fn test_existing_content_is_not_replayed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Client.txt");
    std::fs::write(&path, chat("Old", "before open")).unwrap();

    let cancel = CancellationToken::new();
    let mut stream = watch(&path, fast_config(), &cancel).await.unwrap();

    append(&path, chat("New", "after open").as_bytes());
    let event = next_event(&mut stream).await;
    assert_eq!(event.speaker(), Some("New"));
    assert_eq!(message_of(&event), "after open");

    let stats = stream.finish().await.unwrap();
    assert_eq!(stats.events_emitted, 1);
}

#[tokio::test]
async fn test_line_split_mid_character_and_separator() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Client.txt");
    std::fs::write(&path, b"").unwrap();

    // one-byte reads: every multi-byte character and every `\r\n` in the
    // text is cut by a read boundary, whatever the scheduling
    let config = TailConfig {
        max_read_bytes: 1,
        ..fast_config()
    };
    let cancel = CancellationToken::new();
    let mut stream = watch(&path, config, &cancel).await.unwrap();

    let first = chat("Zoë", "über ✓");
    let second = chat("Bob", "second");
    let bytes = [first.as_bytes(), second.as_bytes()].concat();
    append(&path, &bytes);

    let a = next_event(&mut stream).await;
    assert_eq!(a.speaker(), Some("Zoë"));
    assert_eq!(message_of(&a), "über ✓");

    let b = next_event(&mut stream).await;
    assert_eq!(b.speaker(), Some("Bob"));
    assert_eq!(message_of(&b), "second");

    let stats = stream.finish().await.unwrap();
    assert_eq!(stats.events_emitted, 2);
    assert_eq!(stats.lines_seen, 2);
    assert_eq!(stats.bytes_read, bytes.len() as u64);
}

#[tokio::test]
async fn test_overlong_fragment_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Client.txt");
    std::fs::write(&path, b"").unwrap();

    let config = TailConfig {
        max_read_bytes: 64,
        max_line_bytes: 128,
        ..fast_config()
    };
    let cancel = CancellationToken::new();
    let mut stream = watch(&path, config, &cancel).await.unwrap();

    let text = format!("{}\r\n{}", "x".repeat(400), chat("A", "after"));
    append(&path, text.as_bytes());

    let event = next_event(&mut stream).await;
    assert_eq!(event.speaker(), Some("A"));
    assert_eq!(message_of(&event), "after");

    let stats = stream.finish().await.unwrap();
    assert!(stats.bytes_dropped > 0);
    assert!(stats.bytes_dropped < 400);
    assert_eq!(stats.lines_seen, 2);
    assert_eq!(stats.lines_unrecognized, 1);
    assert_eq!(stats.events_emitted, 1);
    assert_eq!(stats.bytes_read, text.len() as u64);
}

#[tokio::test]
async fn test_burst_order_is_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Client.txt");
    std::fs::write(&path, b"").unwrap();

    // small reads force the burst to be consumed over many steps
    let config = TailConfig {
        max_read_bytes: 37,
        ..fast_config()
    };
    let cancel = CancellationToken::new();
    let mut stream = watch(&path, config, &cancel).await.unwrap();

    let burst: String = (0..200).map(|i| chat("Spam", &i.to_string())).collect();
    append(&path, burst.as_bytes());

    for i in 0..200 {
        let event = next_event(&mut stream).await;
        assert_eq!(message_of(&event), i.to_string());
    }
    stream.finish().await.unwrap();
}

#[tokio::test]
async fn test_unrecognized_lines_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Client.txt");
    std::fs::write(&path, b"").unwrap();

    let cancel = CancellationToken::new();
    let mut stream = watch(&path, fast_config(), &cancel).await.unwrap();

    let text = format!(
        "{}{} Got Instance Details from login server\r\nnot even a log line\r\n{}",
        chat("A", "one"),
        PREFIX,
        chat("B", "two")
    );
    append(&path, text.as_bytes());

    assert_eq!(next_event(&mut stream).await.speaker(), Some("A"));
    assert_eq!(next_event(&mut stream).await.speaker(), Some("B"));

    let stats = stream.finish().await.unwrap();
    assert_eq!(stats.lines_seen, 4);
    assert_eq!(stats.lines_unrecognized, 2);
    assert_eq!(stats.events_emitted, 2);
}

#[tokio::test]
async fn test_cancel_does_not_wait_out_the_interval() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Client.txt");
    std::fs::write(&path, b"").unwrap();

    let config = TailConfig::default().with_poll_interval(Duration::from_secs(600));
    let cancel = CancellationToken::new();
    let mut stream = watch(&path, config, &cancel).await.unwrap();
    settle().await;

    cancel.cancel();
    let ended = timeout(Duration::from_secs(2), stream.next()).await.unwrap();
    assert!(ended.is_none());

    let stats = timeout(Duration::from_secs(2), stream.finish())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stats.events_emitted, 0);
}

/// Descriptors of this process that point at `path`
#[cfg(target_os = "linux")]
fn open_handles(path: &Path) -> usize {
    let target = std::fs::canonicalize(path).unwrap();
    std::fs::read_dir("/proc/self/fd")
        .unwrap()
        .filter_map(|entry| std::fs::read_link(entry.ok()?.path()).ok())
        .filter(|link| *link == target)
        .count()
}

#[cfg(target_os = "linux")]
async fn wait_for_handles(path: &Path, expected: usize) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while open_handles(path) != expected {
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected {} open handles on {}, found {}",
            expected,
            path.display(),
            open_handles(path)
        );
        sleep(Duration::from_millis(10)).await;
    }
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_handle_released_on_every_exit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Client.txt");
    std::fs::write(&path, b"").unwrap();
    assert_eq!(open_handles(&path), 0);

    // cancelled while sleeping through a long interval
    let config = TailConfig::default().with_poll_interval(Duration::from_secs(600));
    let cancel = CancellationToken::new();
    let stream = watch(&path, config, &cancel).await.unwrap();
    assert_eq!(open_handles(&path), 1);
    cancel.cancel();
    timeout(WAIT, stream.finish()).await.unwrap().unwrap();
    wait_for_handles(&path, 0).await;

    // stream dropped without finish
    let stream = watch(&path, fast_config(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(open_handles(&path), 1);
    drop(stream);
    wait_for_handles(&path, 0).await;

    // receiver gone
    let tailer = LogTailer::open(&path, fast_config()).await.unwrap();
    assert_eq!(open_handles(&path), 1);
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let task = tokio::spawn(tailer.run(tx, CancellationToken::new()));
    append(&path, chat("A", "nobody listens").as_bytes());
    timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    wait_for_handles(&path, 0).await;
}

#[tokio::test]
async fn test_truncation_resumes_from_new_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Client.txt");
    std::fs::write(&path, chat("Old", "history").repeat(10)).unwrap();

    let cancel = CancellationToken::new();
    let mut stream = watch(&path, fast_config(), &cancel).await.unwrap();

    // leave a partial line pending, then truncate
    append(&path, b"2023/01/01 12:00:00 partial");
    settle().await;
    OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(0)
        .unwrap();
    settle().await;

    append(&path, chat("New", "fresh").as_bytes());
    let event = next_event(&mut stream).await;
    assert_eq!(event.speaker(), Some("New"));
    assert_eq!(message_of(&event), "fresh");

    stream.finish().await.unwrap();
}

#[tokio::test]
async fn test_run_stops_when_receiver_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Client.txt");
    std::fs::write(&path, b"").unwrap();

    let tailer = LogTailer::open(&path, fast_config()).await.unwrap();
    assert_eq!(tailer.offset(), 0);

    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let task = tokio::spawn(tailer.run(tx, CancellationToken::new()));

    append(&path, chat("A", "nobody listens").as_bytes());
    let stats = timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert_eq!(stats.events_emitted, 0);
    assert_eq!(stats.lines_seen, 1);
}

#[tokio::test]
async fn test_parent_cancellation_ends_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Client.txt");
    std::fs::write(&path, b"").unwrap();

    let parent = CancellationToken::new();
    let mut stream = watch(&path, fast_config(), &parent).await.unwrap();

    append(&path, chat("A", "one").as_bytes());
    assert_eq!(next_event(&mut stream).await.speaker(), Some("A"));

    parent.cancel();
    assert!(timeout(WAIT, stream.next()).await.unwrap().is_none());
    stream.finish().await.unwrap();
}
