//! Channel and single-stage tests: backpressure, completion order, end-of-stream broadcast.

mod common;

use common::{RecordingSink, Scripted, ScriptedFetcher};
use spriteflow::engine::{ArtifactHandle, ArtifactStore, RawDecoder};
use spriteflow::pipeline::{
    FanOutContext, Message, TransformContext, broadcast_end_of_stream, fetch_task, run_consumer,
    run_fan_out, run_transform, stage_channel,
};
use spriteflow::{FetchOutcome, ItemDescriptor, SharedRecord};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn names_until_end(rx: &spriteflow::pipeline::StageReceiver<ArtifactHandle>) -> Vec<String> {
    let mut names = Vec::new();
    loop {
        match rx.take_timeout(WAIT).unwrap() {
            Message::Item(h) => names.push(h.name().to_string()),
            Message::EndOfStream => break,
        }
        rx.task_done();
    }
    names
}

// --- channel ---

#[test]
fn test_channel_fifo_then_end_of_stream() {
    let (tx, rx) = stage_channel::<u32>("t", 4);
    tx.put(1).unwrap();
    tx.put(2).unwrap();
    tx.close().unwrap();
    assert!(matches!(rx.take().unwrap(), Message::Item(1)));
    assert!(matches!(rx.take().unwrap(), Message::Item(2)));
    assert!(rx.take().unwrap().is_end_of_stream());
}

#[test]
fn test_channel_put_blocks_when_full() {
    let (tx, rx) = stage_channel::<u32>("t", 1);
    tx.put(1).unwrap();
    assert_eq!(tx.len(), 1);

    let second_done = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&second_done);
    let producer = thread::spawn(move || {
        tx.put(2).unwrap();
        flag.store(true, Ordering::SeqCst);
    });

    thread::sleep(Duration::from_millis(150));
    assert!(!second_done.load(Ordering::SeqCst), "put beyond capacity must block");
    assert_eq!(rx.len(), 1);

    assert!(matches!(rx.take().unwrap(), Message::Item(1)));
    producer.join().unwrap();
    assert!(second_done.load(Ordering::SeqCst));
    assert!(matches!(rx.take().unwrap(), Message::Item(2)));
}

#[test]
fn test_channel_never_exceeds_capacity() {
    let (tx, rx) = stage_channel::<u32>("t", 3);
    assert_eq!(tx.capacity(), 3);
    let producer = thread::spawn(move || {
        for i in 0..20 {
            tx.put(i).unwrap();
        }
        tx.close().unwrap();
    });
    let mut got = Vec::new();
    loop {
        assert!(rx.len() <= 3);
        thread::sleep(Duration::from_millis(2));
        match rx.take().unwrap() {
            Message::Item(i) => got.push(i),
            Message::EndOfStream => break,
        }
    }
    producer.join().unwrap();
    assert_eq!(got, (0..20).collect::<Vec<_>>());
}

#[test]
fn test_channel_take_errors_when_producer_gone() {
    let (tx, rx) = stage_channel::<u32>("orphan", 1);
    drop(tx);
    let err = rx.take().unwrap_err();
    assert!(err.to_string().contains("orphan"));
    assert!(err.to_string().contains("before end-of-stream"));
}

#[test]
fn test_channel_put_errors_when_consumer_gone() {
    let (tx, rx) = stage_channel::<u32>("t", 1);
    drop(rx);
    assert!(tx.put(1).is_err());
    assert!(tx.close().is_err());
}

#[test]
fn test_channel_wait_drained() {
    let (tx, rx) = stage_channel::<u32>("t", 2);
    tx.put(1).unwrap();
    tx.close().unwrap();
    assert_eq!(rx.pending(), 2);

    let consumer = thread::spawn(move || {
        while let Message::Item(_) = rx.take().unwrap() {
            thread::sleep(Duration::from_millis(20));
            rx.task_done();
        }
        rx.task_done();
    });
    tx.wait_drained();
    consumer.join().unwrap();
}

// --- fetch task ---

#[test]
fn test_fetch_task_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path(), "png");
    let fetcher = ScriptedFetcher::new()
        .with("ok", 0, Scripted::Ok(vec![7; 10]))
        .with("missing", 0, Scripted::NotFound)
        .with("broken", 0, Scripted::Fail("connection reset"))
        .with("panics", 0, Scripted::Panic);

    let ok = ItemDescriptor::new("pikachu", "ok", "electric");
    match fetch_task(&ok, &fetcher, &store) {
        FetchOutcome::Fetched(handle) => {
            assert_eq!(handle.path(), dir.path().join("electric").join("pikachu.png"));
            assert_eq!(std::fs::read(handle.path()).unwrap(), vec![7; 10]);
        }
        other => panic!("expected Fetched, got {other:?}"),
    }

    let missing = ItemDescriptor::new("missingno", "missing", "normal");
    assert!(matches!(fetch_task(&missing, &fetcher, &store), FetchOutcome::Skipped));
    assert!(!store.path_for(&missing).exists());

    let broken = ItemDescriptor::new("ditto", "broken", "normal");
    match fetch_task(&broken, &fetcher, &store) {
        FetchOutcome::Failed(reason) => assert!(reason.contains("connection reset")),
        other => panic!("expected Failed, got {other:?}"),
    }

    let panics = ItemDescriptor::new("mew", "panics", "psychic");
    match fetch_task(&panics, &fetcher, &store) {
        FetchOutcome::Failed(reason) => assert!(reason.contains("panicked")),
        other => panic!("expected Failed, got {other:?}"),
    }
}

// --- fan-out ---

fn fan_out_ctx(fetcher: ScriptedFetcher, root: &std::path::Path, workers: usize) -> FanOutContext {
    FanOutContext {
        fetcher: Arc::new(fetcher),
        store: Arc::new(ArtifactStore::new(root, "png")),
        workers,
        progress: None,
    }
}

#[test]
fn test_fan_out_delivers_in_completion_order() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = ScriptedFetcher::new()
        .with("u/slow", 400, Scripted::Ok(vec![1]))
        .with("u/fast", 0, Scripted::Ok(vec![2]))
        .with("u/mid", 200, Scripted::Ok(vec![3]));
    let ctx = fan_out_ctx(fetcher, dir.path(), 8);
    let items = vec![
        ItemDescriptor::new("slow", "u/slow", "t"),
        ItemDescriptor::new("fast", "u/fast", "t"),
        ItemDescriptor::new("mid", "u/mid", "t"),
    ];

    let (tx, rx) = stage_channel::<ArtifactHandle>("handles", 8);
    let report = run_fan_out(items, &ctx, &tx).unwrap();
    assert_eq!(report.fetched, 3);
    assert_eq!(names_until_end(&rx), vec!["fast", "mid", "slow"]);
}

#[test]
fn test_fan_out_isolates_failures_and_ends_once() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = ScriptedFetcher::new()
        .with("a", 30, Scripted::Ok(vec![1; 4]))
        .with("b", 0, Scripted::NotFound)
        .with("c", 10, Scripted::Fail("timed out"))
        .with("d", 0, Scripted::Panic)
        .with("e", 20, Scripted::Ok(vec![2; 4]));
    let ctx = fan_out_ctx(fetcher, dir.path(), 4);
    let items = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|u| ItemDescriptor::new(*u, *u, "t"))
        .collect();

    // Capacity 1: the stage alternates with this consumer thread.
    let (tx, rx) = stage_channel::<ArtifactHandle>("handles", 1);
    let consumer = thread::spawn(move || {
        let mut names = names_until_end(&rx);
        assert!(rx.take_timeout(Duration::from_millis(100)).is_err());
        names.sort();
        names
    });
    let report = run_fan_out(items, &ctx, &tx).unwrap();
    drop(tx);

    assert_eq!(consumer.join().unwrap(), vec!["a", "e"]);
    assert_eq!(report.submitted, 5);
    assert_eq!(report.fetched, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed.len(), 2);
}

#[test]
fn test_fan_out_empty_input_still_ends() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = fan_out_ctx(ScriptedFetcher::new(), dir.path(), 4);
    let (tx, rx) = stage_channel::<ArtifactHandle>("handles", 1);
    let report = run_fan_out(Vec::new(), &ctx, &tx).unwrap();
    assert_eq!(report.submitted, 0);
    assert!(rx.take_timeout(WAIT).unwrap().is_end_of_stream());
}

#[test]
fn test_fan_out_skips_duplicate_storage_paths() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = ScriptedFetcher::new()
        .with("one", 0, Scripted::Ok(vec![1]))
        .with("two", 0, Scripted::Ok(vec![2]));
    let ctx = fan_out_ctx(fetcher, dir.path(), 4);
    let items = vec![
        ItemDescriptor::new("eevee", "one", "normal"),
        ItemDescriptor::new("eevee", "two", "normal"),
    ];
    let (tx, rx) = stage_channel::<ArtifactHandle>("handles", 4);
    let report = run_fan_out(items, &ctx, &tx).unwrap();
    assert_eq!(report.fetched, 1);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].reason.contains("duplicate"));
    assert_eq!(names_until_end(&rx), vec!["eevee"]);
}

#[test]
fn test_fan_out_fails_when_downstream_gone() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = ScriptedFetcher::new().with("a", 0, Scripted::Ok(vec![1]));
    let ctx = fan_out_ctx(fetcher, dir.path(), 1);
    let (tx, rx) = stage_channel::<ArtifactHandle>("handles", 1);
    drop(rx);
    let items = vec![ItemDescriptor::new("a", "a", "t")];
    assert!(run_fan_out(items, &ctx, &tx).is_err());
}

#[test]
fn test_fan_out_joins_workers_before_reporting_downstream_gone() {
    let dir = tempfile::tempdir().unwrap();
    let mut fetcher = ScriptedFetcher::new().with("first", 0, Scripted::Ok(vec![1]));
    let mut items = vec![ItemDescriptor::new("first", "first", "t")];
    for i in 0..6 {
        let url = format!("later{i}");
        fetcher = fetcher.with(&url, 50, Scripted::Ok(vec![2]));
        items.push(ItemDescriptor::new(url.as_str(), url.as_str(), "t"));
    }
    let ctx = fan_out_ctx(fetcher, dir.path(), 1);
    let (tx, rx) = stage_channel::<ArtifactHandle>("handles", 1);
    drop(rx);

    assert!(run_fan_out(items, &ctx, &tx).is_err());
    let written = ctx.store.leftover_artifacts().len();
    thread::sleep(Duration::from_millis(300));
    assert_eq!(ctx.store.leftover_artifacts().len(), written);
    // The single worker stops after at most one more fetch.
    assert!(written <= 2, "{written} artifacts written after downstream left");
}

// --- transform ---

fn transform_ctx() -> TransformContext {
    TransformContext {
        decoder: Arc::new(RawDecoder),
        decode_delay: Duration::ZERO,
    }
}

#[test]
fn test_transform_broadcasts_records_and_markers() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path(), "bin");
    let handle = store
        .persist(&ItemDescriptor::new("bulbasaur", "u", "grass"), &[9; 12])
        .unwrap();

    let (in_tx, in_rx) = stage_channel::<ArtifactHandle>("handles", 1);
    let (txs, rxs): (Vec<_>, Vec<_>) = (0..3)
        .map(|i| stage_channel::<SharedRecord>(&format!("records[{i}]"), 1))
        .unzip();

    let stage = thread::spawn(move || run_transform(&in_rx, &txs, &transform_ctx()));
    in_tx.put(handle).unwrap();
    in_tx.close().unwrap();

    let mut records = Vec::new();
    for rx in &rxs {
        match rx.take_timeout(WAIT).unwrap() {
            Message::Item(r) => records.push(r),
            Message::EndOfStream => panic!("record expected before end-of-stream"),
        }
        assert!(rx.take_timeout(WAIT).unwrap().is_end_of_stream());
    }
    let report = stage.join().unwrap().unwrap();
    assert_eq!(report.decoded, 1);
    assert_eq!(records[0].name, "bulbasaur");
    assert_eq!(records[0].category, "grass");
    assert_eq!(records[0].image.width, 12);
    assert!(records.iter().all(|r| Arc::ptr_eq(r, &records[0])));
}

#[test]
fn test_transform_decode_failure_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let (in_tx, in_rx) = stage_channel::<ArtifactHandle>("handles", 2);
    let (out_tx, out_rx) = stage_channel::<SharedRecord>("records", 2);
    in_tx
        .put(ArtifactHandle::new(dir.path().join("gone.bin"), "gone", "t"))
        .unwrap();
    in_tx.close().unwrap();

    let report = run_transform(&in_rx, &[out_tx], &transform_ctx()).unwrap();
    assert_eq!(report.decoded, 0);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "gone");
    assert!(out_rx.take().unwrap().is_end_of_stream());
}

#[test]
fn test_missing_marker_is_detected_by_timeout() {
    let (tx_a, rx_a) = stage_channel::<SharedRecord>("a", 1);
    let (tx_b, rx_b) = stage_channel::<SharedRecord>("b", 1);
    // Only one of the two consumers gets a marker.
    broadcast_end_of_stream(std::slice::from_ref(&tx_a)).unwrap();
    assert!(rx_a.take_timeout(WAIT).unwrap().is_end_of_stream());
    let err = rx_b.take_timeout(Duration::from_millis(100)).unwrap_err();
    assert!(err.to_string().contains("nothing received"));

    broadcast_end_of_stream(&[tx_a, tx_b]).unwrap();
    assert!(rx_b.take_timeout(WAIT).unwrap().is_end_of_stream());
}

// --- consumer ---

#[test]
fn test_consumer_stops_on_own_marker() {
    let (tx, rx) = stage_channel::<SharedRecord>("records", 1);
    let (mut sink, seen) = RecordingSink::new("rec");
    let stage = thread::spawn(move || run_consumer(&rx, &mut sink));
    tx.close().unwrap();
    let report = stage.join().unwrap().unwrap();
    assert!(report.end_of_stream);
    assert_eq!(report.records, 0);
    assert_eq!(report.label, "rec");
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_consumer_fails_when_upstream_vanishes() {
    let (tx, rx) = stage_channel::<SharedRecord>("records", 1);
    let (mut sink, _) = RecordingSink::new("rec");
    drop(tx);
    assert!(run_consumer(&rx, &mut sink).is_err());
}
