// model = "claude-opus-4-5"
// created = "2026-02-06"
// modified = "2026-02-09"
// driver = "Isaac Clayton"

//! End-to-end scenarios through the public API.

use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use tandem::{
    AnchorBias, Bias, Buffer, ChangeEvent, Config, Error, Global, OpEdit, Operation, Point, RemoteOutcome,
    ReplicaState, WireRecord, transform,
};

// =============================================================================
// Test helpers
// =============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn exchange(from: &mut Buffer, to: &mut Buffer) {
    for op in from.take_outgoing() {
        to.apply_remote(&op).unwrap();
    }
}

// =============================================================================
// Concurrent editing
// =============================================================================

#[test]
fn concurrent_inserts_at_the_same_place() {
    init_tracing();
    let mut a = Buffer::with_replica(1, "");
    let mut b = Buffer::with_replica(2, "");
    a.insert(0, "foo").unwrap();
    b.insert(0, "bar").unwrap();

    let from_a = a.take_outgoing();
    exchange(&mut b, &mut a);
    for op in &from_a {
        b.apply_remote(op).unwrap();
    }
    assert_eq!(a.text(), "foobar");
    assert_eq!(b.text(), "foobar");
}

#[test]
fn deletion_swallows_concurrent_inner_insert() {
    init_tracing();
    let mut a = Buffer::with_replica(1, "abcdefg");
    let mut b = Buffer::with_replica(2, "abcdefg");
    a.delete(2..5).unwrap();
    b.insert(3, "X").unwrap();

    let from_a = a.take_outgoing();
    exchange(&mut b, &mut a);
    for op in &from_a {
        b.apply_remote(op).unwrap();
    }
    assert_eq!(a.text(), "abfg");
    assert_eq!(b.text(), "abfg");
}

#[test]
fn insert_at_deletion_edge_survives() {
    let mut a = Buffer::with_replica(1, "abcdefg");
    let mut b = Buffer::with_replica(2, "abcdefg");
    a.delete(2..5).unwrap();
    b.insert(5, "Y").unwrap();

    let from_a = a.take_outgoing();
    exchange(&mut b, &mut a);
    for op in &from_a {
        b.apply_remote(op).unwrap();
    }
    assert_eq!(a.text(), "abYfg");
    assert_eq!(b.text(), "abYfg");
}

#[test]
fn three_replicas_with_relay() {
    init_tracing();
    let mut a = Buffer::with_replica(1, "shared\n");
    let mut b = Buffer::with_replica(2, "shared\n");
    let mut c = Buffer::with_replica(3, "shared\n");

    a.insert(7, "from a\n").unwrap();
    let from_a = a.take_outgoing();
    for op in &from_a {
        b.apply_remote(op).unwrap();
    }
    b.insert(0, "# ").unwrap();
    let from_b = b.take_outgoing();

    // c hears from b before a, so b's edit has to wait.
    let err = c.apply_remote(&from_b[0]).unwrap_err();
    assert!(matches!(err, Error::CausalityGap { replica_id: 2, .. }));
    for op in &from_a {
        c.apply_remote(op).unwrap();
    }
    assert_eq!(c.apply_remote(&from_b[0]), Ok(RemoteOutcome::Applied));
    for op in &from_b {
        a.apply_remote(op).unwrap();
    }

    for buffer in [&a, &b, &c] {
        assert_eq!(buffer.text(), "# shared\nfrom a\n");
    }
    assert_eq!(a.version(), c.version());
}

#[test]
fn resync_recovers_from_a_lost_operation() {
    let mut a = Buffer::with_replica(1, "");
    let mut b = Buffer::with_replica(2, "");
    a.insert(0, "lost ").unwrap();
    a.take_outgoing();
    a.insert(5, "kept").unwrap();
    let err = b.apply_remote(&a.take_outgoing()[0]).unwrap_err();
    assert!(matches!(err, Error::CausalityGap { .. }));

    let bytes = a.replica_state().encode().unwrap();
    b.resync(ReplicaState::decode(&bytes).unwrap()).unwrap();
    assert_eq!(b.text(), "lost kept");
    assert_eq!(b.snapshot().fingerprint(), a.snapshot().fingerprint());

    b.insert(0, ">").unwrap();
    exchange(&mut b, &mut a);
    assert_eq!(a.text(), ">lost kept");
}

#[test]
fn transform_matches_integration() {
    let base = Global::new();
    let insert = Operation::new(1, 1, vec![OpEdit::new(1..1, "X")], base.clone());
    let delete = Operation::new(2, 1, vec![OpEdit::new(0..3, "")], base);

    // The insert lands strictly inside the deleted range, so it vanishes.
    let transformed = transform(&insert, std::slice::from_ref(&delete)).unwrap();
    assert!(transformed.is_noop());

    let transformed = transform(&delete, std::slice::from_ref(&insert)).unwrap();
    assert_eq!(transformed.edits, vec![OpEdit::new(0..4, "")]);
}

// =============================================================================
// Wire records
// =============================================================================

#[test]
fn records_travel_as_bytes() {
    let mut a = Buffer::with_replica(1, "");
    let mut b = Buffer::with_replica(2, "");
    for buffer in [&mut a, &mut b] {
        buffer.set_wire_identity(42, 3);
    }
    a.insert(0, "over the wire").unwrap();
    a.delete(0..5).unwrap();

    let frames: Vec<Vec<u8>> = a
        .encode_outgoing()
        .unwrap()
        .iter()
        .map(|record| record.encode().unwrap())
        .collect();
    assert_eq!(frames.len(), 2);
    for frame in &frames {
        let record = WireRecord::decode(frame).unwrap();
        assert_eq!(record.replica_id, 1);
        b.receive_record(&record).unwrap();
    }
    assert_eq!(b.text(), "the wire");
    assert!(WireRecord::decode(&[1, 2, 3]).is_err());
}

// =============================================================================
// Observers and readers
// =============================================================================

#[test]
fn subscribers_see_local_and_remote_changes() {
    let mut a = Buffer::with_replica(1, "text");
    let mut b = Buffer::with_replica(2, "text");
    let seen: Arc<Mutex<Vec<ChangeEvent>>> = Arc::default();
    let sink = seen.clone();
    let subscription = a.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

    a.insert(4, "!").unwrap();
    b.insert(0, ">").unwrap();
    exchange(&mut b, &mut a);
    {
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!((seen[0].range.clone(), &*seen[0].new_text), (4..4, "!"));
        assert_eq!((seen[1].range.clone(), &*seen[1].new_text), (0..0, ">"));
        assert_eq!(seen[1].version.get(2), 1);
    }

    drop(subscription);
    a.insert(0, "-").unwrap();
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn shared_buffer_callbacks_hand_work_to_a_channel() {
    let shared = Arc::new(Mutex::new(Buffer::from_text("abc")));
    let weak = Arc::downgrade(&shared);
    let (sender, receiver) = mpsc::channel();
    let _subscription = shared.lock().unwrap().subscribe(move |event| {
        // The committing thread holds the lock, so `lock()` here would hang.
        let held = weak.upgrade().is_some_and(|buffer| {
            let busy = buffer.try_lock().is_err();
            return busy;
        });
        sender.send((held, event.range.clone())).unwrap();
    });

    shared.lock().unwrap().insert(3, "d").unwrap();
    let (held, range) = receiver.recv().unwrap();
    assert!(held);
    assert_eq!(range, 3..3);

    // Once the edit has returned the receiver can take the lock itself.
    shared.lock().unwrap().insert(0, "_").unwrap();
    let (_, range) = receiver.recv().unwrap();
    assert_eq!(shared.lock().unwrap().text_for_range(range.start..range.start + 1).unwrap(), "_");
}

#[test]
fn snapshots_read_on_other_threads() {
    let mut buffer = Buffer::from_text("line one\nline two\n".repeat(500));
    let snapshot = buffer.snapshot();
    let reader = thread::spawn(move || {
        return (snapshot.line(1).unwrap(), snapshot.len(), snapshot.fingerprint());
    });

    buffer.replace(0..4, "LINE").unwrap();
    let (line, len, fingerprint) = reader.join().unwrap();
    assert_eq!(line, "line two");
    assert_eq!(len, 18 * 500);
    assert_ne!(fingerprint, buffer.snapshot().fingerprint());
    assert_eq!(buffer.snapshot().line(0).unwrap(), "LINE one");
}

#[test]
fn clipping_recovers_from_encoding_errors() {
    let mut buffer = Buffer::from_text("naïve");
    assert_eq!(buffer.insert(3, "x"), Err(Error::Encoding { offset: 3 }));
    let offset = buffer.rope().clip_offset(3, Bias::Right);
    buffer.insert(offset, "x").unwrap();
    assert_eq!(buffer.text(), "naïxve");

    let point = buffer.rope().clip_point(Point::new(0, 99), Bias::Left);
    assert_eq!(point, Point::new(0, 7));
}

// =============================================================================
// Configuration and history
// =============================================================================

#[test]
fn configuration_from_toml() {
    let config = Config::from_toml_str("group_interval_ms = 0\nhistory_limit = 2\n").unwrap();
    let mut buffer = Buffer::with_config(1, "", config).unwrap();
    for text in ["a", "b", "c"] {
        let len = buffer.len();
        buffer.insert(len, text).unwrap();
    }
    assert_eq!(buffer.history().undo_len(), 2);
    buffer.undo().unwrap();
    buffer.undo().unwrap();
    assert_eq!(buffer.text(), "a");
    assert!(buffer.undo().unwrap_err().is_noop());

    assert!(matches!(Config::from_toml_str("parallel_workers = 0"), Err(Error::Config(_))));
    assert!(Config::from_toml_str("history_limit = \"many\"").is_err());
}

#[test]
fn checkpoints_and_branches() {
    let config = Config {
        group_interval_ms: 0,
        ..Config::default()
    };
    let mut buffer = Buffer::with_config(1, "fn main() {}\n", config).unwrap();
    let anchor = buffer.create_anchor(10, AnchorBias::Before).unwrap();
    let main = buffer.history().current_branch();
    let checkpoint = buffer.checkpoint();
    buffer.insert(11, " body ").unwrap();
    buffer.insert(0, "// entry\n").unwrap();
    assert_eq!(buffer.anchor_offset(&anchor), Ok(19));

    let experiment = buffer.branch().unwrap();
    buffer.replace(12..16, "start").unwrap();
    assert_eq!(buffer.text(), "// entry\nfn start() { body }\n");
    // Checkpoints belong to the branch they were taken on.
    assert_eq!(buffer.revert_to_checkpoint(checkpoint), Err(Error::UnknownCheckpoint(checkpoint)));

    buffer.switch_to_branch(main).unwrap();
    assert_eq!(buffer.text(), "// entry\nfn main() { body }\n");
    assert_eq!(buffer.anchor_offset(&anchor), Ok(19));

    buffer.revert_to_checkpoint(checkpoint).unwrap();
    assert_eq!(buffer.text(), "fn main() {}\n");
    assert_eq!(buffer.anchor_offset(&anchor), Ok(10));

    buffer.switch_to_branch(experiment).unwrap();
    assert_eq!(buffer.text(), "// entry\nfn start() { body }\n");
}
