// model = "claude-opus-4-5"
// created = "2026-02-06"
// modified = "2026-02-09"
// driver = "Isaac Clayton"

//! Property-based tests for undo history and anchors.

use proptest::prelude::*;
use tandem::{Anchor, AnchorBias, Bias, Buffer, Config, Error};

// =============================================================================
// Test helpers
// =============================================================================

fn config() -> Config {
    return Config {
        group_interval_ms: 0,
        ..Config::default()
    };
}

fn arbitrary_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            4 => prop::char::range('a', 'z'),
            1 => Just('\n'),
            1 => Just('ß'),
        ],
        0..8,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn letters() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::char::range('a', 'z'), 1..5).prop_map(|chars| chars.into_iter().collect())
}

fn pick_range(buffer: &Buffer, pos_pct: f64, len_pct: f64) -> std::ops::Range<usize> {
    let rope = buffer.rope();
    let len = rope.len();
    let start = rope.clip_offset((pos_pct * len as f64) as usize, Bias::Left);
    let end = rope.clip_offset(start + (len_pct * (len - start) as f64) as usize, Bias::Right);
    return start..end;
}

fn undo_quietly(buffer: &mut Buffer) {
    if let Err(err) = buffer.undo() {
        assert!(err.is_noop(), "{err}");
    }
}

fn exchange(from: &mut Buffer, to: &mut Buffer) {
    for op in from.take_outgoing() {
        to.apply_remote(&op).unwrap();
    }
}

// =============================================================================
// Invertibility
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Undoing every step restores the original text, and redoing every
    /// step restores the edited one.
    #[test]
    fn undo_all_then_redo_all(
        initial in arbitrary_text(),
        edits in prop::collection::vec((0.0..=1.0f64, 0.0..=0.4f64, arbitrary_text()), 1..40),
    ) {
        let mut buffer = Buffer::with_config(1, initial.as_str(), config()).unwrap();
        for (pos_pct, len_pct, text) in &edits {
            let range = pick_range(&buffer, *pos_pct, *len_pct);
            buffer.replace(range, text).unwrap();
        }
        let edited = buffer.text();
        let steps = buffer.history().undo_len();

        for _ in 0..steps {
            buffer.undo().unwrap();
        }
        prop_assert_eq!(buffer.text(), initial.clone());
        prop_assert!(buffer.undo().unwrap_err().is_noop());

        for _ in 0..steps {
            buffer.redo().unwrap();
        }
        prop_assert_eq!(buffer.text(), edited);
        prop_assert!(buffer.redo().unwrap_err().is_noop());
    }

    /// An undo is an ordinary edit to other replicas.
    #[test]
    fn undo_reaches_peers(
        initial in arbitrary_text(),
        edits in prop::collection::vec((0.0..=1.0f64, 0.0..=0.4f64, arbitrary_text()), 1..20),
        undos in 1usize..5,
    ) {
        let mut local = Buffer::with_config(1, initial.as_str(), config()).unwrap();
        let mut peer = Buffer::with_replica(2, initial.as_str());
        for (pos_pct, len_pct, text) in &edits {
            let range = pick_range(&local, *pos_pct, *len_pct);
            local.replace(range, text).unwrap();
        }
        for _ in 0..undos {
            undo_quietly(&mut local);
        }
        exchange(&mut local, &mut peer);
        prop_assert_eq!(peer.text(), local.text());
    }
}

// =============================================================================
// Anchor stability
// =============================================================================

#[derive(Clone, Debug)]
enum AnchorStep {
    Local { pos_pct: f64, text: String },
    Remote { pos_pct: f64, text: String },
    LocalUndo,
    RemoteUndo,
    Sync,
}

fn arbitrary_anchor_step() -> impl Strategy<Value = AnchorStep> {
    prop_oneof![
        3 => (0.0..=1.0f64, letters()).prop_map(|(pos_pct, text)| AnchorStep::Local { pos_pct, text }),
        3 => (0.0..=1.0f64, letters()).prop_map(|(pos_pct, text)| AnchorStep::Remote { pos_pct, text }),
        1 => Just(AnchorStep::LocalUndo),
        1 => Just(AnchorStep::RemoteUndo),
        2 => Just(AnchorStep::Sync),
    ]
}

/// Check that every live anchor still has `digits` digits before it.
fn check_anchors(buffer: &Buffer, anchors: &[(Anchor, usize)]) -> Result<(), TestCaseError> {
    let text = buffer.text();
    for (anchor, digits) in anchors {
        match buffer.anchor_offset(anchor) {
            Ok(offset) => {
                prop_assert!(offset <= text.len());
                prop_assert!(text.is_char_boundary(offset));
                let before = text[..offset].chars().filter(char::is_ascii_digit).count();
                prop_assert_eq!(before, *digits);
            }
            Err(Error::AnchorInvalidated(_)) => {}
            Err(err) => prop_assert!(false, "unexpected error {}", err),
        }
    }
    return Ok(());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Edits that never touch the digits never move an anchor across one,
    /// whichever replica makes them and whether or not they are undone.
    #[test]
    fn anchors_keep_their_place(
        positions in prop::collection::vec((0usize..=10, any::<bool>()), 1..6),
        steps in prop::collection::vec(arbitrary_anchor_step(), 1..40),
    ) {
        let digits = "0123456789";
        let mut local = Buffer::with_config(1, digits, config()).unwrap();
        let mut remote = Buffer::with_config(2, digits, config()).unwrap();
        let anchors: Vec<(Anchor, usize)> = positions
            .iter()
            .map(|(offset, after)| {
                let bias = if *after { AnchorBias::After } else { AnchorBias::Before };
                return (local.create_anchor(*offset, bias).unwrap(), *offset);
            })
            .collect();

        for step in &steps {
            match step {
                AnchorStep::Local { pos_pct, text } => {
                    let at = pick_range(&local, *pos_pct, 0.0).start;
                    local.insert(at, text).unwrap();
                }
                AnchorStep::Remote { pos_pct, text } => {
                    let at = pick_range(&remote, *pos_pct, 0.0).start;
                    remote.insert(at, text).unwrap();
                }
                AnchorStep::LocalUndo => undo_quietly(&mut local),
                AnchorStep::RemoteUndo => undo_quietly(&mut remote),
                AnchorStep::Sync => {
                    exchange(&mut remote, &mut local);
                    exchange(&mut local, &mut remote);
                }
            }
            check_anchors(&local, &anchors)?;
        }

        exchange(&mut remote, &mut local);
        exchange(&mut local, &mut remote);
        prop_assert_eq!(local.text(), remote.text());
        check_anchors(&local, &anchors)?;
    }
}

// =============================================================================
// Anchor restoration
// =============================================================================

#[test]
fn undo_brings_back_anchors_in_deleted_text() {
    let mut buffer = Buffer::with_config(1, "keep this sentence", config()).unwrap();
    let inside = buffer.create_anchor(7, AnchorBias::Before).unwrap();
    let outside = buffer.create_anchor(18, AnchorBias::After).unwrap();

    buffer.delete(4..9).unwrap();
    assert_eq!(buffer.anchor_offset(&inside), Err(Error::AnchorInvalidated(inside.id())));
    assert_eq!(buffer.anchor_offset(&outside), Ok(13));

    buffer.undo().unwrap();
    assert_eq!(buffer.text(), "keep this sentence");
    assert_eq!(buffer.anchor_offset(&inside), Ok(7));
    assert_eq!(buffer.anchor_offset(&outside), Ok(18));
}

#[test]
fn anchors_only_resolve_in_their_own_buffer() {
    let mut first = Buffer::with_config(1, "same text", config()).unwrap();
    let mut second = Buffer::with_config(1, "same text", config()).unwrap();
    let anchor = first.create_anchor(5, AnchorBias::After).unwrap();
    let other = second.create_anchor(5, AnchorBias::After).unwrap();
    assert_eq!(anchor.id(), other.id());

    assert_eq!(second.anchor_offset(&anchor), Err(Error::ForeignAnchor(anchor.id())));
    assert_eq!(first.anchor_offset(&other), Err(Error::ForeignAnchor(other.id())));
    assert_eq!(first.anchor_offset(&anchor), Ok(5));
}
