// model = "claude-opus-4-5"
// created = "2026-02-05"
// modified = "2026-02-06"
// driver = "Isaac Clayton"

//! Transforming one operation against concurrent ones.
//!
//! `transform(op, against)` re-expresses `op` so that it applies to the
//! text produced by `against`. It integrates everything into a scratch
//! fragment union laid over the shared base text and reads back the
//! change `op` makes there.
//!
//! The base text itself is not needed. The scratch union stands it in with
//! one placeholder run long enough to cover every offset in the batch;
//! edits never touch the part past the real end, so it only ever shows up
//! as unchanged text after the last edit.

use tracing::trace;

use super::fragment::FragmentUnion;
use super::op::Operation;
use crate::error::{Error, Result};

/// Re-express `op` in the context of its base version plus `against`.
///
/// `against` must be operations on the same base text as `op` that `op`
/// did not observe; they may build on each other. Their order does not
/// matter. Operations `op` already observed are skipped.
pub fn transform(op: &Operation, against: &[Operation]) -> Result<Operation> {
    op.validate()?;
    let mut concurrent: Vec<&Operation> = Vec::with_capacity(against.len());
    for other in against {
        other.validate()?;
        if other.id() == op.id() {
            return Err(Error::InvalidOperation(format!(
                "cannot transform {}@{} against itself",
                op.replica_id, op.timestamp
            )));
        }
        if other.id().observed_by(&op.base_version) {
            continue;
        }
        concurrent.push(other);
    }
    // Lamport order is a causal order.
    concurrent.sort_by_key(|other| other.id());
    concurrent.dedup_by_key(|other| other.id());

    let base_len = std::iter::once(op)
        .chain(concurrent.iter().copied())
        .flat_map(|op| op.edits.iter().map(|edit| edit.range.end))
        .max()
        .unwrap_or(0)
        + 1;

    let mut union = FragmentUnion::new(base_len);
    let mut base_version = op.base_version.clone();
    for other in &concurrent {
        union = union.integrate(other)?.union;
        base_version.join(&other.version());
    }
    let integrated = union.integrate(op)?;
    trace!(
        replica = op.replica_id,
        timestamp = op.timestamp,
        against = concurrent.len(),
        edits = integrated.edits.len(),
        "transformed operation"
    );

    return Ok(Operation::new(op.replica_id, op.timestamp, integrated.edits, base_version));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ot::op::OpEdit;
    use crate::ot::primitives::{Global, ReplicaId};

    fn op(replica_id: ReplicaId, timestamp: u32, edits: Vec<OpEdit>) -> Operation {
        return Operation::new(replica_id, timestamp, edits, Global::new());
    }

    fn apply(text: &str, op: &Operation) -> String {
        let mut text = text.to_string();
        for edit in op.edits.iter().rev() {
            text.replace_range(edit.range.clone(), &edit.new_text);
        }
        return text;
    }

    #[test]
    fn lower_timestamp_goes_left() {
        let foo = op(1, 1, vec![OpEdit::new(0..0, "foo")]);
        let bar = op(2, 2, vec![OpEdit::new(0..0, "bar")]);

        let bar_after_foo = transform(&bar, std::slice::from_ref(&foo)).unwrap();
        assert_eq!(bar_after_foo.edits, vec![OpEdit::new(3..3, "bar")]);
        let foo_after_bar = transform(&foo, std::slice::from_ref(&bar)).unwrap();
        assert_eq!(foo_after_bar.edits, vec![OpEdit::new(0..0, "foo")]);

        assert_eq!(apply(&apply("", &foo), &bar_after_foo), "foobar");
        assert_eq!(apply(&apply("", &bar), &foo_after_bar), "foobar");
    }

    #[test]
    fn insert_inside_concurrent_delete_vanishes() {
        let delete = op(1, 1, vec![OpEdit::new(2..5, "")]);
        let insert = op(2, 1, vec![OpEdit::new(3..3, "X")]);

        let transformed = transform(&insert, std::slice::from_ref(&delete)).unwrap();
        assert!(transformed.edits.is_empty());
        assert!(transformed.is_noop());

        let delete_after_insert = transform(&delete, std::slice::from_ref(&insert)).unwrap();
        assert_eq!(delete_after_insert.edits, vec![OpEdit::new(2..6, "")]);
        assert_eq!(apply(&apply("abcdefg", &insert), &delete_after_insert), "abfg");
    }

    #[test]
    fn result_is_independent_of_against_order() {
        let a = op(1, 1, vec![OpEdit::new(0..0, "A")]);
        let b = op(2, 1, vec![OpEdit::new(4..6, "B")]);
        let c = op(3, 2, vec![OpEdit::new(2..2, "C")]);
        let target = op(4, 3, vec![OpEdit::new(1..5, "T")]);

        let one = transform(&target, &[a.clone(), b.clone(), c.clone()]).unwrap();
        let two = transform(&target, &[c, a, b]).unwrap();
        assert_eq!(one, two);
        assert_eq!(one.base_version.get(3), 2);
    }

    #[test]
    fn observed_operations_are_skipped() {
        let first = op(1, 1, vec![OpEdit::new(0..0, "ab")]);
        let second = Operation::new(2, 2, vec![OpEdit::new(2..2, "c")], first.version());
        let transformed = transform(&second, std::slice::from_ref(&first)).unwrap();
        assert_eq!(transformed.edits, second.edits);
    }
}
