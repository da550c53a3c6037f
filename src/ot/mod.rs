// model = "claude-opus-4-5"
// created = "2026-01-30"
// modified = "2026-02-05"
// driver = "Isaac Clayton"

//! The collaboration layer: clocks, operations, patches and the
//! conflict resolution that makes replicas converge.

pub mod fragment;
pub mod op;
pub mod patch;
pub mod primitives;
pub mod transform;
pub mod wire;

pub use fragment::{Fragment, FragmentUnion};
pub use op::{OpEdit, OpLog, Operation};
pub use patch::{Edit, Patch};
pub use primitives::{Global, LamportClock, ReplicaId};
pub use transform::transform;
pub use wire::WireRecord;
