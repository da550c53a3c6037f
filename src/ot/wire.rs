// model = "claude-opus-4-5"
// created = "2026-02-05"
// modified = "2026-02-05"
// driver = "Isaac Clayton"

//! The record replicas exchange.
//!
//! The header duplicates the operation's identity so a transport can route
//! and drop records without decoding the payload. `epoch` is bumped by the
//! owner of a buffer whenever it resets the document; records from an
//! older epoch are stale.

use serde::{Deserialize, Serialize};

use super::op::Operation;
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRecord {
    pub buffer_id: u64,
    pub epoch: i32,
    pub lamport_timestamp: i32,
    pub replica_id: i32,
    /// A bincode-encoded `Operation`.
    pub payload: Vec<u8>,
}

fn to_wire_int(value: u32, field: &str) -> Result<i32> {
    return i32::try_from(value).map_err(|_| Error::Wire(format!("{field} {value} does not fit the wire format")));
}

impl WireRecord {
    pub fn from_operation(buffer_id: u64, epoch: i32, op: &Operation) -> Result<WireRecord> {
        return Ok(WireRecord {
            buffer_id,
            epoch,
            lamport_timestamp: to_wire_int(op.timestamp, "timestamp")?,
            replica_id: to_wire_int(op.replica_id, "replica id")?,
            payload: bincode::serialize(op)?,
        });
    }

    /// Decode the payload and check it against the header.
    pub fn operation(&self) -> Result<Operation> {
        let op: Operation = bincode::deserialize(&self.payload)?;
        let matches = i32::try_from(op.timestamp) == Ok(self.lamport_timestamp)
            && i32::try_from(op.replica_id) == Ok(self.replica_id);
        if !matches {
            return Err(Error::Wire(format!(
                "header {}@{} does not match payload {}@{}",
                self.replica_id, self.lamport_timestamp, op.replica_id, op.timestamp
            )));
        }
        return Ok(op);
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        return Ok(bincode::serialize(self)?);
    }

    pub fn decode(bytes: &[u8]) -> Result<WireRecord> {
        return Ok(bincode::deserialize(bytes)?);
    }
}
