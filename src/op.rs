use arbitrary::Arbitrary;
use cbordata::Cborize;

use std::{
    fmt::{self, Display},
    result,
};

/// This value must change only when the shape of Op type changes. High
/// 16-bits identify the type and lower 16-bits identify the version.
const OP_VER: u32 = 0x00010001;

/// Operation messages exchanged between replicas.
///
/// A local edit breaks down into one operation per character. Operations
/// commute under causal delivery, every replica that has applied the same
/// set of operations renders the same text.
#[derive(Clone, Debug, Eq, PartialEq, Cborize, Arbitrary)]
pub enum Op {
    /// Anchor a fresh character under node `parent`, on its left or right
    /// flank. `value` carries exactly one character on the wire.
    Ins {
        id: String,
        parent: String,
        left: bool,
        value: String,
    },
    /// Tombstone the character identified by `id`.
    Del { id: String },
}

impl Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        match self {
            Op::Ins { id, parent, left, .. } => {
                write!(f, "op<ins:{} @{}/{}>", id, parent, left)
            }
            Op::Del { id } => write!(f, "op<del:{}>", id),
        }
    }
}

impl Op {
    const ID: u32 = OP_VER;

    #[inline]
    pub fn insert(id: &str, parent: &str, left: bool, value: char) -> Op {
        Op::Ins {
            id: id.to_string(),
            parent: parent.to_string(),
            left,
            value: value.to_string(),
        }
    }

    #[inline]
    pub fn delete(id: &str) -> Op {
        Op::Del { id: id.to_string() }
    }

    /// Return the id of the node this operation targets or creates.
    #[inline]
    pub fn as_id(&self) -> &str {
        match self {
            Op::Ins { id, .. } => id,
            Op::Del { id } => id,
        }
    }
}

#[cfg(test)]
#[path = "op_test.rs"]
mod op_test;
