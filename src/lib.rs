//! Package implement an operation-based CRDT for collaborative plain-text
//! editing, with worst-case O(log n + c) local edits and index lookups,
//! where `n` is the number of character nodes ever inserted, tombstones
//! included, and `c` is the width of concurrent edits at one position.
//!
//! Three structures share a single node arena:
//!
//! * _Interleaving tree_, the canonical tree of character nodes. Its
//!   in-order traversal, siblings visited in ascending id order, is the
//!   replicated sequence. Since ids are globally unique and totally
//!   ordered, replicas that have seen the same operations render the
//!   same text, refer to [crdt] for the underlying theory.
//! * _Balanced index_, an [AVL tree][avl] over the same nodes, augmented
//!   with subtree counts of present nodes, giving logarithmic
//!   index-to-node and node-to-index translation.
//! * _Split-append lists_, AVL lists tracking the leftmost and rightmost
//!   descendant of every spine of the interleaving tree, so that a fresh
//!   node's neighbor in the balanced index is found without walking the
//!   unbalanced interleaving tree.
//!
//! [Replica] glues the three together behind a text-like API and the
//! [Runtime] contract supplied by the replication layer. Operations
//! travel as CBOR encoded [Op] values.
//!
//! [crdt]: https://en.wikipedia.org/wiki/Conflict-free_replicated_data_type
//! [avl]: https://en.wikipedia.org/wiki/AVL_tree

use std::{error, fmt, result};

/// Short form to compose Error values.
///
/// Here are few possible ways:
///
/// ```ignore
/// use crate::Error;
/// err_at!(IndexOutOfBounds, msg: "index {} out of bounds", index)
/// ```
///
/// ```ignore
/// use crate::Error;
/// err_at!(FailCbor, cbor_result)
/// ```
///
/// ```ignore
/// use crate::Error;
/// err_at!(FailCbor, cbor_result, "while decoding op")
/// ```
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err(Error::$v(prefix, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                Err(Error::$v(prefix, format!("{}", err)))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                let msg = format!($($arg),+);
                Err(Error::$v(prefix, format!("{} {}", err, msg)))
            }
        }
    }};
}

mod depth;
mod index;
mod node;
mod op;
mod replica;
mod salm;
mod stats;
pub mod util;

pub use crate::depth::Depth;
pub use crate::index::{Index, Iter};
pub use crate::op::Op;
pub use crate::replica::{Event, Replica, Runtime};
pub use crate::stats::Stats;

/// Error variants that are returned by this package's API.
///
/// Each variant carries a prefix, typically identifying the
/// error location.
#[derive(Clone)]
pub enum Error {
    Fatal(String, String),
    Invalid(String, String),
    IndexOutOfBounds(String, String),
    UnknownId(String, String),
    InvariantViolation(String, String),
    NotImplemented(String, String),
    FailCbor(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        use Error::*;

        match self {
            Fatal(p, msg) => write!(f, "{} Fatal: {}", p, msg),
            Invalid(p, msg) => write!(f, "{} Invalid: {}", p, msg),
            IndexOutOfBounds(p, msg) => write!(f, "{} IndexOutOfBounds: {}", p, msg),
            UnknownId(p, msg) => write!(f, "{} UnknownId: {}", p, msg),
            InvariantViolation(p, msg) => {
                write!(f, "{} InvariantViolation: {}", p, msg)
            }
            NotImplemented(p, msg) => write!(f, "{} NotImplemented: {}", p, msg),
            FailCbor(p, msg) => write!(f, "{} FailCbor: {}", p, msg),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(f, "{}", self)
    }
}

impl error::Error for Error {}

/// Type alias for Result return type, used by this package.
pub type Result<T> = result::Result<T, Error>;
