//! Module implement the replica façade.
//!
//! A [Replica] hosts one copy of the replicated sequence. High-level
//! edits, [Replica::insert] and [Replica::delete], break down into one
//! [Op] per character, each op is handed to the [Runtime] for broadcast
//! and applied to the local copy synchronously before the call returns.
//! Remote ops come back through [Replica::receive], in causal order, and
//! produce the same state on every replica.
//!
//! Handlers are all-or-nothing, an error aborts the handler without
//! emitting an event and the replica must be considered corrupted, the
//! runtime owns delivery and there are no retries at this layer.

use cbordata::Cborize;
use log::{debug, trace};

use crate::{index::Index, op::Op, util, Error, Result, Stats};

/// These values must change only when the shape of the Snapshot types
/// change. High 16-bits identify the type and lower 16-bits identify the
/// version.
const SNAPSHOT_VER: u32 = 0x00020001;
const SNAP_ENTRY_VER: u32 = 0x00030001;

/// Runtime contract consumed by [Replica].
///
/// The replication runtime owns id generation, message dispatch and
/// causal delivery. Delivery must be exactly-once and respect
/// happens-before, FIFO from each replica.
pub trait Runtime {
    /// Return a globally unique id. Lexicographic order over generated
    /// ids must be a strict total order across all replicas, ids are
    /// never reused.
    fn get_uid(&mut self) -> String;

    /// Broadcast one encoded operation to all peer replicas. The local
    /// replica applies its own operations synchronously, `send` must not
    /// echo them back through [Replica::receive].
    fn send(&mut self, raw: Vec<u8>) -> Result<()>;
}

/// Event emitted after applying one operation message. `meta` forwards
/// the opaque causal metadata supplied by the runtime, None for local
/// edits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    Insert {
        start: usize,
        count: usize,
        meta: Option<Vec<u8>>,
    },
    Delete {
        start: usize,
        count: usize,
        deleted: String,
        meta: Option<Vec<u8>>,
    },
}

/// Replica type, one collaborating copy of the replicated text.
pub struct Replica<R>
where
    R: Runtime,
{
    name: String,
    seqno: u64,
    index: Index,
    rt: R,
}

impl<R> Replica<R>
where
    R: Runtime,
{
    pub fn new(name: &str, rt: R) -> Replica<R> {
        debug!(target: "otext", "new replica {:?}", name);
        Replica {
            name: name.to_string(),
            seqno: 0,
            index: Index::new(name),
            rt,
        }
    }

    /// Rebuild a replica from a snapshot generated by
    /// [Replica::to_snapshot]. Nodes re-enter all four link structures,
    /// tombstones included.
    pub fn from_snapshot(name: &str, rt: R, data: &[u8]) -> Result<Replica<R>> {
        let (snapshot, _) = util::from_cbor_bytes::<Snapshot>(data)?;

        let mut index = Index::new(name);
        for entry in snapshot.entries.iter() {
            let value = to_char(&entry.value)?;
            index.apply_insert(&entry.id, &entry.parent, entry.left, value)?;
            if !entry.present {
                index.apply_delete(&entry.id)?;
            }
        }

        debug!(
            target: "otext",
            "replica {:?} loaded from snapshot, {} nodes", name, index.node_count()
        );

        Ok(Replica {
            name: name.to_string(),
            seqno: snapshot.seqno,
            index,
            rt,
        })
    }

    /// Identify this replica instance.
    #[inline]
    pub fn to_name(&self) -> String {
        self.name.clone()
    }

    /// Return the count of operations applied so far.
    #[inline]
    pub fn to_seqno(&self) -> u64 {
        self.seqno
    }

    /// Return number of present characters.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Return whether the text is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Render the text, in sequence order.
    #[inline]
    pub fn to_text(&self) -> String {
        self.index.to_text()
    }

    /// Access the underlying sequence index.
    #[inline]
    pub fn as_index(&self) -> &Index {
        &self.index
    }

    /// Access the runtime handed over at construction.
    #[inline]
    pub fn as_runtime(&self) -> &R {
        &self.rt
    }

    #[inline]
    pub fn as_mut_runtime(&mut self) -> &mut R {
        &mut self.rt
    }
}

impl<R> Replica<R>
where
    R: Runtime,
{
    /// Insert `text` at character position `at`, `at` can be anywhere
    /// within `0..=len()`. Characters are anchored left to right, one
    /// operation each. Return the events, one per character.
    pub fn insert(&mut self, at: usize, text: &str) -> Result<Vec<Event>> {
        if at > self.index.len() {
            return err_at!(IndexOutOfBounds, msg: "insert at {}/{}", at, self.index.len());
        }

        let mut events = vec![];
        let mut cursor = at;
        for ch in text.chars() {
            let (parent, left) = self.index.anchor_of(cursor)?;
            let id = self.rt.get_uid();
            let op = Op::insert(&id, &parent, left, ch);
            self.rt.send(util::into_cbor_bytes(op.clone())?)?;
            if let Some(event) = self.apply(op, None)? {
                events.push(event);
            }
            cursor += 1;
        }
        Ok(events)
    }

    /// Delete `count` characters starting at position `at`, requires
    /// `at + count <= len()`. Target positions are resolved right to
    /// left before any operation is generated, one operation each.
    /// Return the events, one per character.
    pub fn delete(&mut self, at: usize, count: usize) -> Result<Vec<Event>> {
        if at + count > self.index.len() {
            return err_at!(IndexOutOfBounds, msg: "delete {}+{}/{}", at, count, self.index.len());
        }

        let mut ids = Vec::with_capacity(count);
        for off in (0..count).rev() {
            ids.push(self.index.position_at(at + off)?);
        }

        let mut events = vec![];
        for id in ids.into_iter() {
            let op = Op::delete(&id);
            self.rt.send(util::into_cbor_bytes(op.clone())?)?;
            if let Some(event) = self.apply(op, None)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Apply one remote operation, decoded from `raw`. `meta` is opaque
    /// causal metadata, forwarded in the returned event. Duplicate
    /// deletes return None without emitting.
    pub fn receive(&mut self, raw: &[u8], meta: Option<Vec<u8>>) -> Result<Option<Event>> {
        let (op, _) = util::from_cbor_bytes::<Op>(raw)?;
        self.apply(op, meta)
    }

    /// Return the stable id of the character at `index`. The id remains
    /// a valid argument to [Replica::index_of] for the node's lifetime,
    /// across concurrent edits elsewhere.
    #[inline]
    pub fn position_at(&self, index: usize) -> Result<String> {
        self.index.position_at(index)
    }

    /// Return `(ge_index, is_present)` for the node identified by `id`.
    #[inline]
    pub fn index_of(&self, id: &str) -> Result<(usize, bool)> {
        self.index.index_of(id)
    }

    fn apply(&mut self, op: Op, meta: Option<Vec<u8>>) -> Result<Option<Event>> {
        let event = match op {
            Op::Ins { id, parent, left, value } => {
                let value = to_char(&value)?;
                let start = self.index.apply_insert(&id, &parent, left, value)?;
                trace!(target: "otext", "{} insert {:?} at {}", self.name, id, start);
                Some(Event::Insert { start, count: 1, meta })
            }
            Op::Del { id } => match self.index.apply_delete(&id)? {
                Some((start, value)) => {
                    trace!(target: "otext", "{} delete {:?} at {}", self.name, id, start);
                    Some(Event::Delete {
                        start,
                        count: 1,
                        deleted: value.to_string(),
                        meta,
                    })
                }
                None => None,
            },
        };
        if event.is_some() {
            self.seqno = self.seqno.saturating_add(1);
        }
        Ok(event)
    }
}

impl<R> Replica<R>
where
    R: Runtime,
{
    /// Serialize the full state, tombstones included, as CBOR bytes.
    pub fn to_snapshot(&self) -> Result<Vec<u8>> {
        let entries: Vec<SnapEntry> = self
            .index
            .to_records()
            .into_iter()
            .map(|(id, parent, left, value, present)| SnapEntry {
                id,
                parent,
                left,
                value: value.to_string(),
                present,
            })
            .collect();

        util::into_cbor_bytes(Snapshot {
            seqno: self.seqno,
            entries,
        })
    }

    /// Validate the replica's coupled structures, refer
    /// [Index::validate][crate::Index::validate].
    #[inline]
    pub fn validate(&self) -> Result<()> {
        self.index.validate()
    }

    /// Gather statistics from this replica's index.
    #[inline]
    pub fn to_stats(&self) -> Result<Stats> {
        self.index.to_stats()
    }
}

// Wire values carry exactly one character.
fn to_char(value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch),
        _ => err_at!(Invalid, msg: "value {:?} must be a single char", value),
    }
}

// Per-node record in a snapshot, parents always precede their children.
#[derive(Clone, Debug, Eq, PartialEq, Cborize)]
struct SnapEntry {
    id: String,
    parent: String,
    left: bool,
    value: String,
    present: bool,
}

impl SnapEntry {
    const ID: u32 = SNAP_ENTRY_VER;
}

#[derive(Clone, Debug, Eq, PartialEq, Cborize)]
struct Snapshot {
    seqno: u64,
    entries: Vec<SnapEntry>,
}

impl Snapshot {
    const ID: u32 = SNAPSHOT_VER;
}

#[cfg(test)]
#[path = "replica_test.rs"]
mod replica_test;
