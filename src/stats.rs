use std::{fmt, result};

#[allow(unused_imports)]
use crate::index::Index;
use crate::Depth;

/// Statistic type, for [Index] type.
pub struct Stats {
    pub name: String,
    /// Present characters in the sequence.
    pub n_count: usize,
    /// Nodes marked as deleted, the tombstones.
    pub n_deleted: usize,
    /// Total character nodes, tombstones included.
    pub n_nodes: usize,
    /// Leaf depth distribution of the balanced index.
    pub depths: Option<Depth>,
}

impl Stats {
    pub(crate) fn new(name: &str) -> Stats {
        Stats {
            name: name.to_string(),
            n_count: Default::default(),
            n_deleted: Default::default(),
            n_nodes: Default::default(),
            depths: None,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        let none = "none".to_string();
        let d = self.depths.as_ref().map_or(none, |x| x.to_string());
        writeln!(f, "otext.name = {}", self.name)?;
        writeln!(
            f,
            "otext = {{ n_count={}, n_deleted={}, n_nodes={} }}",
            self.n_count, self.n_deleted, self.n_nodes,
        )?;
        writeln!(f, "otext.depths = {}", d)
    }
}
