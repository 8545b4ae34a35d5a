use crate::salm::Side;

// Id of the root sentinel node, smallest of all ids.
pub const ROOT_ID: &str = "";

// Links for one split-append list membership. A node participate in two
// such lists, one tracking leftmost descendants, one tracking rightmost
// descendants. Lists are AVL trees keyed positionally, heights are stored,
// height of a missing child is -1.
#[derive(Clone, Default)]
pub struct SalmLink {
    pub parent: Option<usize>, // store: list-tree parent
    pub left: Option<usize>,   // store: list-tree left child
    pub right: Option<usize>,  // store: list-tree right child
    pub height: i32,
}

// Node corresponds to a single character in the replicated sequence,
// tombstones included. Every node is member of four link structures over
// the same arena: the interleaving tree, the balanced index and one
// spine-list in each split-append list manager.
#[derive(Clone)]
pub struct Node {
    pub id: String,
    pub value: char,
    pub parent: Option<usize>, // None only for the root sentinel
    pub is_left_child: bool,
    pub is_present: bool,
    pub left_children: Vec<usize>,  // store: sorted ascending by id
    pub right_children: Vec<usize>, // store: sorted ascending by id

    // balanced index links.
    pub b_parent: Option<usize>,
    pub b_left: Option<usize>,
    pub b_right: Option<usize>,
    pub b_factor: i8,   // height(b_right) - height(b_left)
    pub b_count: usize, // present nodes in balanced subtree, self included

    // split-append list memberships.
    pub lsalm: SalmLink,
    pub rsalm: SalmLink,
}

impl Node {
    pub fn new(id: &str, value: char, parent: usize, is_left_child: bool) -> Node {
        Node {
            id: id.to_string(),
            value,
            parent: Some(parent),
            is_left_child,
            is_present: true,
            left_children: Vec::default(),
            right_children: Vec::default(),

            b_parent: None,
            b_left: None,
            b_right: None,
            b_factor: 0,
            b_count: 0,

            lsalm: SalmLink::default(),
            rsalm: SalmLink::default(),
        }
    }

    // The root sentinel anchors the interleaving tree and the balanced
    // index. It carries no character and is never present.
    pub fn new_root() -> Node {
        Node {
            id: ROOT_ID.to_string(),
            value: char::default(),
            parent: None,
            is_left_child: false,
            is_present: false,
            left_children: Vec::default(),
            right_children: Vec::default(),

            b_parent: None,
            b_left: None,
            b_right: None,
            b_factor: 0,
            b_count: 0,

            lsalm: SalmLink::default(),
            rsalm: SalmLink::default(),
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[inline]
    pub fn salm(&self, side: Side) -> &SalmLink {
        match side {
            Side::Left => &self.lsalm,
            Side::Right => &self.rsalm,
        }
    }

    #[inline]
    pub fn salm_mut(&mut self, side: Side) -> &mut SalmLink {
        match side {
            Side::Left => &mut self.lsalm,
            Side::Right => &mut self.rsalm,
        }
    }

    // Siblings on the flank this node hangs off its parent.
    #[inline]
    pub fn children(&self, is_left: bool) -> &Vec<usize> {
        if is_left {
            &self.left_children
        } else {
            &self.right_children
        }
    }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
