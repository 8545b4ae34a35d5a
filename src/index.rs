//! Module implement the replicated character sequence.
//!
//! [Index] owns the node arena and keeps three coupled views over it:
//!
//! * The _interleaving tree_, where every node hangs off its parent's
//!   left or right flank and same-flank siblings are ordered by
//!   ascending id. Its canonical in-order walk, left-children then self
//!   then right-children, is the ground-truth character order.
//! * The _balanced index_, an AVL tree whose in-order walk equals the
//!   canonical walk and whose nodes carry counts of present descendants,
//!   so index-to-node and node-to-index resolve in O(log n).
//! * Two _split-append list managers_, refer [crate::salm], used while
//!   inserting to find a fresh node's in-order neighbor without walking
//!   the unbalanced interleaving tree.
//!
//! Nodes are never removed. Deletion tombstones a node, keeping its
//! position alive as anchor for concurrent edits.

use std::collections::{HashMap, VecDeque};

use crate::{
    depth::Depth,
    node::{Node, ROOT_ID},
    salm::{self, Side},
    stats::Stats,
    Error, Result,
};

// In-order neighbor of a freshly spliced node, tombstones counted.
enum Neighbor {
    Pred(usize),
    Succ(usize),
}

/// Index type for the replicated character sequence.
///
/// Host one replica's copy of the sequence. Mutations come in as
/// operation parts, refer [Index::apply_insert] and [Index::apply_delete].
/// The [crate::Replica] façade wraps them behind the wire format and the
/// runtime contract.
pub struct Index {
    name: String,
    nodes: Vec<Node>,
    ids: HashMap<String, usize>,
    b_root: usize,
    n_deleted: usize,
}

impl Index {
    pub fn new(name: &str) -> Index {
        let root = Node::new_root();
        let mut ids = HashMap::new();
        ids.insert(ROOT_ID.to_string(), 0);

        Index {
            name: name.to_string(),
            nodes: vec![root],
            ids,
            b_root: 0,
            n_deleted: 0,
        }
    }

    /// Identify this index instance.
    #[inline]
    pub fn to_name(&self) -> String {
        self.name.clone()
    }

    /// Return number of present characters in the sequence.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes[self.b_root].b_count
    }

    /// Return whether the sequence has no present characters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return number of nodes marked as deleted.
    #[inline]
    pub fn deleted_count(&self) -> usize {
        self.n_deleted
    }

    /// Return total number of character nodes, tombstones included, the
    /// root sentinel excluded.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }
}

impl Index {
    /// Splice a new character node into the sequence. `id` must be fresh,
    /// `parent` must resolve, `left` picks the parent flank. Return the
    /// index the character lands at.
    pub fn apply_insert(
        &mut self,
        id: &str,
        parent: &str,
        left: bool,
        value: char,
    ) -> Result<usize> {
        if id.is_empty() {
            return err_at!(Invalid, msg: "insert with empty id");
        } else if self.ids.contains_key(id) {
            return err_at!(Invalid, msg: "duplicate insert {:?}", id);
        }
        let p = match self.ids.get(parent) {
            Some(p) => *p,
            None => return err_at!(UnknownId, msg: "insert under {:?}", parent),
        };

        let n = self.nodes.len();
        self.nodes.push(Node::new(id, value, p, left));
        self.ids.insert(id.to_string(), n);

        let k = self.splice(n, p)?;
        let neighbor = self.neighbor_of(n, p, k);
        self.b_attach(n, neighbor);
        self.bump_counts(n);
        self.retrace(n);
        self.update_salm(n, p, k);

        Ok(self.node_to_index(n).0)
    }

    /// Tombstone the node identified by `id`. Return the index the
    /// character held and its value, or None when the node is already
    /// tombstoned, duplicate deletes are no-ops.
    pub fn apply_delete(&mut self, id: &str) -> Result<Option<(usize, char)>> {
        let n = match self.ids.get(id) {
            Some(n) => *n,
            None => return err_at!(UnknownId, msg: "delete {:?}", id),
        };
        if !self.nodes[n].is_present {
            return Ok(None);
        }

        let (index, _) = self.node_to_index(n);
        self.nodes[n].is_present = false;
        self.nodes[n].b_count -= 1;
        self.n_deleted += 1;

        let mut cur = self.nodes[n].b_parent;
        while let Some(x) = cur {
            self.nodes[x].b_count -= 1;
            cur = self.nodes[x].b_parent;
        }

        Ok(Some((index, self.nodes[n].value)))
    }

    // Anchor for a local edit at cursor `at`. Return the parent id and
    // flank for the next inserted character.
    pub(crate) fn anchor_of(&self, at: usize) -> Result<(String, bool)> {
        let origin = if at == 0 { 0 } else { self.index_to_node(at - 1)? };
        if self.nodes[origin].right_children.is_empty() {
            Ok((self.nodes[origin].id.clone(), false))
        } else {
            match self.next_node(origin) {
                Some(next) => Ok((self.nodes[next].id.clone(), true)),
                None => err_at!(Fatal, msg: "origin with right flank has no successor"),
            }
        }
    }
}

impl Index {
    /// Return the stable id of the character at `index`.
    pub fn position_at(&self, index: usize) -> Result<String> {
        let n = self.index_to_node(index)?;
        Ok(self.nodes[n].id.clone())
    }

    /// Return `(ge_index, is_present)` for the node identified by `id`.
    /// `ge_index` counts the present characters strictly preceding the
    /// node, which is the node's own index while it is present.
    pub fn index_of(&self, id: &str) -> Result<(usize, bool)> {
        match self.ids.get(id) {
            Some(n) => Ok(self.node_to_index(*n)),
            None => err_at!(UnknownId, msg: "index_of {:?}", id),
        }
    }

    /// Render the present characters, in sequence order.
    pub fn to_text(&self) -> String {
        let text: String = self.iter().collect();
        debug_assert_eq!(text.chars().count(), self.len());
        text
    }

    // Walk down the balanced index by present-counts.
    pub(crate) fn index_to_node(&self, index: usize) -> Result<usize> {
        if index >= self.len() {
            return err_at!(IndexOutOfBounds, msg: "index {}/{}", index, self.len());
        }
        let mut i = index;
        let mut cur = self.b_root;
        loop {
            let lc = self.left_count(cur);
            if i < lc {
                cur = match self.nodes[cur].b_left {
                    Some(left) => left,
                    None => break err_at!(Fatal, msg: "count undershoots on the left"),
                };
                continue;
            }
            i -= lc;
            if self.nodes[cur].is_present {
                if i == 0 {
                    break Ok(cur);
                }
                i -= 1;
            }
            cur = match self.nodes[cur].b_right {
                Some(right) => right,
                None => break err_at!(Fatal, msg: "count overshoots on the right"),
            };
        }
    }

    // Climb the balanced index accumulating present-counts on the left.
    pub(crate) fn node_to_index(&self, n: usize) -> (usize, bool) {
        let mut ge_index = self.left_count(n);
        let mut cur = n;
        while let Some(parent) = self.nodes[cur].b_parent {
            if self.nodes[parent].b_right == Some(cur) {
                let present = if self.nodes[parent].is_present { 1 } else { 0 };
                ge_index += self.left_count(parent) + present;
            }
            cur = parent;
        }
        (ge_index, self.nodes[n].is_present)
    }

    // In-order successor over the balanced index, tombstones included.
    // None when `n` is the in-order last node.
    pub(crate) fn next_node(&self, n: usize) -> Option<usize> {
        match self.nodes[n].b_right {
            Some(right) => {
                let mut cur = right;
                while let Some(left) = self.nodes[cur].b_left {
                    cur = left;
                }
                Some(cur)
            }
            None => {
                let mut cur = n;
                loop {
                    let parent = self.nodes[cur].b_parent?;
                    if self.nodes[parent].b_left == Some(cur) {
                        break Some(parent);
                    }
                    cur = parent;
                }
            }
        }
    }

    #[inline]
    fn left_count(&self, n: usize) -> usize {
        self.nodes[n].b_left.map(|l| self.nodes[l].b_count).unwrap_or(0)
    }
}

impl Index {
    // Step 1: enter the interleaving tree under parent `p`, at the
    // sibling position its id sorts to. Return that position.
    fn splice(&mut self, n: usize, p: usize) -> Result<usize> {
        let left = self.nodes[n].is_left_child;
        let k = {
            let id = self.nodes[n].id.as_str();
            let siblings = self.nodes[p].children(left);
            match siblings.binary_search_by(|&s| self.nodes[s].id.as_str().cmp(id)) {
                Ok(_) => return err_at!(Fatal, msg: "sibling with duplicate id {:?}", id),
                Err(k) => k,
            }
        };
        if left {
            self.nodes[p].left_children.insert(k, n);
        } else {
            self.nodes[p].right_children.insert(k, n);
        }
        Ok(k)
    }

    // Step 2: in-order neighbor of the spliced node, tombstones counted.
    // Left children look ahead to a successor, right children look back
    // to a predecessor, the parent when the node sits on the flank's
    // inner edge, otherwise the far descendant of the adjacent sibling.
    fn neighbor_of(&self, n: usize, p: usize, k: usize) -> Neighbor {
        if self.nodes[n].is_left_child {
            let siblings = &self.nodes[p].left_children;
            if k + 1 == siblings.len() {
                Neighbor::Succ(p)
            } else {
                Neighbor::Succ(salm::get_end(&self.nodes, Side::Left, siblings[k + 1]))
            }
        } else {
            let siblings = &self.nodes[p].right_children;
            if k == 0 {
                Neighbor::Pred(p)
            } else {
                Neighbor::Pred(salm::get_end(&self.nodes, Side::Right, siblings[k - 1]))
            }
        }
    }

    // Step 3: hang the node off the balanced index right next to its
    // neighbor, at a null slot.
    fn b_attach(&mut self, n: usize, neighbor: Neighbor) {
        match neighbor {
            Neighbor::Pred(p) => match self.nodes[p].b_right {
                None => {
                    self.nodes[p].b_right = Some(n);
                    self.nodes[n].b_parent = Some(p);
                }
                Some(right) => {
                    let mut cur = right;
                    while let Some(left) = self.nodes[cur].b_left {
                        cur = left;
                    }
                    self.nodes[cur].b_left = Some(n);
                    self.nodes[n].b_parent = Some(cur);
                }
            },
            Neighbor::Succ(s) => match self.nodes[s].b_left {
                None => {
                    self.nodes[s].b_left = Some(n);
                    self.nodes[n].b_parent = Some(s);
                }
                Some(left) => {
                    let mut cur = left;
                    while let Some(right) = self.nodes[cur].b_right {
                        cur = right;
                    }
                    self.nodes[cur].b_right = Some(n);
                    self.nodes[n].b_parent = Some(cur);
                }
            },
        }
    }

    // Step 4: the new node is present, every balanced ancestor gains one.
    fn bump_counts(&mut self, n: usize) {
        self.nodes[n].b_count = 1;
        let mut cur = self.nodes[n].b_parent;
        while let Some(x) = cur {
            self.nodes[x].b_count += 1;
            cur = self.nodes[x].b_parent;
        }
    }

    // Step 5: AVL insertion retrace with balance factors, one single or
    // double rotation at the deepest unbalanced ancestor.
    fn retrace(&mut self, n: usize) {
        let mut z = n;
        while let Some(x) = self.nodes[z].b_parent {
            let grand: Option<usize>;
            let sub_root: usize;
            if self.nodes[x].b_right == Some(z) {
                if self.nodes[x].b_factor > 0 {
                    grand = self.nodes[x].b_parent;
                    sub_root = if self.nodes[z].b_factor < 0 {
                        self.rotate_right_left(x, z)
                    } else {
                        self.rotate_left(x, z)
                    };
                } else if self.nodes[x].b_factor < 0 {
                    self.nodes[x].b_factor = 0;
                    return;
                } else {
                    self.nodes[x].b_factor = 1;
                    z = x;
                    continue;
                }
            } else {
                if self.nodes[x].b_factor < 0 {
                    grand = self.nodes[x].b_parent;
                    sub_root = if self.nodes[z].b_factor > 0 {
                        self.rotate_left_right(x, z)
                    } else {
                        self.rotate_right(x, z)
                    };
                } else if self.nodes[x].b_factor > 0 {
                    self.nodes[x].b_factor = 0;
                    return;
                } else {
                    self.nodes[x].b_factor = -1;
                    z = x;
                    continue;
                }
            }

            self.nodes[sub_root].b_parent = grand;
            match grand {
                Some(g) => {
                    if self.nodes[g].b_left == Some(x) {
                        self.nodes[g].b_left = Some(sub_root);
                    } else {
                        self.nodes[g].b_right = Some(sub_root);
                    }
                }
                None => self.b_root = sub_root,
            }
            return;
        }
    }

    //      x                z
    //     / \              / \
    //   t1   z    ==>     x   t4
    //       / \          / \
    //     t23  t4      t1   t23
    //
    fn rotate_left(&mut self, x: usize, z: usize) -> usize {
        let t23 = self.nodes[z].b_left;
        self.nodes[x].b_right = t23;
        if let Some(t) = t23 {
            self.nodes[t].b_parent = Some(x);
        }
        self.nodes[z].b_left = Some(x);
        self.nodes[x].b_parent = Some(z);

        if self.nodes[z].b_factor == 0 {
            self.nodes[x].b_factor = 1;
            self.nodes[z].b_factor = -1;
        } else {
            self.nodes[x].b_factor = 0;
            self.nodes[z].b_factor = 0;
        }

        self.refresh_count(x);
        self.refresh_count(z);
        z
    }

    //        x             z
    //       / \           / \
    //      z   t4  ==>  t1   x
    //     / \               / \
    //   t1   t23         t23   t4
    //
    fn rotate_right(&mut self, x: usize, z: usize) -> usize {
        let t23 = self.nodes[z].b_right;
        self.nodes[x].b_left = t23;
        if let Some(t) = t23 {
            self.nodes[t].b_parent = Some(x);
        }
        self.nodes[z].b_right = Some(x);
        self.nodes[x].b_parent = Some(z);

        if self.nodes[z].b_factor == 0 {
            self.nodes[x].b_factor = -1;
            self.nodes[z].b_factor = 1;
        } else {
            self.nodes[x].b_factor = 0;
            self.nodes[z].b_factor = 0;
        }

        self.refresh_count(x);
        self.refresh_count(z);
        z
    }

    //      x                  y
    //     / \               /   \
    //   t1   z             x     z
    //       / \    ==>    / \   / \
    //      y   t4       t1  t2 t3  t4
    //     / \
    //   t2   t3
    //
    fn rotate_right_left(&mut self, x: usize, z: usize) -> usize {
        let y = match self.nodes[z].b_left {
            Some(y) => y,
            None => panic!("rotate_right_left: no pivot, call-the-programmer"),
        };

        let t3 = self.nodes[y].b_right;
        self.nodes[z].b_left = t3;
        if let Some(t) = t3 {
            self.nodes[t].b_parent = Some(z);
        }
        self.nodes[y].b_right = Some(z);
        self.nodes[z].b_parent = Some(y);

        let t2 = self.nodes[y].b_left;
        self.nodes[x].b_right = t2;
        if let Some(t) = t2 {
            self.nodes[t].b_parent = Some(x);
        }
        self.nodes[y].b_left = Some(x);
        self.nodes[x].b_parent = Some(y);

        if self.nodes[y].b_factor == 0 {
            self.nodes[x].b_factor = 0;
            self.nodes[z].b_factor = 0;
        } else if self.nodes[y].b_factor > 0 {
            self.nodes[x].b_factor = -1;
            self.nodes[z].b_factor = 0;
        } else {
            self.nodes[x].b_factor = 0;
            self.nodes[z].b_factor = 1;
        }
        self.nodes[y].b_factor = 0;

        self.refresh_count(x);
        self.refresh_count(z);
        self.refresh_count(y);
        y
    }

    //          x              y
    //         / \           /   \
    //        z   t4        z     x
    //       / \     ==>   / \   / \
    //     t1   y        t1  t2 t3  t4
    //         / \
    //       t2   t3
    //
    fn rotate_left_right(&mut self, x: usize, z: usize) -> usize {
        let y = match self.nodes[z].b_right {
            Some(y) => y,
            None => panic!("rotate_left_right: no pivot, call-the-programmer"),
        };

        let t2 = self.nodes[y].b_left;
        self.nodes[z].b_right = t2;
        if let Some(t) = t2 {
            self.nodes[t].b_parent = Some(z);
        }
        self.nodes[y].b_left = Some(z);
        self.nodes[z].b_parent = Some(y);

        let t3 = self.nodes[y].b_right;
        self.nodes[x].b_left = t3;
        if let Some(t) = t3 {
            self.nodes[t].b_parent = Some(x);
        }
        self.nodes[y].b_right = Some(x);
        self.nodes[x].b_parent = Some(y);

        if self.nodes[y].b_factor == 0 {
            self.nodes[x].b_factor = 0;
            self.nodes[z].b_factor = 0;
        } else if self.nodes[y].b_factor < 0 {
            self.nodes[x].b_factor = 1;
            self.nodes[z].b_factor = 0;
        } else {
            self.nodes[x].b_factor = 0;
            self.nodes[z].b_factor = -1;
        }
        self.nodes[y].b_factor = 0;

        self.refresh_count(x);
        self.refresh_count(z);
        self.refresh_count(y);
        y
    }

    // Counts are recomputed bottom-up on the nodes a rotation re-parents.
    fn refresh_count(&mut self, n: usize) {
        let lc = self.nodes[n].b_left.map(|l| self.nodes[l].b_count).unwrap_or(0);
        let rc = self.nodes[n].b_right.map(|r| self.nodes[r].b_count).unwrap_or(0);
        let present = if self.nodes[n].is_present { 1 } else { 0 };
        self.nodes[n].b_count = lc + rc + present;
    }

    // Step 6: keep the spine lists in sync with the new sibling layout.
    // A node entering a flank's outer edge extends the parent's spine,
    // severing the spine's old continuation when one existed. Any other
    // position starts its own singleton spine.
    fn update_salm(&mut self, n: usize, p: usize, k: usize) {
        if self.nodes[n].is_left_child {
            salm::create(&mut self.nodes, Side::Right, n);
            if k == 0 {
                if self.nodes[p].left_children.len() >= 2 {
                    salm::split(&mut self.nodes, Side::Left, p);
                }
                salm::append(&mut self.nodes, Side::Left, p, n);
            } else {
                salm::create(&mut self.nodes, Side::Left, n);
            }
        } else {
            salm::create(&mut self.nodes, Side::Left, n);
            let last = self.nodes[p].right_children.len() - 1;
            if k == last {
                if self.nodes[p].right_children.len() >= 2 {
                    salm::split(&mut self.nodes, Side::Right, p);
                }
                salm::append(&mut self.nodes, Side::Right, p, n);
            } else {
                salm::create(&mut self.nodes, Side::Right, n);
            }
        }
    }
}

impl Index {
    /// Iterate over the present characters in sequence order.
    pub fn iter(&self) -> Iter {
        let mut paths = Vec::default();
        self.build_iter(IFlag::Left, Some(self.b_root), &mut paths);
        Iter { index: self, paths }
    }

    // Push the spine starting at `node`, pruning subtrees holding no
    // present characters.
    fn build_iter(&self, flag: IFlag, node: Option<usize>, paths: &mut Vec<Fragment>) {
        if let Some(n) = node {
            if self.nodes[n].b_count == 0 {
                return;
            }
            paths.push(Fragment { flag, node: n });
            let next = match flag {
                IFlag::Left => self.nodes[n].b_left,
                IFlag::Right => self.nodes[n].b_right,
                IFlag::Center => unreachable!(),
            };
            self.build_iter(flag, next, paths)
        }
    }
}

impl Index {
    /// Validate the coupled structures with following rules:
    ///
    /// * In-order of the balanced index must equal the canonical in-order
    ///   of the interleaving tree.
    /// * Same-flank siblings must be strictly ascending by id, children
    ///   must link back to their parent.
    /// * For every node, `b_count` must equal present-self plus the
    ///   children's `b_count`, and the stored balance factor must match
    ///   the subtree heights, within the AVL bound.
    /// * Spine lists must resolve every node's leftmost and rightmost
    ///   descendant.
    /// * Rendered text length must equal `len()`.
    pub fn validate(&self) -> Result<()> {
        if !self.nodes[0].is_root() || self.nodes[0].is_present {
            err_at!(InvariantViolation, msg: "root sentinel corrupted")?;
        }
        let canonical = self.canonical_inorder();
        let balanced = self.balanced_inorder();
        if canonical != balanced {
            err_at!(InvariantViolation, msg: "in-order walks disagree")?;
        }
        if self.ids.len() != self.nodes.len() {
            err_at!(InvariantViolation, msg: "directory out of step with arena")?;
        }

        self.validate_interleaving()?;
        self.validate_balanced(Some(self.b_root))?;
        self.validate_salm()?;

        let n = self.iter().count();
        if n != self.len() {
            err_at!(InvariantViolation, msg: "text length {}/{}", n, self.len())?;
        }

        Ok(())
    }

    fn validate_interleaving(&self) -> Result<()> {
        for (n, node) in self.nodes.iter().enumerate() {
            match self.ids.get(&node.id) {
                Some(h) if *h == n => (),
                _ => err_at!(InvariantViolation, msg: "directory misses {:?}", node.id)?,
            }
            for (is_left, children) in
                [(true, &node.left_children), (false, &node.right_children)].iter()
            {
                for (k, c) in children.iter().enumerate() {
                    let child = &self.nodes[*c];
                    if child.parent != Some(n) || child.is_left_child != *is_left {
                        err_at!(InvariantViolation, msg: "bad anchor under {:?}", node.id)?;
                    }
                    if k > 0 && self.nodes[children[k - 1]].id >= child.id {
                        err_at!(InvariantViolation, msg: "sibling order under {:?}", node.id)?;
                    }
                }
            }
        }
        Ok(())
    }

    // Return (height, present-count) while checking factors and counts.
    fn validate_balanced(&self, n: Option<usize>) -> Result<(i32, usize)> {
        let n = match n {
            Some(n) => n,
            None => return Ok((-1, 0)),
        };
        let node = &self.nodes[n];

        for child in [node.b_left, node.b_right].iter().filter_map(|c| *c) {
            if self.nodes[child].b_parent != Some(n) {
                err_at!(InvariantViolation, msg: "balanced parent link at {:?}", node.id)?;
            }
        }

        let (lh, lc) = self.validate_balanced(node.b_left)?;
        let (rh, rc) = self.validate_balanced(node.b_right)?;

        if (rh - lh).abs() > 1 {
            err_at!(InvariantViolation, msg: "avl violation at {:?} {} {}", node.id, lh, rh)?;
        }
        if i32::from(node.b_factor) != rh - lh {
            err_at!(InvariantViolation, msg: "balance factor at {:?}", node.id)?;
        }
        let present = if node.is_present { 1 } else { 0 };
        if node.b_count != lc + rc + present {
            err_at!(InvariantViolation, msg: "count {} at {:?}", node.b_count, node.id)?;
        }

        Ok((1 + i32::max(lh, rh), lc + rc + present))
    }

    fn validate_salm(&self) -> Result<()> {
        salm::validate(&self.nodes, Side::Left)?;
        salm::validate(&self.nodes, Side::Right)?;

        for n in 0..self.nodes.len() {
            let mut leftmost = n;
            while let Some(c) = self.nodes[leftmost].left_children.first() {
                leftmost = *c;
            }
            if salm::get_end(&self.nodes, Side::Left, n) != leftmost {
                err_at!(InvariantViolation, msg: "left spine at {:?}", self.nodes[n].id)?;
            }

            let mut rightmost = n;
            while let Some(c) = self.nodes[rightmost].right_children.last() {
                rightmost = *c;
            }
            if salm::get_end(&self.nodes, Side::Right, n) != rightmost {
                err_at!(InvariantViolation, msg: "right spine at {:?}", self.nodes[n].id)?;
            }
        }
        Ok(())
    }

    // Canonical walk of the interleaving tree, root sentinel included,
    // iterative since the tree is as deep as the edit history makes it.
    fn canonical_inorder(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
        while let Some((n, step)) = stack.pop() {
            let nl = self.nodes[n].left_children.len();
            if step < nl {
                stack.push((n, step + 1));
                stack.push((self.nodes[n].left_children[step], 0));
            } else if step == nl {
                out.push(n);
                stack.push((n, step + 1));
            } else {
                let j = step - nl - 1;
                if let Some(c) = self.nodes[n].right_children.get(j) {
                    stack.push((n, step + 1));
                    stack.push((*c, 0));
                }
            }
        }
        out
    }

    fn balanced_inorder(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = Vec::default();
        let mut cur = Some(self.b_root);
        loop {
            while let Some(c) = cur {
                stack.push(c);
                cur = self.nodes[c].b_left;
            }
            match stack.pop() {
                Some(n) => {
                    out.push(n);
                    cur = self.nodes[n].b_right;
                }
                None => break out,
            }
        }
    }
}

impl Index {
    /// Gather statistics from this index. Depth distribution is sampled
    /// over the balanced index.
    pub fn to_stats(&self) -> Result<Stats> {
        let mut depths = Depth::default();
        self.sample_depths(Some(self.b_root), 0, &mut depths);

        let mut stats = Stats::new(&self.name);
        stats.n_count = self.len();
        stats.n_deleted = self.n_deleted;
        stats.n_nodes = self.node_count();
        stats.depths = Some(depths);
        Ok(stats)
    }

    fn sample_depths(&self, n: Option<usize>, depth: usize, out: &mut Depth) {
        if let Some(n) = n {
            let (left, right) = (self.nodes[n].b_left, self.nodes[n].b_right);
            if left.is_none() && right.is_none() {
                out.sample(depth);
            } else {
                self.sample_depths(left, depth + 1, out);
                self.sample_depths(right, depth + 1, out);
            }
        }
    }

    // Per-node records in parent-before-child order, for snapshots.
    pub(crate) fn to_records(&self) -> Vec<(String, String, bool, char, bool)> {
        let mut records = Vec::with_capacity(self.node_count());
        let mut queue: VecDeque<usize> = VecDeque::default();
        queue.push_back(0);
        while let Some(n) = queue.pop_front() {
            let node = &self.nodes[n];
            if let Some(p) = node.parent {
                records.push((
                    node.id.clone(),
                    self.nodes[p].id.clone(),
                    node.is_left_child,
                    node.value,
                    node.is_present,
                ));
            }
            for c in node.left_children.iter().chain(node.right_children.iter()) {
                queue.push_back(*c);
            }
        }
        records
    }
}

// Continuous iteration without walking the whole tree from root for
// every character. A FIFO of tree-paths to the previously iterated node
// is maintained, each node in the FIFO is a tuple of node-handle and its
// iteration state (IFlag), together called a Fragment.
struct Fragment {
    flag: IFlag,
    node: usize,
}

#[derive(Copy, Clone)]
enum IFlag {
    Left,   // left path is iterated.
    Center, // current node is iterated.
    Right,  // right paths is being iterated.
}

/// Iterator over the present characters of an [Index], in sequence order.
pub struct Iter<'a> {
    index: &'a Index,
    paths: Vec<Fragment>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        loop {
            let path = self.paths.last_mut()?;
            match path.flag {
                IFlag::Left => {
                    path.flag = IFlag::Center;
                    let node = &self.index.nodes[path.node];
                    if node.is_present {
                        break Some(node.value);
                    }
                }
                IFlag::Center => {
                    path.flag = IFlag::Right;
                    let right = self.index.nodes[path.node].b_right;
                    self.index.build_iter(IFlag::Left, right, &mut self.paths);
                }
                IFlag::Right => {
                    self.paths.pop();
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
