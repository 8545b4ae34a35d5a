//! Module implement the split-append list manager, SALM.
//!
//! The leftmost-descendant relation of the interleaving tree partitions
//! its nodes into disjoint spines, maximal chains of repeated
//! first-left-child descents. The rightmost-descendant relation does the
//! same with last-right-child descents. Each spine is kept as one list,
//! ordered from the spine's top to its deepest descendant, so that the
//! leftmost (rightmost) descendant of any node is the last element of
//! the list containing it.
//!
//! A list is an AVL tree keyed positionally, no key comparisons, the
//! in-order walk of the tree is the list order. Nodes carry stored
//! heights, missing children have height -1. `append` and `split` go
//! through the join-based algorithm, so both are logarithmic in the
//! list length.
//!
//! Lists are identified implicitly, the tree root is the node whose
//! list-parent is `None`. Every operation here works on the shared node
//! arena, selecting one of the two link sets through [Side].

use std::cmp;

use crate::{node::Node, Error, Result};

/// Select one of the two split-append list memberships carried by a node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    /// Lists of the leftmost-descendant relation.
    Left,
    /// Lists of the rightmost-descendant relation.
    Right,
}

// Start a new singleton list containing `v`, severing any previous
// membership of `v`.
pub fn create(nodes: &mut [Node], side: Side, v: usize) {
    let link = nodes[v].salm_mut(side);
    link.parent = None;
    link.left = None;
    link.right = None;
    link.height = 0;
}

// Append `v` after the last element of the list containing `e`. `v` must
// not be member of any list.
pub fn append(nodes: &mut [Node], side: Side, e: usize, v: usize) {
    let root = root_of(nodes, side, e);
    create(nodes, side, v);
    join(nodes, side, Some(root), v, None);
}

/// Return the last element of the list containing `v`, in O(log n).
pub fn get_end(nodes: &[Node], side: Side, v: usize) -> usize {
    let mut cur = root_of(nodes, side, v);
    while let Some(right) = nodes[cur].salm(side).right {
        cur = right;
    }
    cur
}

// Split the list containing `v` into `[start, v]` and `(v, end]`, leaving
// `v` as the last element of the left half. The right half becomes an
// independent list.
pub fn split(nodes: &mut [Node], side: Side, v: usize) {
    let mut left = take_child(nodes, side, v, true);
    let mut right = take_child(nodes, side, v, false);

    let mut cur = v;
    let mut parent = nodes[v].salm_mut(side).parent.take();
    while let Some(p) = parent {
        let next = nodes[p].salm(side).parent;
        let cur_on_right = nodes[p].salm(side).right == Some(cur);
        nodes[p].salm_mut(side).parent = None;
        if cur_on_right {
            // p and everything on its left precede the split point.
            nodes[p].salm_mut(side).right = None;
            let pl = take_child(nodes, side, p, true);
            left = Some(join(nodes, side, pl, p, left));
        } else {
            nodes[p].salm_mut(side).left = None;
            let pr = take_child(nodes, side, p, false);
            right = Some(join(nodes, side, right, p, pr));
        }
        cur = p;
        parent = next;
    }

    // the split excluded `v` from both halves, re-append it to the left.
    create(nodes, side, v);
    if let Some(l) = left {
        join(nodes, side, Some(l), v, None);
    }
}

// Walk up to the root of the list containing `v`.
fn root_of(nodes: &[Node], side: Side, v: usize) -> usize {
    let mut cur = v;
    while let Some(parent) = nodes[cur].salm(side).parent {
        cur = parent;
    }
    cur
}

#[inline]
fn height(nodes: &[Node], side: Side, t: Option<usize>) -> i32 {
    t.map(|n| nodes[n].salm(side).height).unwrap_or(-1)
}

fn update_height(nodes: &mut [Node], side: Side, n: usize) {
    let hl = height(nodes, side, nodes[n].salm(side).left);
    let hr = height(nodes, side, nodes[n].salm(side).right);
    nodes[n].salm_mut(side).height = 1 + cmp::max(hl, hr);
}

fn set_left(nodes: &mut [Node], side: Side, n: usize, child: Option<usize>) {
    nodes[n].salm_mut(side).left = child;
    if let Some(c) = child {
        nodes[c].salm_mut(side).parent = Some(n);
    }
}

fn set_right(nodes: &mut [Node], side: Side, n: usize, child: Option<usize>) {
    nodes[n].salm_mut(side).right = child;
    if let Some(c) = child {
        nodes[c].salm_mut(side).parent = Some(n);
    }
}

// Detach and return one child subtree of `n`.
fn take_child(nodes: &mut [Node], side: Side, n: usize, left: bool) -> Option<usize> {
    let child = if left {
        nodes[n].salm_mut(side).left.take()
    } else {
        nodes[n].salm_mut(side).right.take()
    };
    if let Some(c) = child {
        nodes[c].salm_mut(side).parent = None;
    }
    child
}

// Build the subtree (l, k, r), heights of l and r may differ by at most
// one. Return k as subtree root with no parent.
fn mk(nodes: &mut [Node], side: Side, l: Option<usize>, k: usize, r: Option<usize>) -> usize {
    set_left(nodes, side, k, l);
    set_right(nodes, side, k, r);
    nodes[k].salm_mut(side).parent = None;
    update_height(nodes, side, k);
    k
}

// Join list l, element k and list r into one balanced list, in that
// order. Return the root of the joined list.
fn join(nodes: &mut [Node], side: Side, l: Option<usize>, k: usize, r: Option<usize>) -> usize {
    let (hl, hr) = (height(nodes, side, l), height(nodes, side, r));
    if hl > hr + 1 {
        match l {
            Some(l) => join_right(nodes, side, l, k, r),
            None => panic!("join: empty tall list, call-the-programmer"),
        }
    } else if hr > hl + 1 {
        match r {
            Some(r) => join_left(nodes, side, l, k, r),
            None => panic!("join: empty tall list, call-the-programmer"),
        }
    } else {
        mk(nodes, side, l, k, r)
    }
}

// Descend the right flank of the taller list `tl` until `r` can be
// joined without upsetting the AVL invariant by more than one rotation.
fn join_right(nodes: &mut [Node], side: Side, tl: usize, k: usize, r: Option<usize>) -> usize {
    let ll = nodes[tl].salm(side).left;
    let c = nodes[tl].salm(side).right;
    if height(nodes, side, c) <= height(nodes, side, r) + 1 {
        let t = mk(nodes, side, c, k, r);
        set_right(nodes, side, tl, Some(t));
        update_height(nodes, side, tl);
        if height(nodes, side, Some(t)) > height(nodes, side, ll) + 1 {
            let t = rotate_right(nodes, side, t);
            set_right(nodes, side, tl, Some(t));
            update_height(nodes, side, tl);
            rotate_left(nodes, side, tl)
        } else {
            tl
        }
    } else {
        let c = match c {
            Some(c) => c,
            None => panic!("join_right: imbalanced spine, call-the-programmer"),
        };
        let t = join_right(nodes, side, c, k, r);
        set_right(nodes, side, tl, Some(t));
        update_height(nodes, side, tl);
        if height(nodes, side, Some(t)) > height(nodes, side, ll) + 1 {
            rotate_left(nodes, side, tl)
        } else {
            tl
        }
    }
}

// Mirror of join_right, descend the left flank of the taller list `tr`.
fn join_left(nodes: &mut [Node], side: Side, l: Option<usize>, k: usize, tr: usize) -> usize {
    let rr = nodes[tr].salm(side).right;
    let c = nodes[tr].salm(side).left;
    if height(nodes, side, c) <= height(nodes, side, l) + 1 {
        let t = mk(nodes, side, l, k, c);
        set_left(nodes, side, tr, Some(t));
        update_height(nodes, side, tr);
        if height(nodes, side, Some(t)) > height(nodes, side, rr) + 1 {
            let t = rotate_left(nodes, side, t);
            set_left(nodes, side, tr, Some(t));
            update_height(nodes, side, tr);
            rotate_right(nodes, side, tr)
        } else {
            tr
        }
    } else {
        let c = match c {
            Some(c) => c,
            None => panic!("join_left: imbalanced spine, call-the-programmer"),
        };
        let t = join_left(nodes, side, l, k, c);
        set_left(nodes, side, tr, Some(t));
        update_height(nodes, side, tr);
        if height(nodes, side, Some(t)) > height(nodes, side, rr) + 1 {
            rotate_right(nodes, side, tr)
        } else {
            tr
        }
    }
}

//      t                z
//     / \              / \
//    a   z    ==>     t   c
//       / \          / \
//      b   c        a   b
//
fn rotate_left(nodes: &mut [Node], side: Side, t: usize) -> usize {
    let z = match nodes[t].salm(side).right {
        Some(z) => z,
        None => panic!("rotate_left: no right child, call-the-programmer"),
    };
    let zl = nodes[z].salm(side).left;
    set_right(nodes, side, t, zl);
    update_height(nodes, side, t);
    set_left(nodes, side, z, Some(t));
    update_height(nodes, side, z);
    nodes[z].salm_mut(side).parent = None;
    z
}

//        t             z
//       / \           / \
//      z   c   ==>   a   t
//     / \               / \
//    a   b             b   c
//
fn rotate_right(nodes: &mut [Node], side: Side, t: usize) -> usize {
    let z = match nodes[t].salm(side).left {
        Some(z) => z,
        None => panic!("rotate_right: no left child, call-the-programmer"),
    };
    let zr = nodes[z].salm(side).right;
    set_left(nodes, side, t, zr);
    update_height(nodes, side, t);
    set_right(nodes, side, z, Some(t));
    update_height(nodes, side, z);
    nodes[z].salm_mut(side).parent = None;
    z
}

// Check link symmetry, stored heights and the AVL invariant for every
// list on `side`.
pub fn validate(nodes: &[Node], side: Side) -> Result<()> {
    for (n, node) in nodes.iter().enumerate() {
        let link = node.salm(side);
        let hl = height(nodes, side, link.left);
        let hr = height(nodes, side, link.right);
        if link.height != 1 + cmp::max(hl, hr) {
            err_at!(InvariantViolation, msg: "salm height at {}: {}", n, link.height)?;
        }
        if (hl - hr).abs() > 1 {
            err_at!(InvariantViolation, msg: "salm balance at {}: {} {}", n, hl, hr)?;
        }
        if let Some(c) = link.left {
            if nodes[c].salm(side).parent != Some(n) {
                err_at!(InvariantViolation, msg: "salm left link at {}", n)?;
            }
        }
        if let Some(c) = link.right {
            if nodes[c].salm(side).parent != Some(n) {
                err_at!(InvariantViolation, msg: "salm right link at {}", n)?;
            }
        }
        if let Some(p) = link.parent {
            let plink = nodes[p].salm(side);
            if plink.left != Some(n) && plink.right != Some(n) {
                err_at!(InvariantViolation, msg: "salm parent link at {}", n)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "salm_test.rs"]
mod salm_test;
