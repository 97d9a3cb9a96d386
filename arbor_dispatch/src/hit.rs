// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit testing: topmost node under a point.
//!
//! ## Selection
//!
//! [`find_top_under`] walks the tree depth-first. A node is a *candidate*
//! when the point lies within its bounds and, for clickable-only queries, it
//! reports clickable. Traversal always continues into children regardless
//! of a node's own candidacy, so a non-clickable container can host
//! clickable descendants.
//!
//! Among candidates, greater depth wins; at equal depth, greater z-order
//! wins; remaining ties go to the node visited later (stable last wins).
//! When nothing qualifies the query resolves to `root` — a miss is not an
//! error.
//!
//! ## Pruning
//!
//! Hidden nodes hide their entire subtree from hit testing. The optional
//! `exclude` handle also prunes its subtree: it exists so a dragged node
//! (whose children travel with it) never occludes the drop target beneath.
//!
//! The hover query is the same walk with the clickable requirement dropped,
//! so cursor/hover styling works independently of interactivity.

use kurbo::Point;

use arbor_event::NodeTree;

struct Best<K> {
    node: K,
    depth: u32,
    z: i32,
}

/// Topmost clickable (or merely visible) node under `point`.
///
/// `exclude` prunes a subtree from consideration. Returns `root` when no
/// node qualifies.
pub fn find_top_under<T: NodeTree>(
    tree: &T,
    root: T::Id,
    point: Point,
    exclude: Option<T::Id>,
    clickable_only: bool,
) -> T::Id {
    let mut best: Option<Best<T::Id>> = None;
    visit(tree, root, 0, point, exclude, clickable_only, &mut best);
    best.map(|b| b.node).unwrap_or(root)
}

/// Topmost visible node under `point`, ignoring clickability.
///
/// Drives hover/cursor styling; equivalent to [`find_top_under`] with
/// `clickable_only = false`.
pub fn find_top_hover<T: NodeTree>(
    tree: &T,
    root: T::Id,
    point: Point,
    exclude: Option<T::Id>,
) -> T::Id {
    find_top_under(tree, root, point, exclude, false)
}

fn visit<T: NodeTree>(
    tree: &T,
    node: T::Id,
    depth: u32,
    point: Point,
    exclude: Option<T::Id>,
    clickable_only: bool,
    best: &mut Option<Best<T::Id>>,
) {
    if exclude == Some(node) || !tree.contains(node) || tree.is_hidden(node) {
        return;
    }
    let in_bounds = tree.bounds(node).is_some_and(|b| b.contains(point));
    if in_bounds && (!clickable_only || tree.is_clickable(node)) {
        let z = tree.z_order(node);
        let better = match best {
            None => true,
            // `>=` so a later-visited candidate wins remaining ties.
            Some(b) => depth > b.depth || (depth == b.depth && z >= b.z),
        };
        if better {
            *best = Some(Best { node, depth, z });
        }
    }
    for child in tree.children_of(node) {
        visit(tree, child, depth + 1, point, exclude, clickable_only, best);
    }
}
