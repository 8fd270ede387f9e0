//! Merkle tree over transaction hashes
//!
//! The tree is stored flat, level by level: the leaves first, then each parent
//! level, ending with the root. A level with an odd number of nodes pairs its
//! last node with itself; the duplicate is not stored.

use crate::hash::hash_multi;
use crate::{CoreError, CoreResult, Hash};
use tracing::trace;

/// Number of nodes in the flattened tree for `leaf_count` leaves
pub fn tree_size(leaf_count: usize) -> usize {
    if leaf_count == 0 {
        return 0;
    }

    let mut total = leaf_count;
    let mut length = leaf_count;
    while length > 1 {
        length = length.div_ceil(2);
        total += length;
    }
    total
}

/// Build the flattened merkle tree for `leaves`
pub fn build_merkle_tree(leaves: &[Hash]) -> CoreResult<Vec<Hash>> {
    if leaves.is_empty() {
        return Err(CoreError::EmptyTree);
    }

    let mut tree = Vec::with_capacity(tree_size(leaves.len()));
    tree.extend_from_slice(leaves);

    let mut start = 0;
    let mut length = leaves.len();
    while length > 1 {
        for i in (0..length).step_by(2) {
            let left = tree[start + i];
            // Odd level: the last node is paired with itself
            let right = tree[start + (i + 1).min(length - 1)];
            tree.push(hash_multi(&left, &right));
        }
        start += length;
        length = length.div_ceil(2);
        trace!(level_size = length, "built merkle level");
    }

    Ok(tree)
}

/// Root of the merkle tree for `leaves`
pub fn merkle_root(leaves: &[Hash]) -> CoreResult<Hash> {
    let tree = build_merkle_tree(leaves)?;
    // A built tree always has at least one node
    tree.last().copied().ok_or(CoreError::EmptyTree)
}

/// Sibling hashes from the leaf at `index` up to (excluding) the root
pub fn merkle_path(tree: &[Hash], leaf_count: usize, index: usize) -> CoreResult<Vec<Hash>> {
    if leaf_count == 0 {
        return Err(CoreError::EmptyTree);
    }
    if index >= leaf_count {
        return Err(CoreError::IndexOutOfRange {
            index,
            len: leaf_count,
        });
    }
    if tree.len() != tree_size(leaf_count) {
        return Err(CoreError::validation(
            "merkle_tree",
            format!(
                "expected {} nodes for {} leaves, found {}",
                tree_size(leaf_count),
                leaf_count,
                tree.len()
            ),
        ));
    }

    let mut path = Vec::new();
    let mut start = 0;
    let mut length = leaf_count;
    let mut idx = index;
    while length > 1 {
        let sibling = if idx % 2 == 0 {
            (idx + 1).min(length - 1)
        } else {
            idx - 1
        };
        path.push(tree[start + sibling]);

        start += length;
        length = length.div_ceil(2);
        idx /= 2;
    }

    Ok(path)
}

/// Check that `leaf` at `index` folds up to `root` through `path`
pub fn check_merkle_path(root: &Hash, leaf: &Hash, index: usize, path: &[Hash]) -> bool {
    let mut current = *leaf;
    let mut idx = index;

    for sibling in path {
        current = if idx % 2 == 0 {
            hash_multi(&current, sibling)
        } else {
            hash_multi(sibling, &current)
        };
        idx /= 2;
    }

    // Leftover index bits mean the path is too short for this position
    idx == 0 && current == *root
}
