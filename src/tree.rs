//! Addressing inside the proof tree and the opening-key tree.
//!
//! Leaves are numbered `0..2^L`. The proof tree has levels `0..L` (root at
//! level 0) and node `(level, position)` covers the leaves
//! `[position * 2^(L - level), (position + 1) * 2^(L - level))`. The opening-key
//! tree has one extra level (`L`) holding one node per leaf, and is stored
//! flattened in level order.

use crate::VcsError;

/// Coordinate of a node: `level` counted from the root, `position` within the level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeAddress {
    pub level: u8,
    pub position: u64,
}

impl TreeAddress {
    pub const fn new(level: u8, position: u64) -> Self {
        Self { level, position }
    }
}

pub(crate) fn check_index(index: u64, height: u8) -> Result<(), VcsError> {
    if index >> height != 0 {
        return Err(VcsError::Domain(format!(
            "leaf index {} out of range for height {}",
            index, height
        )));
    }
    Ok(())
}

/// Position of the node covering `index` at `level`.
pub fn leaf_to_tree_address(index: u64, level: u8, height: u8) -> Result<u64, VcsError> {
    check_index(index, height)?;
    if level > height {
        return Err(VcsError::Domain(format!(
            "level {} exceeds height {}",
            level, height
        )));
    }
    Ok(index >> (height - level))
}

/// Ancestors of a leaf, leaf-adjacent first (level `L - 1` down to the root).
///
/// Entry `j` is the proof-tree node whose commitment appears at position `j`
/// of the leaf's opening proof.
pub fn path_addresses(index: u64, height: u8) -> Result<Vec<TreeAddress>, VcsError> {
    check_index(index, height)?;
    Ok((0..height)
        .map(|j| TreeAddress::new(height - 1 - j, index >> (j + 1)))
        .collect())
}

/// Bit decomposition of `index`, least significant bit first.
pub fn to_binary(index: u64, height: u8) -> Vec<bool> {
    (0..height).map(|i| (index >> i) & 1 == 1).collect()
}

/// Bit decomposition of `index`, most significant bit first.
pub fn to_binary_msb_first(index: u64, height: u8) -> Vec<bool> {
    let mut bits = to_binary(index, height);
    bits.reverse();
    bits
}

/// Maps a level-order array index to `(level, position)`.
///
/// Index 10 of the flattened tree is node `(3, 3)`.
pub fn linear_to_level_position(n: u64) -> Result<(u8, u64), VcsError> {
    let level = n
        .checked_add(1)
        .map(|m| (63 - m.leading_zeros()) as u8)
        .filter(|level| *level < 63)
        .ok_or_else(|| VcsError::Domain(format!("level-order index {} is too large", n)))?;
    Ok((level, n - ((1u64 << level) - 1)))
}

/// Inverse of [`linear_to_level_position`].
pub fn level_position_to_linear(level: u8, position: u64) -> Result<u64, VcsError> {
    if level >= 63 || position >> level != 0 {
        return Err(VcsError::Domain(format!(
            "position {} does not exist at level {}",
            position, level
        )));
    }
    Ok((1u64 << level) - 1 + position)
}

/// Number of nodes in a perfect tree with levels `0..=height`.
pub(crate) fn tree_node_count(height: u8) -> u64 {
    (1u64 << (height as u32 + 1)) - 1
}
