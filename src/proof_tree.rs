//! Storage for the proof tree.
//!
//! Node `(level, position)` holds the commitment to the difference between the
//! right and left halves of the leaves it covers. An opening proof is read off
//! as the `L` nodes on a leaf's path (see [`crate::path_addresses`]).

use std::collections::HashMap;

use ark_ec::pairing::Pairing;
use ark_ff::Zero;

use crate::tree::TreeAddress;
use crate::VcsError;

/// Read/update access to proof-tree nodes.
///
/// Implemented by the dense tree built by [`crate::Vcs::open_all`] and by
/// the sparse tree used for simulated instances.
pub trait ProofTreeStore<E: Pairing> {
    fn height(&self) -> u8;

    /// Whether the node exists and can be read or updated.
    fn contains(&self, address: TreeAddress) -> bool;

    fn node(&self, address: TreeAddress) -> Result<E::G1, VcsError>;

    /// Adds `delta` into the node at `address`.
    fn add_to_node(&mut self, address: TreeAddress, delta: E::G1) -> Result<(), VcsError>;
}

fn check_address(address: TreeAddress, height: u8) -> Result<(), VcsError> {
    if address.level >= height || address.position >> address.level != 0 {
        return Err(VcsError::Domain(format!(
            "proof tree node ({}, {}) outside a tree of height {}",
            address.level, address.position, height
        )));
    }
    Ok(())
}

/// Fully materialized proof tree: level `i` holds `2^i` nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DenseProofTree<E: Pairing> {
    height: u8,
    levels: Vec<Vec<E::G1>>,
}

impl<E: Pairing> DenseProofTree<E> {
    /// Tree of the given height with every node set to the identity.
    pub fn new(height: u8) -> Self {
        let levels = (0..height)
            .map(|level| vec![E::G1::zero(); 1usize << level])
            .collect();
        Self { height, levels }
    }

    pub fn levels(&self) -> &[Vec<E::G1>] {
        &self.levels
    }

    pub(crate) fn set_node(&mut self, address: TreeAddress, value: E::G1) {
        self.levels[address.level as usize][address.position as usize] = value;
    }
}

impl<E: Pairing> ProofTreeStore<E> for DenseProofTree<E> {
    fn height(&self) -> u8 {
        self.height
    }

    fn contains(&self, address: TreeAddress) -> bool {
        check_address(address, self.height).is_ok()
    }

    fn node(&self, address: TreeAddress) -> Result<E::G1, VcsError> {
        check_address(address, self.height)?;
        Ok(self.levels[address.level as usize][address.position as usize])
    }

    fn add_to_node(&mut self, address: TreeAddress, delta: E::G1) -> Result<(), VcsError> {
        check_address(address, self.height)?;
        self.levels[address.level as usize][address.position as usize] += delta;
        Ok(())
    }
}

/// Proof tree holding only explicitly inserted nodes.
///
/// Reading or updating a node that was never inserted is a
/// [`VcsError::Domain`] error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SparseProofTree<E: Pairing> {
    height: u8,
    nodes: HashMap<TreeAddress, E::G1>,
}

impl<E: Pairing> SparseProofTree<E> {
    pub fn new(height: u8) -> Self {
        Self {
            height,
            nodes: HashMap::new(),
        }
    }

    /// Inserts or replaces a node.
    pub fn insert_node(&mut self, address: TreeAddress, value: E::G1) -> Result<(), VcsError> {
        check_address(address, self.height)?;
        self.nodes.insert(address, value);
        Ok(())
    }

    /// Number of materialized nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<E: Pairing> ProofTreeStore<E> for SparseProofTree<E> {
    fn height(&self) -> u8 {
        self.height
    }

    fn contains(&self, address: TreeAddress) -> bool {
        self.nodes.contains_key(&address)
    }

    fn node(&self, address: TreeAddress) -> Result<E::G1, VcsError> {
        self.nodes.get(&address).copied().ok_or_else(|| unmaterialized(address))
    }

    fn add_to_node(&mut self, address: TreeAddress, delta: E::G1) -> Result<(), VcsError> {
        let node = self
            .nodes
            .get_mut(&address)
            .ok_or_else(|| unmaterialized(address))?;
        *node += delta;
        Ok(())
    }
}

fn unmaterialized(address: TreeAddress) -> VcsError {
    VcsError::Domain(format!(
        "proof tree node ({}, {}) was never materialized",
        address.level, address.position
    ))
}
