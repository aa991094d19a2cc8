//! Public parameters, trapdoors and the two public-key structures.

use std::collections::HashMap;

use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{Field, One};

use crate::tree::check_index;
use crate::{config::validate_height, VcsError};

/// Height and generators of one vector-commitment instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VcsParams<E: Pairing> {
    /// Tree height `L`
    pub height: u8,
    /// Vector length `2^L`
    pub size: u64,
    /// Generator of G1
    pub g: E::G1Affine,
    /// Generator of G2
    pub h: E::G2Affine,
}

impl<E: Pairing> VcsParams<E> {
    pub fn new(height: u8, g: E::G1Affine, h: E::G2Affine) -> Result<Self, VcsError> {
        validate_height(height)?;
        Ok(Self {
            height,
            size: 1u64 << height,
            g,
            h,
        })
    }

    pub fn check_index(&self, index: u64) -> Result<(), VcsError> {
        check_index(index, self.height)
    }
}

/// Secret scalars `s_i` with the derived `1 - s_i` and `s_i - 1`.
///
/// Only needed while generating keys or simulating large instances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trapdoors<E: Pairing> {
    pub s: Vec<E::ScalarField>,
    pub one_minus_s: Vec<E::ScalarField>,
    pub s_minus_one: Vec<E::ScalarField>,
}

impl<E: Pairing> Trapdoors<E> {
    pub fn from_secrets(s: Vec<E::ScalarField>) -> Self {
        let one = E::ScalarField::one();
        let one_minus_s = s.iter().map(|si| one - si).collect();
        let s_minus_one = s.iter().map(|si| *si - one).collect();
        Self {
            s,
            one_minus_s,
            s_minus_one,
        }
    }

    pub fn height(&self) -> u8 {
        self.s.len() as u8
    }

    /// Exponent of opening-key node `(level, position)`.
    ///
    /// Bit `j` of `position` selects `s_j` when set and `1 - s_j` otherwise.
    pub fn select_upk_exponent(
        &self,
        level: u8,
        position: u64,
    ) -> Result<E::ScalarField, VcsError> {
        if level as usize > self.s.len() {
            return Err(VcsError::Domain(format!(
                "opening key level {} exceeds height {}",
                level,
                self.s.len()
            )));
        }
        let mut prod = E::ScalarField::one();
        for j in 0..level as usize {
            if (position >> j) & 1 == 1 {
                prod *= self.s[j];
            } else {
                prod *= self.one_minus_s[j];
            }
        }
        Ok(prod)
    }
}

/// Opening key (UPK): a perfect binary tree with `L + 1` levels of G1 elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpeningKey<E: Pairing> {
    pub(crate) levels: Vec<Vec<E::G1Affine>>,
}

impl<E: Pairing> OpeningKey<E> {
    /// Builds the tree from elements in level order.
    pub fn from_level_order(height: u8, nodes: Vec<E::G1Affine>) -> Result<Self, VcsError> {
        validate_height(height)?;
        let expected = crate::tree::tree_node_count(height) as usize;
        if nodes.len() != expected {
            return Err(VcsError::size_mismatch(
                "opening key nodes",
                expected,
                nodes.len(),
            ));
        }
        let mut levels = Vec::with_capacity(height as usize + 1);
        let mut iter = nodes.into_iter();
        for level in 0..=height {
            levels.push(iter.by_ref().take(1usize << level).collect());
        }
        Ok(Self { levels })
    }

    pub fn height(&self) -> u8 {
        (self.levels.len() - 1) as u8
    }

    /// All elements of one level; level `L` is the digest basis.
    pub fn level(&self, level: u8) -> Result<&[E::G1Affine], VcsError> {
        self.levels
            .get(level as usize)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                VcsError::Domain(format!(
                    "opening key level {} exceeds height {}",
                    level,
                    self.height()
                ))
            })
    }

    pub fn node(&self, level: u8, position: u64) -> Result<E::G1Affine, VcsError> {
        self.level(level)?
            .get(position as usize)
            .copied()
            .ok_or_else(|| {
                VcsError::Domain(format!(
                    "opening key position {} missing at level {}",
                    position, level
                ))
            })
    }

    /// Level-order flattening, the on-disk layout.
    pub fn iter_level_order(&self) -> impl Iterator<Item = &E::G1Affine> {
        self.levels.iter().flatten()
    }
}

/// Verification key (VRK): per level `H^{s_i}`, `H^{1 - s_i}` and `H^{s_i - 1}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationKey<E: Pairing> {
    /// `H^{s_i}`, paired with proof element `i` when bit `i` of the index is 0
    pub positive: Vec<E::G2Affine>,
    /// `H^{1 - s_i}`, used to check opening-key paths
    pub complement: Vec<E::G2Affine>,
    /// `H^{s_i - 1}`, paired with proof element `i` when bit `i` of the index is 1
    pub negative: Vec<E::G2Affine>,
}

impl<E: Pairing> VerificationKey<E> {
    pub fn from_trapdoors(h: E::G2Affine, trapdoors: &Trapdoors<E>) -> Self {
        let h = h.into_group();
        let mul_all = |scalars: &[E::ScalarField]| {
            let points: Vec<E::G2> = scalars.iter().map(|s| h * s).collect();
            E::G2::normalize_batch(&points)
        };
        Self {
            positive: mul_all(&trapdoors.s),
            complement: mul_all(&trapdoors.one_minus_s),
            negative: mul_all(&trapdoors.s_minus_one),
        }
    }

    pub fn height(&self) -> u8 {
        self.positive.len() as u8
    }

    /// G2 element paired with proof slot `level` for an index whose bit is `bit`.
    pub fn select(&self, level: usize, bit: bool) -> E::G2Affine {
        if bit {
            self.negative[level]
        } else {
            self.positive[level]
        }
    }
}

/// Supplies the opening-key path of a leaf.
///
/// The path has `L` elements in root-to-leaf order: entry `j` is opening-key
/// node `(j + 1, index mod 2^(j + 1))`, so the last entry is the leaf basis
/// element used for digest updates. In sparse mode this is the external
/// opening-key database.
pub trait OpeningKeySource<E: Pairing> {
    fn opening_path(&self, index: u64) -> Result<Vec<E::G1Affine>, VcsError>;
}

impl<E: Pairing> OpeningKeySource<E> for OpeningKey<E> {
    fn opening_path(&self, index: u64) -> Result<Vec<E::G1Affine>, VcsError> {
        let height = self.height();
        check_index(index, height)?;
        (1..=height)
            .map(|level| self.node(level, index & ((1u64 << level) - 1)))
            .collect()
    }
}

impl<E: Pairing> OpeningKeySource<E> for HashMap<u64, Vec<E::G1Affine>> {
    fn opening_path(&self, index: u64) -> Result<Vec<E::G1Affine>, VcsError> {
        self.get(&index).cloned().ok_or_else(|| {
            VcsError::Domain(format!("no opening-key path stored for index {}", index))
        })
    }
}

/// Derives opening-key paths on demand from the trapdoors.
///
/// Used when `2^(L+1)` key elements do not fit in memory.
#[derive(Clone, Copy, Debug)]
pub struct TrapdoorPathSource<'a, E: Pairing> {
    pub params: &'a VcsParams<E>,
    pub trapdoors: &'a Trapdoors<E>,
}

impl<E: Pairing> OpeningKeySource<E> for TrapdoorPathSource<'_, E> {
    fn opening_path(&self, index: u64) -> Result<Vec<E::G1Affine>, VcsError> {
        self.params.check_index(index)?;
        let g = self.params.g.into_group();
        let points = (1..=self.params.height)
            .map(|level| Ok(g * self.trapdoors.select_upk_exponent(level, index)?))
            .collect::<Result<Vec<E::G1>, VcsError>>()?;
        Ok(E::G1::normalize_batch(&points))
    }
}

/// Sanity check that a scalar is not one of the degenerate trapdoor values.
pub(crate) fn is_degenerate_trapdoor<F: Field>(s: &F) -> bool {
    s.is_zero() || s.is_one()
}
