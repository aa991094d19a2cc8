//! The vector-commitment engine.
//!
//! [`Vcs`] owns the public parameters and the public key material for one
//! instance. Its operations are spread over the modules that implement them:
//! key generation in `setup`, commitments and openings in `commitment`,
//! verification in `verifier`, updates in `updater` and key persistence in
//! `storage`.

use ark_ec::pairing::Pairing;

use crate::tree::tree_node_count;
use crate::{OpeningKey, VcsConfig, VcsError, VcsParams, VerificationKey};

/// Engine holding the parameters and keys of one vector-commitment instance.
#[derive(Clone, Debug)]
pub struct Vcs<E: Pairing> {
    pub(crate) params: VcsParams<E>,
    pub(crate) vrk: VerificationKey<E>,
    pub(crate) upk: Option<OpeningKey<E>>,
    pub(crate) config: VcsConfig,
}

impl<E: Pairing> Vcs<E> {
    /// Assembles an engine from existing key material.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::Domain`] if the height in `config` disagrees with
    /// `params`, and [`VcsError::KeyMaterialIncomplete`] if a key is shorter
    /// than the height requires.
    pub fn from_parts(
        config: VcsConfig,
        params: VcsParams<E>,
        vrk: VerificationKey<E>,
        upk: Option<OpeningKey<E>>,
    ) -> Result<Self, VcsError> {
        config.validate()?;
        if config.height != params.height {
            return Err(VcsError::Domain(format!(
                "config height {} does not match parameter height {}",
                config.height, params.height
            )));
        }
        let height = params.height;
        if vrk.positive.len() < height as usize
            || vrk.complement.len() < height as usize
            || vrk.negative.len() < height as usize
        {
            return Err(VcsError::KeyMaterialIncomplete {
                context: "verification key levels".into(),
                expected: height as u64,
                found: vrk
                    .positive
                    .len()
                    .min(vrk.complement.len())
                    .min(vrk.negative.len()) as u64,
            });
        }
        if let Some(upk) = &upk {
            if upk.height() < height {
                return Err(VcsError::KeyMaterialIncomplete {
                    context: "opening key levels".into(),
                    expected: height as u64 + 1,
                    found: upk.height() as u64 + 1,
                });
            }
            if upk.height() > height {
                return Err(VcsError::Domain(format!(
                    "opening key of height {} given for height {}",
                    upk.height(),
                    height
                )));
            }
        }
        Ok(Self {
            params,
            vrk,
            upk,
            config,
        })
    }

    pub fn height(&self) -> u8 {
        self.params.height
    }

    /// Number of entries in a committed vector.
    pub fn size(&self) -> u64 {
        self.params.size
    }

    pub fn params(&self) -> &VcsParams<E> {
        &self.params
    }

    pub fn config(&self) -> &VcsConfig {
        &self.config
    }

    pub fn verification_key(&self) -> &VerificationKey<E> {
        &self.vrk
    }

    /// The dense opening key, if this engine was built with one.
    pub fn opening_key(&self) -> Result<&OpeningKey<E>, VcsError> {
        self.upk
            .as_ref()
            .ok_or_else(|| VcsError::KeyMaterialIncomplete {
                context: "opening key not loaded".into(),
                expected: tree_node_count(self.params.height),
                found: 0,
            })
    }

    pub fn has_opening_key(&self) -> bool {
        self.upk.is_some()
    }
}
