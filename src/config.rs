//! Explicit configuration for setup, key loading and aggregation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{VcsError, DEFAULT_SHARDS, DEFAULT_TXN_LIMIT, DEFAULT_WORKERS, MAX_HEIGHT};

/// Parameters that used to live in process-wide globals.
///
/// One value is threaded through key generation, persistence and the
/// aggregation adapter so two instances in the same process never interfere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsConfig {
    /// Tree height `L`; the committed vector has `2^L` entries.
    pub height: u8,
    /// Number of openings folded into one aggregate proof.
    pub txn_limit: usize,
    /// Number of files the opening key is split into on disk.
    pub shards: usize,
    /// Maximum number of shard workers running concurrently.
    pub workers: usize,
    /// Directory holding persisted key material, if any.
    pub key_dir: Option<PathBuf>,
}

impl VcsConfig {
    pub fn new(height: u8) -> Self {
        Self {
            height,
            txn_limit: DEFAULT_TXN_LIMIT,
            shards: DEFAULT_SHARDS,
            workers: DEFAULT_WORKERS,
            key_dir: None,
        }
    }

    pub fn with_height(mut self, height: u8) -> Self {
        self.height = height;
        self
    }

    pub fn with_txn_limit(mut self, txn_limit: usize) -> Self {
        self.txn_limit = txn_limit;
        self
    }

    pub fn with_shards(mut self, shards: usize, workers: usize) -> Self {
        self.shards = shards;
        self.workers = workers;
        self
    }

    pub fn with_key_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.key_dir = Some(dir.into());
        self
    }

    /// Rejects heights outside `1..MAX_HEIGHT` and empty worker pools.
    pub fn validate(&self) -> Result<(), VcsError> {
        validate_height(self.height)?;
        if self.shards == 0 || self.workers == 0 {
            return Err(VcsError::InvalidConfig(
                "shards and workers must be > 0".into(),
            ));
        }
        if self.txn_limit == 0 {
            return Err(VcsError::InvalidConfig("txn_limit must be > 0".into()));
        }
        Ok(())
    }

    pub(crate) fn key_dir(&self) -> Result<&PathBuf, VcsError> {
        self.key_dir
            .as_ref()
            .ok_or_else(|| VcsError::InvalidConfig("key_dir is not set".into()))
    }
}

pub(crate) fn validate_height(height: u8) -> Result<(), VcsError> {
    if height == 0 || height >= MAX_HEIGHT {
        return Err(VcsError::Domain(format!(
            "height {} must be in 1..{}",
            height, MAX_HEIGHT
        )));
    }
    Ok(())
}
