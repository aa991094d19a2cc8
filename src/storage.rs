//! Flat binary persistence for key material and vectors.
//!
//! Elements are written with their uncompressed `ark-serialize` encoding, one
//! after the other, with no per-element framing:
//!
//! | file | contents |
//! |---|---|
//! | `trapdoors.data` | `u64` LE height, `G`, `H`, then per level `s`, `1 - s`, `s - 1` |
//! | `vrk.data` | `u64` LE height, `G`, `H`, then per level `H^s`, `H^(1-s)`, `H^(s-1)` |
//! | `upk-XX.data` | `u64` LE first node, `u64` LE node count, then opening-key nodes in level order |
//! | `vector.data` | `u64` LE length, then scalars |
//!
//! A key stored for height `L` can be loaded for any height up to `L`: the
//! first levels of a taller tree are exactly the smaller tree. Asking for more
//! than is stored, or reading a truncated file, is
//! [`VcsError::KeyMaterialIncomplete`].

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ark_ec::pairing::Pairing;
use ark_ec::AffineRepr;
use ark_ff::Zero;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use tracing::{debug, info, instrument};

use crate::pool::{run_sharded, shard_ranges};
use crate::config::validate_height;
use crate::tree::tree_node_count;
use crate::{
    upk_shard_file, OpeningKey, Trapdoors, Vcs, VcsConfig, VcsError, VcsParams, VerificationKey,
    TRAPDOOR_FILE, VECTOR_FILE, VRK_FILE,
};

impl<E: Pairing> Vcs<E> {
    /// Writes the verification key and, if present, the opening key to
    /// `config.key_dir`.
    #[instrument(level = "info", skip_all, fields(height = self.params.height))]
    pub fn save(&self) -> Result<(), VcsError> {
        let dir = self.config.key_dir()?;
        fs::create_dir_all(dir)?;
        save_verification_key(dir, &self.params, &self.vrk)?;
        if let Some(upk) = &self.upk {
            save_opening_key(dir, upk, self.config.shards, self.config.workers)?;
        }
        Ok(())
    }

    /// Loads an engine of height `config.height` from `config.key_dir`.
    #[instrument(level = "info", skip_all, fields(height = config.height))]
    pub fn load(config: VcsConfig) -> Result<Self, VcsError> {
        Self::load_keys(config, true)
    }

    /// Like [`Vcs::load`] but skips the opening key.
    pub fn load_without_opening_key(config: VcsConfig) -> Result<Self, VcsError> {
        Self::load_keys(config, false)
    }

    fn load_keys(config: VcsConfig, with_opening_key: bool) -> Result<Self, VcsError> {
        config.validate()?;
        let dir = config.key_dir()?.clone();
        let (params, vrk) = load_verification_key::<E>(&dir, config.height)?;
        let upk = if with_opening_key {
            Some(load_opening_key::<E>(
                &dir,
                config.height,
                config.shards,
                config.workers,
            )?)
        } else {
            None
        };
        Self::from_parts(config, params, vrk, upk)
    }
}

/// Writes the trapdoors together with the generators.
pub fn save_trapdoors<E: Pairing>(
    dir: &Path,
    params: &VcsParams<E>,
    trapdoors: &Trapdoors<E>,
) -> Result<(), VcsError> {
    let mut writer = create(dir, TRAPDOOR_FILE)?;
    write_header(&mut writer, trapdoors.height(), params)?;
    for level in 0..trapdoors.height() as usize {
        trapdoors.s[level].serialize_uncompressed(&mut writer)?;
        trapdoors.one_minus_s[level].serialize_uncompressed(&mut writer)?;
        trapdoors.s_minus_one[level].serialize_uncompressed(&mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads the first `height` trapdoors.
pub fn load_trapdoors<E: Pairing>(
    dir: &Path,
    height: u8,
) -> Result<(VcsParams<E>, Trapdoors<E>), VcsError> {
    let mut reader = open(dir, TRAPDOOR_FILE)?;
    let params = read_header::<E, _>(&mut reader, height, "trapdoor levels")?;
    let mut s = Vec::with_capacity(height as usize);
    let mut one_minus_s = Vec::with_capacity(height as usize);
    let mut s_minus_one = Vec::with_capacity(height as usize);
    let (size, _, _) = element_sizes::<E>();
    for level in 0..height as u64 {
        let context = "trapdoor levels";
        s.push(read_element(&mut reader, size, context, height as u64, level)?);
        one_minus_s.push(read_element(&mut reader, size, context, height as u64, level)?);
        s_minus_one.push(read_element(&mut reader, size, context, height as u64, level)?);
    }
    Ok((
        params,
        Trapdoors {
            s,
            one_minus_s,
            s_minus_one,
        },
    ))
}

pub fn save_verification_key<E: Pairing>(
    dir: &Path,
    params: &VcsParams<E>,
    vrk: &VerificationKey<E>,
) -> Result<(), VcsError> {
    let mut writer = create(dir, VRK_FILE)?;
    write_header(&mut writer, vrk.height(), params)?;
    for level in 0..vrk.height() as usize {
        vrk.positive[level].serialize_uncompressed(&mut writer)?;
        vrk.complement[level].serialize_uncompressed(&mut writer)?;
        vrk.negative[level].serialize_uncompressed(&mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads the parameters and the first `height` levels of the verification key.
pub fn load_verification_key<E: Pairing>(
    dir: &Path,
    height: u8,
) -> Result<(VcsParams<E>, VerificationKey<E>), VcsError> {
    let mut reader = open(dir, VRK_FILE)?;
    let context = "verification key levels";
    let params = read_header::<E, _>(&mut reader, height, context)?;
    let mut vrk = VerificationKey {
        positive: Vec::with_capacity(height as usize),
        complement: Vec::with_capacity(height as usize),
        negative: Vec::with_capacity(height as usize),
    };
    let (_, _, size) = element_sizes::<E>();
    for level in 0..height as u64 {
        vrk.positive.push(read_element(&mut reader, size, context, height as u64, level)?);
        vrk.complement.push(read_element(&mut reader, size, context, height as u64, level)?);
        vrk.negative.push(read_element(&mut reader, size, context, height as u64, level)?);
    }
    Ok((params, vrk))
}

/// Writes the opening key in level order across `shards` files, in parallel.
#[instrument(level = "info", skip_all, fields(shards, workers))]
pub fn save_opening_key<E: Pairing>(
    dir: &Path,
    upk: &OpeningKey<E>,
    shards: usize,
    workers: usize,
) -> Result<(), VcsError> {
    let nodes: Vec<&E::G1Affine> = upk.iter_level_order().collect();
    let total = nodes.len() as u64;
    let ranges = shard_ranges(total, shards);
    // Shards that would be empty still get a file so every name exists.
    for shard in ranges.len()..shards {
        let mut writer = create(dir, &upk_shard_file(shard))?;
        writer.write_all(&total.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?;
        writer.flush()?;
    }

    run_sharded(total, shards, workers, |shard, range| {
        let mut writer = create(dir, &upk_shard_file(shard))?;
        writer.write_all(&range.start.to_le_bytes())?;
        writer.write_all(&(range.end - range.start).to_le_bytes())?;
        for node in &nodes[range.start as usize..range.end as usize] {
            node.serialize_uncompressed(&mut writer)?;
        }
        writer.flush()?;
        debug!(shard, count = range.end - range.start, "opening key shard written");
        Ok(())
    })?;
    info!(nodes = total, "opening key saved");
    Ok(())
}

/// Reads the opening key for `height` from its shard files, in parallel.
///
/// Only the level-order prefix needed for `height` is read.
#[instrument(level = "info", skip_all, fields(height, shards, workers))]
pub fn load_opening_key<E: Pairing>(
    dir: &Path,
    height: u8,
    shards: usize,
    workers: usize,
) -> Result<OpeningKey<E>, VcsError> {
    validate_height(height)?;
    let needed = tree_node_count(height);
    let shard_count = shards as u64;
    let (_, size, _) = element_sizes::<E>();

    let chunks = run_sharded(shard_count, shards, workers, |_, files| {
        let mut out = Vec::new();
        for shard in files {
            let mut reader = open(dir, &upk_shard_file(shard as usize))?;
            let start = read_u64(&mut reader, "opening key shard header")?;
            let count = read_u64(&mut reader, "opening key shard header")?;
            if start >= needed {
                continue;
            }
            let take = count.min(needed - start);
            let mut nodes = Vec::with_capacity(take as usize);
            for i in 0..take {
                nodes.push(read_element::<E::G1Affine, _>(
                    &mut reader,
                    size,
                    "opening key shard",
                    take,
                    i,
                )?);
            }
            out.push((start, nodes));
        }
        Ok(out)
    })?;

    let mut level_order = Vec::with_capacity(needed as usize);
    for (start, nodes) in chunks.into_iter().flatten() {
        if start != level_order.len() as u64 {
            break;
        }
        level_order.extend(nodes);
    }
    if (level_order.len() as u64) < needed {
        return Err(VcsError::KeyMaterialIncomplete {
            context: "opening key nodes".into(),
            expected: needed,
            found: level_order.len() as u64,
        });
    }
    level_order.truncate(needed as usize);
    OpeningKey::from_level_order(height, level_order)
}

pub fn save_vector<F: CanonicalSerialize>(dir: &Path, vector: &[F]) -> Result<(), VcsError> {
    let mut writer = create(dir, VECTOR_FILE)?;
    writer.write_all(&(vector.len() as u64).to_le_bytes())?;
    for value in vector {
        value.serialize_uncompressed(&mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_vector<F: CanonicalDeserialize + CanonicalSerialize + Default>(
    dir: &Path,
) -> Result<Vec<F>, VcsError> {
    let mut reader = open(dir, VECTOR_FILE)?;
    let len = read_u64(&mut reader, "vector length")?;
    let size = F::default().uncompressed_size();
    (0..len)
        .map(|i| read_element(&mut reader, size, "vector entries", len, i))
        .collect()
}

fn create(dir: &Path, name: &str) -> Result<BufWriter<File>, VcsError> {
    Ok(BufWriter::new(File::create(dir.join(name))?))
}

fn open(dir: &Path, name: &str) -> Result<BufReader<File>, VcsError> {
    Ok(BufReader::new(File::open(dir.join(name))?))
}

fn write_header<E: Pairing, W: Write>(
    writer: &mut W,
    height: u8,
    params: &VcsParams<E>,
) -> Result<(), VcsError> {
    writer.write_all(&(height as u64).to_le_bytes())?;
    params.g.serialize_uncompressed(&mut *writer)?;
    params.h.serialize_uncompressed(&mut *writer)?;
    Ok(())
}

/// Reads the header and checks that at least `height` levels are stored.
fn read_header<E: Pairing, R: Read>(
    reader: &mut R,
    height: u8,
    context: &str,
) -> Result<VcsParams<E>, VcsError> {
    let stored = read_u64(reader, context)?;
    if stored < height as u64 {
        return Err(VcsError::KeyMaterialIncomplete {
            context: context.into(),
            expected: height as u64,
            found: stored,
        });
    }
    let (_, g1_size, g2_size) = element_sizes::<E>();
    let g = read_element(reader, g1_size, context, 1, 0)?;
    let h = read_element(reader, g2_size, context, 1, 0)?;
    VcsParams::new(height, g, h)
}

fn read_u64<R: Read>(reader: &mut R, context: &str) -> Result<u64, VcsError> {
    let mut bytes = [0u8; 8];
    reader
        .read_exact(&mut bytes)
        .map_err(|err| short_read(err, context, 8, 0))?;
    Ok(u64::from_le_bytes(bytes))
}

/// Reads element `position` of `expected`, each `size` bytes long. A short
/// file is [`VcsError::KeyMaterialIncomplete`]; bytes that do not decode are
/// [`VcsError::Serialization`].
fn read_element<T: CanonicalDeserialize, R: Read>(
    reader: &mut R,
    size: usize,
    context: &str,
    expected: u64,
    position: u64,
) -> Result<T, VcsError> {
    let mut bytes = vec![0u8; size];
    reader
        .read_exact(&mut bytes)
        .map_err(|err| short_read(err, context, expected, position))?;
    Ok(T::deserialize_uncompressed(bytes.as_slice())?)
}

fn short_read(err: std::io::Error, context: &str, expected: u64, found: u64) -> VcsError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        VcsError::KeyMaterialIncomplete {
            context: context.into(),
            expected,
            found,
        }
    } else {
        err.into()
    }
}

/// Uncompressed encoding sizes of a scalar, a G1 and a G2 element.
fn element_sizes<E: Pairing>() -> (usize, usize, usize) {
    (
        E::ScalarField::zero().uncompressed_size(),
        E::G1Affine::generator().uncompressed_size(),
        E::G2Affine::generator().uncompressed_size(),
    )
}
