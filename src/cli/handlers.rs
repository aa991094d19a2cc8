//! Command handlers for the Hyperproofs CLI.
//!
//! Each command gets its own function; [`execute`] only dispatches.

use std::path::Path;
use std::time::Instant;

use ark_bls12_381::{Bls12_381, Fr};
use rand::{thread_rng, Rng};
use serde::Serialize;
use tracing::info;

use super::commands::{Commands, KeyArgs};
use super::output::{emit_report, read_json, write_json};
use crate::{
    get_proof_path, load_vector, random_indices, random_vector, save_trapdoors, save_vector,
    AggregationAdapter, Opening, OpeningBundle, OpeningKeySource, TransparentAggregator, Vcs,
    VcsConfig,
};

type Backend = Bls12_381;
type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Execute a CLI command.
pub fn execute(command: Commands) -> CliResult {
    match command {
        Commands::Keygen {
            height,
            keys,
            with_trapdoors,
            skip_opening_key,
        } => keygen(height, &keys, with_trapdoors, skip_opening_key),
        Commands::Info {
            height,
            keys,
            check_paths,
            output,
        } => info_cmd(height, &keys, check_paths, output.as_deref()),
        Commands::Open {
            height,
            keys,
            vector_dir,
            indices,
            output,
        } => open(height, &keys, vector_dir.as_deref(), &indices, &output),
        Commands::Verify { keys, bundle } => verify(&keys, &bundle),
        Commands::Demo {
            height,
            updates,
            txn_limit,
            output,
        } => demo(height, updates, txn_limit, output.as_deref()),
    }
}

fn config(height: u8, keys: &KeyArgs) -> VcsConfig {
    VcsConfig::new(height)
        .with_shards(keys.shards, keys.workers)
        .with_key_dir(&keys.key_dir)
}

fn keygen(height: u8, keys: &KeyArgs, with_trapdoors: bool, skip_opening_key: bool) -> CliResult {
    println!("Generating keys for height {}...", height);
    let mut rng = thread_rng();
    let config = config(height, keys);
    let start = Instant::now();
    let (vcs, trapdoors) = if skip_opening_key {
        Vcs::<Backend>::setup_without_opening_key(&mut rng, config)?
    } else {
        Vcs::<Backend>::setup(&mut rng, config)?
    };
    vcs.save()?;
    if with_trapdoors {
        save_trapdoors(&keys.key_dir, vcs.params(), &trapdoors)?;
    }
    println!(
        "✓ Keys written to {} in {:?}",
        keys.key_dir.display(),
        start.elapsed()
    );
    Ok(())
}

#[derive(Serialize)]
struct InfoReport {
    height: u8,
    size: u64,
    shards: usize,
    verification_key_levels: u8,
    opening_key_loaded: bool,
    paths_checked: usize,
    paths_valid: bool,
}

fn info_cmd(height: u8, keys: &KeyArgs, check_paths: usize, output: Option<&Path>) -> CliResult {
    let config = config(height, keys);
    let vcs = if check_paths > 0 {
        Vcs::<Backend>::load(config)?
    } else {
        Vcs::<Backend>::load_without_opening_key(config)?
    };

    let mut rng = thread_rng();
    let mut paths_valid = true;
    if check_paths > 0 {
        let upk = vcs.opening_key()?;
        for index in random_indices(&mut rng, height, check_paths) {
            let path = upk.opening_path(index)?;
            paths_valid &= vcs.verify_opening_path(index, &path, &mut rng)?;
        }
    }

    emit_report(
        &InfoReport {
            height: vcs.height(),
            size: vcs.size(),
            shards: keys.shards,
            verification_key_levels: vcs.verification_key().height(),
            opening_key_loaded: vcs.has_opening_key(),
            paths_checked: check_paths,
            paths_valid,
        },
        output,
    )
}

fn open(
    height: u8,
    keys: &KeyArgs,
    vector_dir: Option<&Path>,
    indices: &[u64],
    output: &Path,
) -> CliResult {
    let vcs = Vcs::<Backend>::load(config(height, keys))?;
    let vector: Vec<Fr> = match vector_dir {
        Some(dir) => load_vector(dir)?,
        None => {
            let vector = random_vector(&mut thread_rng(), vcs.size() as usize);
            save_vector(&keys.key_dir, &vector)?;
            println!(
                "Generated a random vector, saved to {}",
                keys.key_dir.display()
            );
            vector
        }
    };

    let start = Instant::now();
    let (digest, tree) = vcs.commit_and_open(&vector)?;
    info!(elapsed = ?start.elapsed(), "vector committed and opened");

    let openings = indices
        .iter()
        .map(|index| {
            Ok(Opening {
                index: *index,
                value: *vector
                    .get(*index as usize)
                    .ok_or_else(|| format!("index {} out of range", index))?,
                proof: get_proof_path(&tree, *index)?,
            })
        })
        .collect::<Result<Vec<_>, Box<dyn std::error::Error>>>()?;

    write_json(output, &OpeningBundle::<Backend>::new(height, digest, openings))?;
    println!(
        "✓ {} openings written to {}",
        indices.len(),
        output.display()
    );
    Ok(())
}

#[derive(Serialize)]
struct VerifyReport {
    height: u8,
    openings: usize,
    valid: bool,
}

fn verify(keys: &KeyArgs, bundle_path: &Path) -> CliResult {
    let bundle: OpeningBundle<Backend> = read_json(bundle_path)?;
    let vcs = Vcs::<Backend>::load_without_opening_key(config(bundle.height, keys))?;
    let valid = bundle.verify(&vcs)?;
    emit_report(
        &VerifyReport {
            height: bundle.height,
            openings: bundle.openings.len(),
            valid,
        },
        None,
    )?;
    if !valid {
        return Err("bundle did not verify".into());
    }
    Ok(())
}

#[derive(Serialize)]
struct DemoReport {
    height: u8,
    updates: usize,
    txn_limit: usize,
    setup_ms: u128,
    open_all_ms: u128,
    bulk_update_ms: u128,
    unique_nodes_updated: usize,
    matches_recommit: bool,
    memoized_valid: bool,
    memoized_unique_nodes: usize,
    aggregate_valid: bool,
    aggregate_rejects_wrong_value: bool,
}

fn demo(height: u8, updates: usize, txn_limit: usize, output: Option<&Path>) -> CliResult {
    let mut rng = thread_rng();
    let config = VcsConfig::new(height).with_txn_limit(txn_limit);

    let start = Instant::now();
    let (vcs, _) = Vcs::<Backend>::setup(&mut rng, config)?;
    let setup_ms = start.elapsed().as_millis();

    let mut vector: Vec<Fr> = random_vector(&mut rng, vcs.size() as usize);
    let start = Instant::now();
    let (mut digest, mut tree) = vcs.commit_and_open(&vector)?;
    let open_all_ms = start.elapsed().as_millis();

    let indices = random_indices(&mut rng, height, updates);
    let deltas: Vec<Fr> = random_vector(&mut rng, updates);
    let start = Instant::now();
    let unique_nodes_updated = vcs.update_proof_tree_bulk(&mut tree, &indices, &deltas)?;
    vcs.update_digest_batch(&mut digest, &indices, &deltas)?;
    let bulk_update_ms = start.elapsed().as_millis();
    for (index, delta) in indices.iter().zip(&deltas) {
        vector[*index as usize] += delta;
    }
    let (recommitted, rebuilt) = vcs.commit_and_open(&vector)?;
    let matches_recommit = recommitted == digest && rebuilt == tree;

    let claimed: Vec<u64> = (0..txn_limit)
        .map(|_| rng.gen_range(0..vcs.size()))
        .collect();
    let values: Vec<Fr> = claimed.iter().map(|i| vector[*i as usize]).collect();
    let proofs = claimed
        .iter()
        .map(|i| get_proof_path(&tree, *i))
        .collect::<Result<Vec<_>, _>>()?;
    let memoized = vcs.verify_memoized(&digest, &claimed, &values, &proofs)?;

    let adapter = AggregationAdapter::new(
        txn_limit,
        vcs.params().clone(),
        vcs.verification_key().clone(),
        TransparentAggregator,
        *b"hyperproofs demo aggregation key",
    )?;
    let aggregate = adapter.agg_prove(&claimed, &proofs)?;
    let aggregate_valid = adapter.agg_verify(&aggregate, &digest, &claimed, &values)?;
    let mut wrong = values.clone();
    wrong[0] += Fr::from(1u64);
    let aggregate_rejects_wrong_value = !adapter.agg_verify(&aggregate, &digest, &claimed, &wrong)?;

    emit_report(
        &DemoReport {
            height,
            updates,
            txn_limit,
            setup_ms,
            open_all_ms,
            bulk_update_ms,
            unique_nodes_updated,
            matches_recommit,
            memoized_valid: memoized.valid,
            memoized_unique_nodes: memoized.unique_nodes,
            aggregate_valid,
            aggregate_rejects_wrong_value,
        },
        output,
    )
}
