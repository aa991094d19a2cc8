/// Heights must satisfy `1 <= height < MAX_HEIGHT`.
pub const MAX_HEIGHT: u8 = 32;
/// Upper bound on `height * txn_limit` after padding to a power of two.
pub const MAX_AGG_SIZE: usize = 1 << 19;
/// Number of shard files the opening key is split into.
pub const DEFAULT_SHARDS: usize = 16;
/// Maximum number of key-generation workers running at once.
pub const DEFAULT_WORKERS: usize = 16;
/// Default number of openings aggregated into one proof.
pub const DEFAULT_TXN_LIMIT: usize = 1 << 10;

pub const TRAPDOOR_FILE: &str = "trapdoors.data";
pub const VRK_FILE: &str = "vrk.data";
pub const VECTOR_FILE: &str = "vector.data";

/// Shard file name for the opening key.
pub fn upk_shard_file(shard: usize) -> String {
    format!("upk-{:02}.data", shard)
}
