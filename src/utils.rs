use ark_ff::{PrimeField, UniformRand};
use blake3::Hasher;
use rand_core::RngCore;

/// Maps arbitrary bytes into a field element by rejection sampling.
pub(crate) fn hash_to_scalar<F: PrimeField>(bytes: &[u8]) -> F {
    let mut counter = 0u64;
    loop {
        let mut hasher = Hasher::new();
        hasher.update(bytes);
        hasher.update(&counter.to_le_bytes());
        let digest = hasher.finalize();
        if let Some(scalar) = F::from_random_bytes(digest.as_bytes()) {
            return scalar;
        }
        counter = counter.wrapping_add(1);
    }
}

/// Smallest power of two that is at least `n` (and at least 1).
pub fn next_pow2(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Vector of `len` uniformly random scalars.
pub fn random_vector<F: UniformRand, R: RngCore>(rng: &mut R, len: usize) -> Vec<F> {
    (0..len).map(|_| F::rand(rng)).collect()
}

/// Uniformly random leaf indices for a tree of the given height.
pub fn random_indices<R: RngCore>(rng: &mut R, height: u8, count: usize) -> Vec<u64> {
    let mask = (1u64 << height) - 1;
    (0..count).map(|_| rng.next_u64() & mask).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_381::Fr;

    #[test]
    fn powers_of_two() {
        assert_eq!(next_pow2(0), 1);
        assert_eq!(next_pow2(1), 1);
        assert_eq!(next_pow2(24), 32);
        assert_eq!(next_pow2(32), 32);
        assert_eq!(next_pow2(4 * 1024), 4096);
    }

    #[test]
    fn hashing_is_deterministic_and_domain_separated() {
        let a: Fr = hash_to_scalar(b"transcript");
        let b: Fr = hash_to_scalar(b"transcript");
        let c: Fr = hash_to_scalar(b"transcript!");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
