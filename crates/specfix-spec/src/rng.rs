//! Random source for resolution: PCG32 with BLAKE3 seed derivation.
//!
//! All randomness in resolution flows through a [`SharedRng`] handle so that
//! a resolver can be seeded and a failing run replayed. Seeds for forked
//! streams are derived by hashing the parent seed together with a label.

use std::cell::RefCell;
use std::rc::Rc;

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg32;

/// Environment variable consulted for the default resolver's seed.
pub const SEED_ENV: &str = "SPECFIX_SEED";

/// A cloneable handle to one shared generator.
pub type SharedRng = Rc<RefCell<Pcg32>>;

/// Creates a PCG32 generator from a 64-bit seed.
pub fn create_rng(seed: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed)
}

/// Creates a shared generator from a 64-bit seed.
pub fn create_shared_rng(seed: u64) -> SharedRng {
    Rc::new(RefCell::new(create_rng(seed)))
}

/// Draws a uniform real in `[low, high]`.
///
/// Any pair of finite bounds is accepted, including pairs whose distance
/// overflows `f64` (`-1e308` to `1e308`); those interpolate between the bounds
/// instead of scaling the distance.
///
/// # Arguments
///
/// * `rng` - Generator to draw from
/// * `low` - Lower bound, finite
/// * `high` - Upper bound, finite and not below `low`
pub fn uniform_real<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    if (high - low).is_finite() {
        return rng.gen_range(low..=high);
    }
    let t: f64 = rng.gen();
    (low * (1.0 - t) + high * t).clamp(low, high)
}

/// Derives a child seed from a parent seed and a string label.
///
/// ```text
/// child_seed = truncate_u64(BLAKE3(parent_seed || label))
/// ```
pub fn derive_seed(parent: u64, label: &str) -> u64 {
    let mut input = Vec::with_capacity(8 + label.len());
    input.extend_from_slice(&parent.to_le_bytes());
    input.extend_from_slice(label.as_bytes());

    let hash = blake3::hash(&input);

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

/// Turns a textual seed into a numeric one.
///
/// Decimal integers are used as-is; anything else (a test name, a ticket id)
/// is hashed so that any string is a valid seed.
pub fn parse_seed(text: &str) -> u64 {
    let text = text.trim();
    match text.parse::<u64>() {
        Ok(seed) => seed,
        Err(_) => {
            let hash = blake3::hash(text.as_bytes());
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&hash.as_bytes()[0..8]);
            u64::from_le_bytes(bytes)
        }
    }
}

/// Seed from [`SEED_ENV`], if set and non-empty.
pub fn seed_from_env() -> Option<u64> {
    std::env::var(SEED_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_seed(&s))
}

/// A fresh seed from the operating system.
pub fn entropy_seed() -> u64 {
    rand::rngs::OsRng.next_u64()
}
