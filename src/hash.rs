//! Deterministic hashing utilities.
//!
//! Disguised constraints carry a fingerprint so that reports from different runs
//! (or different machines) can be compared and deduplicated. `DefaultHasher` uses a
//! random seed per process, so it cannot be used for that; this module provides a
//! fixed FNV-1a hasher instead. It also feeds the entropy mixing in [`crate::rng`].
//!
//! # Usage
//!
//! ```
//! use opaque_pell::hash::{DeterministicHasher, fnv1a_hash};
//! use std::hash::{Hash, Hasher};
//!
//! let mut hasher = DeterministicHasher::new();
//! (49i64, [3i64, -2, 1, 7]).hash(&mut hasher);
//! let hash1 = hasher.finish();
//!
//! let hash2 = fnv1a_hash(&(49i64, [3i64, -2, 1, 7]));
//! assert_eq!(hash1, hash2);
//! ```
//!
//! Note: FNV-1a is NOT cryptographically secure.

use std::hash::{Hash, Hasher};

/// FNV-1a 64-bit offset basis constant.
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime constant.
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// A deterministic hasher using the FNV-1a algorithm.
///
/// Produces consistent results across processes, platforms, and runs.
#[derive(Debug, Clone)]
pub struct DeterministicHasher {
    state: u64,
}

impl DeterministicHasher {
    /// Creates a new `DeterministicHasher` with the standard FNV-1a offset basis.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: FNV_OFFSET_BASIS,
        }
    }
}

impl Default for DeterministicHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for DeterministicHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.state
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }
}

/// Computes a deterministic FNV-1a hash of the given value.
///
/// ```
/// use opaque_pell::hash::fnv1a_hash;
///
/// assert_eq!(fnv1a_hash(&42u32), fnv1a_hash(&42u32));
/// assert_ne!(fnv1a_hash(&42u32), fnv1a_hash(&43u32));
/// ```
#[inline]
pub fn fnv1a_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DeterministicHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
