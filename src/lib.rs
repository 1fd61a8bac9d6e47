//! salted_mphf — minimal perfect hashing for static string sets.
//!
//! - Build once on a set of **unique**, non-empty string keys.
//! - Two salted positional hashes map each key to an edge of a random graph;
//!   an acyclic graph yields a displacement table `g` with
//!   `(g[h1(key)] + g[h2(key)]) % N == index(key)`.
//! - If an attempt produces a cycle we retry with fresh salts, growing `N`
//!   after every batch of failures.
//! - Lookups are O(1) and confirm membership against the stored key.

mod builder;
mod graph;
mod hash;
mod mphf;
mod util;

pub use builder::{BuildConfig, Builder, MphError, TableSizing};
pub use hash::DEFAULT_SALT_ALPHABET;
pub use mphf::{BuildStats, IntWidth, PerfectHash};
