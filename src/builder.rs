use crate::graph::{AttemptFailure, Graph};
use crate::hash::{DEFAULT_SALT_ALPHABET, SaltedHash};
use crate::mphf::{BuildStats, PerfectHash};
use crate::util::next_prime;
use ahash::RandomState;
use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

/// How table sizes are rounded after each growth step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableSizing {
    /// Use the computed size as is.
    #[default]
    Exact,
    /// Round every size (the initial one included) up to the next prime.
    Prime,
}

impl TableSizing {
    /// Round `n` per policy; `None` once the result would pass `ceiling`.
    #[inline]
    fn fit(self, n: usize, ceiling: usize) -> Option<usize> {
        if n > ceiling {
            return None;
        }
        match self {
            TableSizing::Exact => Some(n),
            TableSizing::Prime => next_prime(n).filter(|&p| p <= ceiling),
        }
    }
}

/// Build parameters.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Initial table size is `round(keys * growth_factor) + 1`. Must be >= 1.0.
    pub growth_factor: f64,
    /// After a failed batch the size becomes `max(n + 1, ceil(n * growth_ratio))`.
    pub growth_ratio: f64,
    pub sizing: TableSizing,
    /// Attempts at one size before growing it.
    pub trials_per_size: u32,
    /// Largest table size worth trying. `None` means `100 * (keys + 1)`.
    pub size_ceiling: Option<usize>,
    /// Symbols salts are drawn from. Printable ASCII only.
    pub salt_alphabet: Vec<u8>,
    /// Seed for [`Builder::build`]; `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Run the attempts of a batch on the rayon pool. Needs the `parallel`
    /// feature; ignored otherwise. Results do not depend on this flag.
    pub parallel: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            growth_factor: 2.0,
            growth_ratio: 1.05,
            sizing: TableSizing::Exact,
            trials_per_size: 5,
            size_ceiling: None,
            salt_alphabet: DEFAULT_SALT_ALPHABET.to_vec(),
            seed: None,
            parallel: false,
        }
    }
}

impl BuildConfig {
    pub fn validate(&self) -> Result<(), MphError> {
        if !self.growth_factor.is_finite() || self.growth_factor < 1.0 {
            return Err(MphError::InvalidConfig(
                "growth_factor must be finite and >= 1.0",
            ));
        }
        if !self.growth_ratio.is_finite() || self.growth_ratio < 1.0 {
            return Err(MphError::InvalidConfig(
                "growth_ratio must be finite and >= 1.0",
            ));
        }
        if self.trials_per_size == 0 {
            return Err(MphError::InvalidConfig(
                "trials_per_size must be at least 1",
            ));
        }
        if self.salt_alphabet.is_empty() {
            return Err(MphError::InvalidConfig("salt_alphabet is empty"));
        }
        if !self.salt_alphabet.iter().all(u8::is_ascii_graphic) {
            return Err(MphError::InvalidConfig(
                "salt_alphabet must be printable ASCII",
            ));
        }
        Ok(())
    }

    /// Unrounded first size, `round(keys * growth_factor) + 1`.
    fn initial_size(&self, key_count: usize) -> usize {
        let n = (key_count as f64 * self.growth_factor).round() as usize;
        n.saturating_add(1)
    }

    /// Unrounded size after a failed batch at `n`.
    fn next_size(&self, n: usize) -> usize {
        let grown = (n as f64 * self.growth_ratio).ceil() as usize;
        grown.max(n.saturating_add(1))
    }

    fn ceiling(&self, key_count: usize) -> usize {
        self.size_ceiling
            .unwrap_or_else(|| key_count.saturating_add(1).saturating_mul(100))
    }
}

#[derive(Debug, Error)]
pub enum MphError {
    #[error("duplicate key {key:?} at positions {first} and {second}")]
    DuplicateKey {
        key: String,
        first: usize,
        second: usize,
    },
    #[error("empty key at position {index}")]
    EmptyKey { index: usize },
    #[error("invalid build configuration: {0}")]
    InvalidConfig(&'static str),
    #[error(
        "no acyclic graph for {keys} keys: table size {size} exceeds ceiling {ceiling} after {trials} trials"
    )]
    Infeasible {
        keys: usize,
        size: usize,
        ceiling: usize,
        trials: u64,
    },
    #[error("verification failed: key {key:?} should map to slot {expected}, got {actual:?}")]
    Verification {
        key: String,
        expected: usize,
        actual: Option<usize>,
    },
    #[error("table is malformed")]
    Malformed,
    #[cfg(feature = "serde")]
    #[error("serialization error: {0}")]
    Serde(#[from] Box<bincode::ErrorKind>),
}

pub struct Builder {
    cfg: BuildConfig,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            cfg: BuildConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: BuildConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Build from ordered `(key, value)` pairs. Key `i` gets slot `i`.
    /// Randomness comes from `cfg.seed`, or from the OS when unset.
    pub fn build<K, V, I>(self, entries: I) -> Result<PerfectHash<V>, MphError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut rng = match self.cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.build_with_rng(entries, &mut rng)
    }

    /// Build from keys alone; each key's value is its position.
    pub fn build_keys<K, I>(self, keys: I) -> Result<PerfectHash<usize>, MphError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = K>,
    {
        self.build(keys.into_iter().enumerate().map(|(i, k)| (k, i)))
    }

    /// Like [`Builder::build`], drawing all randomness from `rng`.
    /// `cfg.seed` is ignored.
    pub fn build_with_rng<K, V, I, R>(
        self,
        entries: I,
        rng: &mut R,
    ) -> Result<PerfectHash<V>, MphError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
        R: RngCore + ?Sized,
    {
        self.cfg.validate()?;

        let (keys, values): (Vec<String>, Vec<V>) = entries
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_owned(), v))
            .unzip();
        check_keys(&keys)?;

        info!("Building perfect hash for {} keys", keys.len());
        let (n, resolved, stats) = search(&keys, &self.cfg, rng)?;

        let mph = PerfectHash {
            n,
            salt1: resolved.salt1,
            salt2: resolved.salt2,
            g: resolved.g,
            keys,
            values,
            stats,
        };
        if let Err(e) = mph.verify() {
            error!("Resolved table failed verification: {e}");
            return Err(e);
        }

        info!(
            "Acyclic graph found after {} trials: N = {}, {} size increases",
            stats.trials, n, stats.size_increases
        );
        Ok(mph)
    }
}

/// Reject empty and duplicate keys, comparing exact strings.
fn check_keys(keys: &[String]) -> Result<(), MphError> {
    let mut seen: HashMap<&str, usize, RandomState> =
        HashMap::with_capacity_and_hasher(keys.len(), RandomState::new());
    for (index, key) in keys.iter().enumerate() {
        if key.is_empty() {
            return Err(MphError::EmptyKey { index });
        }
        match seen.entry(key.as_str()) {
            Entry::Occupied(first) => {
                return Err(MphError::DuplicateKey {
                    key: key.clone(),
                    first: *first.get(),
                    second: index,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(index);
            }
        }
    }
    Ok(())
}

/// Salts and vertex values from one successful attempt.
struct Resolved {
    salt1: Vec<u8>,
    salt2: Vec<u8>,
    g: Vec<usize>,
}

/// Batches of attempts at growing sizes until one resolves or the ceiling
/// is passed.
fn search<R: RngCore + ?Sized>(
    keys: &[String],
    cfg: &BuildConfig,
    rng: &mut R,
) -> Result<(usize, Resolved, BuildStats), MphError> {
    let ceiling = cfg.ceiling(keys.len());
    let mut candidate = cfg.initial_size(keys.len());
    let mut first_size = None;
    let mut trials = 0u64;
    let mut size_increases = 0u32;

    loop {
        let Some(n) = cfg.sizing.fit(candidate, ceiling) else {
            warn!(
                "Giving up on {} keys: size {} exceeds ceiling {} after {} trials",
                keys.len(),
                candidate,
                ceiling,
                trials
            );
            return Err(MphError::Infeasible {
                keys: keys.len(),
                size: candidate,
                ceiling,
                trials,
            });
        };
        let initial_size = *first_size.get_or_insert(n);

        debug!("Generating graphs with N = {}", n);
        let (tried, found) = run_batch(keys, n, cfg, rng);
        trials += tried;
        if let Some(resolved) = found {
            let stats = BuildStats {
                trials,
                size_increases,
                initial_size,
                final_size: n,
            };
            return Ok((n, resolved, stats));
        }

        candidate = cfg.next_size(n);
        size_increases += 1;
    }
}

/// Up to `trials_per_size` attempts at size `n`. Returns how many attempts a
/// sequential run makes (the successful one included) and the first success.
///
/// Every attempt seed is drawn from `rng` in order, so the parallel path picks
/// the same attempt the sequential path would.
fn run_batch<R: RngCore + ?Sized>(
    keys: &[String],
    n: usize,
    cfg: &BuildConfig,
    rng: &mut R,
) -> (u64, Option<Resolved>) {
    #[cfg(feature = "parallel")]
    {
        if cfg.parallel {
            let seeds: Vec<u64> = (0..cfg.trials_per_size)
                .map(|_| rng.next_u64())
                .collect();
            return run_batch_parallel(keys, n, &cfg.salt_alphabet, &seeds);
        }
    }

    for t in 0..cfg.trials_per_size {
        let seed = rng.next_u64();
        match attempt(keys, n, &cfg.salt_alphabet, seed) {
            Ok(resolved) => return (u64::from(t) + 1, Some(resolved)),
            Err(why) => trace!("Attempt at N = {} failed: {}", n, why),
        }
    }
    (u64::from(cfg.trials_per_size), None)
}

#[cfg(feature = "parallel")]
fn run_batch_parallel(
    keys: &[String],
    n: usize,
    alphabet: &[u8],
    seeds: &[u64],
) -> (u64, Option<Resolved>) {
    use rayon::prelude::*;

    let found = seeds
        .par_iter()
        .enumerate()
        .map(|(t, &seed)| {
            let res = attempt(keys, n, alphabet, seed);
            if let Err(why) = &res {
                trace!("Attempt at N = {} failed: {}", n, why);
            }
            (t, res)
        })
        .find_first(|(_, res)| res.is_ok());

    match found {
        Some((t, Ok(resolved))) => (t as u64 + 1, Some(resolved)),
        _ => (seeds.len() as u64, None),
    }
}

/// One build attempt: fresh salts, fresh graph, then vertex assignment.
fn attempt(
    keys: &[String],
    n: usize,
    alphabet: &[u8],
    seed: u64,
) -> Result<Resolved, AttemptFailure> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut f1 = SaltedHash::new();
    let mut f2 = SaltedHash::new();
    let mut graph = Graph::new(n);

    for (index, key) in keys.iter().enumerate() {
        let key = key.as_bytes();
        let v1 = f1.hash(key, n, alphabet, &mut rng);
        let v2 = f2.hash(key, n, alphabet, &mut rng);
        if v1 == v2 {
            return Err(AttemptFailure::SelfLoop {
                key: index,
                vertex: v1,
            });
        }
        graph.connect(v1, v2, index);
    }

    let g = graph.assign_vertex_values()?;
    Ok(Resolved {
        salt1: f1.into_salt(),
        salt2: f2.into_salt(),
        g,
    })
}
