use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use salted_mphf::{BuildConfig, Builder, MphError};
use std::collections::HashSet;
use std::time::Instant;

const N_KEYS: usize = 100_000;
const GEN_SEED: u64 = 42;

fn main() -> Result<(), MphError> {
    println!("--- salted_mphf bulk build ---");
    println!("n = {N_KEYS}");

    // 1) Generate unique keys
    let t0 = Instant::now();
    let keys = gen_unique_keys(N_KEYS, GEN_SEED);
    let gen_s = t0.elapsed().as_secs_f64();
    println!(
        "gen:    {:>8.3} s   ({:.1} M keys/s)",
        gen_s,
        N_KEYS as f64 / gen_s / 1e6
    );

    // 2) Build
    let cfg = BuildConfig {
        seed: Some(GEN_SEED),
        parallel: true,
        ..Default::default()
    };
    let t1 = Instant::now();
    let mph = Builder::new().with_config(cfg).build_keys(&keys)?;
    let build_s = t1.elapsed().as_secs_f64();
    let stats = mph.stats();
    println!(
        "build:  {:>8.3} s   (N = {}, {} trials, {} size increases, g as {} bits)",
        build_s,
        mph.size(),
        stats.trials,
        stats.size_increases,
        mph.g_width().bits()
    );

    // 3) Lookup all keys, then as many misses
    let t2 = Instant::now();
    let mut acc: usize = 0;
    for k in &keys {
        acc ^= mph.index(k).unwrap_or(usize::MAX);
    }
    let misses = keys
        .iter()
        .filter(|k| mph.get(&format!("{k}#")).is_none())
        .count();
    let lookup_s = t2.elapsed().as_secs_f64();
    println!(
        "lookup: {:>8.3} s   ({:.1} M lookups/s)   (acc={acc}, misses={misses})",
        lookup_s,
        2.0 * N_KEYS as f64 / lookup_s / 1e6
    );

    println!("----------------------------------------------");
    println!(
        "Total (gen + build + lookup): {:.3} s",
        gen_s + build_s + lookup_s
    );

    Ok(())
}

/// Generate N unique alphanumeric keys of 6..=16 chars, deterministically.
fn gen_unique_keys(n: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut set = HashSet::with_capacity(n * 2);
    let mut keys = Vec::with_capacity(n);
    while keys.len() < n {
        let len = rng.gen_range(6..=16);
        let key: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect();
        if set.insert(key.clone()) {
            keys.push(key);
        }
    }
    keys
}
