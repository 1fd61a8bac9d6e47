/// Fixed-size bit set, used for per-attempt visited flags.
#[derive(Debug)]
pub struct BitSet {
    bits: Vec<u64>,
    n: usize,
}

impl BitSet {
    pub fn new(n: usize) -> Self {
        let words = n.div_ceil(64);
        Self {
            bits: vec![0; words],
            n,
        }
    }

    #[inline]
    pub fn test(&self, idx: usize) -> bool {
        debug_assert!(idx < self.n);
        let (w, b) = (idx / 64, idx % 64);
        (self.bits[w] >> b) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, idx: usize) {
        debug_assert!(idx < self.n);
        let (w, b) = (idx / 64, idx % 64);
        self.bits[w] |= 1u64 << b;
    }
}

/// Trial division; table sizes stay small enough for this to be cheap.
pub fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut d = 3usize;
    while d.saturating_mul(d) <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Smallest prime `>= n`, or `None` if there is none below `usize::MAX`.
pub fn next_prime(mut n: usize) -> Option<usize> {
    while !is_prime(n) {
        n = n.checked_add(1)?;
    }
    Some(n)
}
