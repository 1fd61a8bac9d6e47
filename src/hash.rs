use rand::Rng;

/// ASCII letters and digits.
pub const DEFAULT_SALT_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// One randomly salted hash function, live for a single build attempt.
///
/// The salt grows on demand so that it always covers the longest key hashed
/// so far. Growth only appends, so hashes computed earlier in the attempt stay
/// valid.
#[derive(Debug, Clone, Default)]
pub struct SaltedHash {
    salt: Vec<u8>,
}

impl SaltedHash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash `key` into `[0, n)`, extending the salt from `alphabet` first if
    /// the key is longer than the current salt.
    #[inline]
    pub fn hash<R: Rng + ?Sized>(
        &mut self,
        key: &[u8],
        n: usize,
        alphabet: &[u8],
        rng: &mut R,
    ) -> usize {
        while self.salt.len() < key.len() {
            self.salt.push(alphabet[rng.gen_range(0..alphabet.len())]);
        }
        salted_sum(&self.salt, key, n)
    }

    pub fn into_salt(self) -> Vec<u8> {
        self.salt
    }
}

/// Hash against a frozen salt. `None` when the key is longer than the salt,
/// which no trained key can be.
#[inline]
pub fn frozen_hash(salt: &[u8], key: &[u8], n: usize) -> Option<usize> {
    (key.len() <= salt.len()).then(|| salted_sum(salt, key, n))
}

/// sum(salt[i] * key[i]) mod n, reduced per step.
#[inline]
fn salted_sum(salt: &[u8], key: &[u8], n: usize) -> usize {
    let n = n.max(1) as u64;
    let mut acc = 0u64;
    for (&s, &k) in salt.iter().zip(key) {
        acc = (acc + u64::from(s) * u64::from(k)) % n;
    }
    acc as usize
}
