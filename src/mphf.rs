use crate::builder::MphError;
use crate::hash::frozen_hash;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// How a successful build got there.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    /// Attempts made, the successful one included.
    pub trials: u64,
    /// Times the table size was increased.
    pub size_increases: u32,
    pub initial_size: usize,
    /// Same as [`PerfectHash::size`].
    pub final_size: usize,
}

/// Smallest unsigned integer type able to hold every displacement entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IntWidth {
    U8,
    U16,
    U32,
    U64,
}

impl IntWidth {
    pub fn for_max(max: u64) -> Self {
        if max <= u64::from(u8::MAX) {
            IntWidth::U8
        } else if max <= u64::from(u16::MAX) {
            IntWidth::U16
        } else if max <= u64::from(u32::MAX) {
            IntWidth::U32
        } else {
            IntWidth::U64
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            IntWidth::U8 => 8,
            IntWidth::U16 => 16,
            IntWidth::U32 => 32,
            IntWidth::U64 => 64,
        }
    }
}

/// A built, verified minimal perfect hash over string keys.
///
/// Lookup: `slot = (g[h1(key)] + g[h2(key)]) % n`, where `h1`/`h2` are the
/// salted sums under `salt1`/`salt2`. Trained key `i` lands on slot `i`; any
/// other string is rejected by comparing against the stored key.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct PerfectHash<V> {
    pub(crate) n: usize,
    pub(crate) salt1: Vec<u8>,
    pub(crate) salt2: Vec<u8>,
    pub(crate) g: Vec<usize>, // len == n, values in [0..n)
    pub(crate) keys: Vec<String>,
    pub(crate) values: Vec<V>,
    pub(crate) stats: BuildStats,
}

impl<V> PerfectHash<V> {
    /// Table size `N` (number of graph vertices, modulus of both hashes).
    #[inline]
    pub fn size(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn salt1(&self) -> &str {
        // salts are drawn from an ASCII alphabet
        std::str::from_utf8(&self.salt1).unwrap_or_default()
    }

    pub fn salt2(&self) -> &str {
        std::str::from_utf8(&self.salt2).unwrap_or_default()
    }

    /// The displacement table `g[0..N)`.
    pub fn g(&self) -> &[usize] {
        &self.g
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Narrowest integer type an emitted `g` table can use.
    pub fn g_width(&self) -> IntWidth {
        let max = self.g.iter().copied().max().unwrap_or(0);
        IntWidth::for_max(max as u64)
    }

    /// Raw MPHF slot for `key`, without the membership check.
    ///
    /// For trained keys this is the key's index. For anything else it is an
    /// arbitrary slot in `[0, N)`, or `None` if the key is longer than any
    /// trained key.
    #[inline]
    pub fn slot(&self, key: &str) -> Option<usize> {
        let bytes = key.as_bytes();
        let h1 = frozen_hash(&self.salt1, bytes, self.n)?;
        let h2 = frozen_hash(&self.salt2, bytes, self.n)?;
        let g1 = *self.g.get(h1)?;
        let g2 = *self.g.get(h2)?;
        Some((g1 + g2) % self.n)
    }

    /// Index of `key` in the training order, or `None` if it was not trained.
    #[inline]
    pub fn index(&self, key: &str) -> Option<usize> {
        let slot = self.slot(key)?;
        match self.keys.get(slot) {
            Some(stored) if stored == key => Some(slot),
            _ => None,
        }
    }

    /// Value bound to `key`, or `None` if it was not trained.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.index(key).and_then(|i| self.values.get(i))
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.index(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.keys.iter().map(String::as_str).zip(&self.values)
    }

    /// Exhaustively check that every trained key lands on its own slot and
    /// that the table is well formed.
    pub fn verify(&self) -> Result<(), MphError> {
        if self.n == 0
            || self.g.len() != self.n
            || self.keys.len() != self.values.len()
            || self.keys.len() >= self.n
            || self.stats.final_size != self.n
            || self.g.iter().any(|&v| v >= self.n)
        {
            return Err(MphError::Malformed);
        }
        // Both salts cover exactly the longest key and stay printable, so
        // `salt1()`/`salt2()` never come back empty for a loaded table.
        let longest = self.keys.iter().map(String::len).max().unwrap_or(0);
        for salt in [&self.salt1, &self.salt2] {
            if salt.len() != longest || !salt.iter().all(u8::is_ascii_graphic) {
                return Err(MphError::Malformed);
            }
        }
        for (expected, key) in self.keys.iter().enumerate() {
            let actual = self.slot(key);
            if actual != Some(expected) {
                return Err(MphError::Verification {
                    key: key.clone(),
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl<V: Serialize> PerfectHash<V> {
    pub fn to_bytes(&self) -> Result<Vec<u8>, MphError> {
        Ok(bincode::serialize(self)?)
    }
}

#[cfg(feature = "serde")]
impl<V: DeserializeOwned> PerfectHash<V> {
    /// Decode and re-verify; inconsistent tables are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MphError> {
        let mph: Self = bincode::deserialize(bytes)?;
        mph.verify()?;
        Ok(mph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hand-resolved table for ["ab", "ba"] with N = 5. Under salts "Ab" and
    /// "cd" the keys map to edges (4, 3) and (1, 2).
    fn tiny() -> PerfectHash<&'static str> {
        PerfectHash {
            n: 5,
            salt1: b"Ab".to_vec(),
            salt2: b"cd".to_vec(),
            g: vec![0, 0, 1, 0, 0],
            keys: vec!["ab".to_string(), "ba".to_string()],
            values: vec!["first", "second"],
            stats: BuildStats {
                trials: 1,
                size_increases: 0,
                initial_size: 5,
                final_size: 5,
            },
        }
    }

    #[test]
    fn hand_built_table_looks_up() {
        let mph = tiny();
        assert_eq!(frozen_hash(b"Ab", b"ab", 5), Some(4));
        assert_eq!(frozen_hash(b"cd", b"ba", 5), Some(2));
        mph.verify().unwrap();
        assert_eq!(mph.get("ab"), Some(&"first"));
        assert_eq!(mph.get("ba"), Some(&"second"));
        assert_eq!(mph.index("ba"), Some(1));
        assert_eq!(mph.g_width(), IntWidth::U8);
        assert_eq!(mph.salt1(), "Ab");
        let pairs: Vec<_> = mph.iter().collect();
        assert_eq!(pairs, vec![("ab", &"first"), ("ba", &"second")]);
    }

    #[test]
    fn width_selection() {
        assert_eq!(IntWidth::for_max(0), IntWidth::U8);
        assert_eq!(IntWidth::for_max(255), IntWidth::U8);
        assert_eq!(IntWidth::for_max(256), IntWidth::U16);
        assert_eq!(IntWidth::for_max(70_000), IntWidth::U32);
        assert_eq!(IntWidth::for_max(1 << 40), IntWidth::U64);
        assert_eq!(IntWidth::U16.bits(), 16);
    }

    #[test]
    fn malformed_tables_fail_verification() {
        let mut mph = tiny();
        mph.g.pop();
        assert!(matches!(mph.verify(), Err(MphError::Malformed)));

        let mut mph = tiny();
        mph.g[0] = 5;
        assert!(matches!(mph.verify(), Err(MphError::Malformed)));

        let mut mph = tiny();
        mph.values.pop();
        assert!(matches!(mph.verify(), Err(MphError::Malformed)));

        let mut mph = tiny();
        mph.stats.final_size = 7;
        assert!(matches!(mph.verify(), Err(MphError::Malformed)));
    }

    #[test]
    fn salts_must_be_printable_and_sized_to_longest_key() {
        // a trailing byte past the longest key changes no slot, so only the
        // salt checks can catch it
        let mut mph = tiny();
        mph.salt1.push(0xff);
        assert_eq!(mph.slot("ab"), Some(0));
        assert!(matches!(mph.verify(), Err(MphError::Malformed)));
        assert_eq!(mph.salt1(), "");

        let mut mph = tiny();
        mph.salt2.push(b'x');
        assert!(matches!(mph.verify(), Err(MphError::Malformed)));

        let mut mph = tiny();
        mph.salt2[1] = b' ';
        assert!(matches!(mph.verify(), Err(MphError::Malformed)));

        let mut mph = tiny();
        mph.salt1.truncate(1);
        assert!(matches!(mph.verify(), Err(MphError::Malformed)));
    }

    #[test]
    fn swapped_keys_fail_verification() {
        let mut mph = tiny();
        mph.keys.swap(0, 1);
        assert!(matches!(mph.verify(), Err(MphError::Verification { .. })));
    }

    #[test]
    fn lookup_never_panics_on_untrained_keys() {
        let mph = tiny();
        for key in ["", "a", "abc", "zz", "é", "\u{0}\u{0}"] {
            assert_eq!(mph.get(key), None, "{key:?}");
        }
    }
}
