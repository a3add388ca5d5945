//! Rank-decoded strings over a sorted alphabet.
//!
//! `ext[d]` counts the strings (within the length bounds) extending a
//! prefix of length `d`, including the prefix itself once it is long
//! enough. Decoding walks the prefix tree: consume one rank unit when the
//! prefix qualifies, then divide by `ext[d + 1]` to pick the next
//! character. Ranks enumerate the set in exact lexicographic order.

use crate::error::{Result, SdvgError};
use crate::generate::producer::{RowValues, ValueProducer, MAX_PRODUCER_VALUES};
use crate::generate::value::Value;

pub struct CharsetProducer {
    alphabet: Vec<char>,
    min_len: usize,
    max_len: usize,
    /// `ext[d]` for `d in 0..=max_len`; u128 with saturation. Ranks are
    /// bounded by the u64 position space long before saturation matters.
    ext: Vec<u128>,
    total: u64,
}

impl CharsetProducer {
    pub fn new(alphabet: Vec<char>, min_len: usize, max_len: usize) -> CharsetProducer {
        let min_len = min_len.max(1);
        let max_len = max_len.max(min_len);
        let radix = alphabet.len() as u128;
        let mut ext = vec![0u128; max_len + 1];
        ext[max_len] = 1;
        for d in (0..max_len).rev() {
            let own = u128::from(d >= min_len);
            ext[d] = radix.saturating_mul(ext[d + 1]).saturating_add(own);
        }
        CharsetProducer {
            alphabet,
            min_len,
            max_len,
            ext,
            total: 1,
        }
    }
}

impl ValueProducer for CharsetProducer {
    fn values_count(&self) -> u64 {
        self.ext[0].min(MAX_PRODUCER_VALUES as u128) as u64
    }

    fn set_total_count(&mut self, total: u64) {
        self.total = total.max(1);
    }

    fn value(&self, number: f64, _row: &RowValues) -> Result<Value> {
        let mut rank = number.max(0.0) as u64 as u128;
        let mut out = String::with_capacity(self.max_len);
        for d in 0..self.max_len {
            if d >= self.min_len {
                if rank == 0 {
                    return Ok(Value::String(out));
                }
                rank -= 1;
            }
            let block = self.ext[d + 1];
            let idx = ((rank / block) as usize).min(self.alphabet.len() - 1);
            rank %= block;
            out.push(self.alphabet[idx]);
        }
        if rank == 0 {
            Ok(Value::String(out))
        } else {
            Err(SdvgError::Internal {
                message: format!("charset rank {} exceeds the value domain", number),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(p: &CharsetProducer, n: u64) -> Vec<String> {
        let row = RowValues::new();
        (0..n)
            .map(|i| match p.value(i as f64, &row).unwrap() {
                Value::String(s) => s,
                other => panic!("expected string, got {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_two_letter_alphabet_enumeration() {
        let p = CharsetProducer::new(vec!['a', 'b'], 1, 2);
        // 2 one-char + 4 two-char strings
        assert_eq!(p.values_count(), 6);
        let got = strings(&p, 6);
        assert_eq!(got, vec!["a", "aa", "ab", "b", "ba", "bb"]);
    }

    #[test]
    fn test_lexicographic_order() {
        let p = CharsetProducer::new(vec!['0', '1', '2'], 2, 4);
        let got = strings(&p, p.values_count());
        for pair in got.windows(2) {
            assert!(pair[0] < pair[1], "{:?} >= {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_length_bounds_honored() {
        let p = CharsetProducer::new(('a'..='z').collect(), 3, 5);
        let got = strings(&p, 1000);
        assert!(got.iter().all(|s| (3..=5).contains(&s.len())));
    }

    #[test]
    fn test_all_values_distinct() {
        let p = CharsetProducer::new(vec!['x', 'y', 'z'], 1, 3);
        let got = strings(&p, p.values_count());
        let set: std::collections::HashSet<&String> = got.iter().collect();
        assert_eq!(set.len(), got.len());
    }

    #[test]
    fn test_huge_domain_saturates_capacity() {
        let p = CharsetProducer::new(('!'..='~').collect(), 1, 64);
        assert_eq!(p.values_count(), MAX_PRODUCER_VALUES);
        // Ranks within the u64 space still decode.
        let row = RowValues::new();
        assert!(p.value(1e15, &row).is_ok());
    }
}
