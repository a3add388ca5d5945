//! Text producer: space-delimited word sequences decoded from a rank.
//!
//! `exact[l]` counts the distinct texts of exactly `l` characters buildable
//! from the locale word list (a word contributes either itself at its own
//! length, or recursively after `word + space`). A rank first selects the
//! length bucket, then unranks within it by walking the sorted word list.
//! Lengths are measured in characters, not bytes, so multi-byte locales
//! behave.

use crate::error::{Result, SdvgError};
use crate::generate::producer::{RowValues, ValueProducer, MAX_PRODUCER_VALUES};
use crate::generate::value::Value;

pub struct TextProducer {
    /// `(word, char_length)`, sorted by word.
    words: Vec<(&'static str, usize)>,
    min_len: usize,
    max_len: usize,
    exact: Vec<u128>,
    total: u64,
}

impl TextProducer {
    pub fn new(words: &'static [&'static str], min_len: usize, max_len: usize) -> TextProducer {
        let min_len = min_len.max(1);
        let max_len = max_len.max(min_len);
        let words: Vec<(&'static str, usize)> =
            words.iter().map(|w| (*w, w.chars().count())).collect();

        let mut exact = vec![0u128; max_len + 1];
        for l in 1..=max_len {
            let mut count = 0u128;
            for (_, wl) in &words {
                if *wl == l {
                    count = count.saturating_add(1);
                } else if wl + 1 < l {
                    count = count.saturating_add(exact[l - wl - 1]);
                }
            }
            exact[l] = count;
        }

        TextProducer {
            words,
            min_len,
            max_len,
            exact,
            total: 1,
        }
    }

    fn unrank(&self, length: usize, mut rank: u128) -> Result<String> {
        let mut out = String::new();
        let mut remaining = length;
        'outer: while remaining > 0 {
            for (word, wl) in &self.words {
                let count = if *wl == remaining {
                    1
                } else if wl + 1 < remaining {
                    self.exact[remaining - wl - 1]
                } else {
                    0
                };
                if rank < count {
                    out.push_str(word);
                    if *wl == remaining {
                        return Ok(out);
                    }
                    out.push(' ');
                    remaining -= wl + 1;
                    continue 'outer;
                }
                rank -= count;
            }
            return Err(SdvgError::Internal {
                message: format!("text rank exhausted the word list at length {}", remaining),
            });
        }
        Ok(out)
    }
}

impl ValueProducer for TextProducer {
    fn values_count(&self) -> u64 {
        let total: u128 = self.exact[self.min_len..=self.max_len]
            .iter()
            .fold(0u128, |acc, c| acc.saturating_add(*c));
        total.min(MAX_PRODUCER_VALUES as u128) as u64
    }

    fn set_total_count(&mut self, total: u64) {
        self.total = total.max(1);
    }

    fn value(&self, number: f64, _row: &RowValues) -> Result<Value> {
        let mut rank = number.max(0.0) as u64 as u128;
        for length in self.min_len..=self.max_len {
            if rank < self.exact[length] {
                return self.unrank(length, rank).map(Value::String);
            }
            rank -= self.exact[length];
        }
        Err(SdvgError::Internal {
            message: format!("text rank {} exceeds the value domain", number),
        })
    }
}
