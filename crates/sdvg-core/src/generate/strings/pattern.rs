//! Pattern producer: a literal string where `A`, `a`, `0` and `#` are
//! character-class slots substituted by fractional sub-index descent, and
//! every other character passes through.

use crate::error::Result;
use crate::generate::producer::{FracWalk, RowValues, ValueProducer, MAX_PRODUCER_VALUES};
use crate::generate::value::Value;

use super::SPECIAL_CHARS;

enum Slot {
    Literal(char),
    Class(&'static [char]),
}

static LARGE: [char; 26] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];
static SMALL: [char; 26] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
static DIGITS: [char; 10] = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
static SPECIALS: [char; 12] = ['!', '#', '$', '%', '&', '*', '+', '-', '=', '?', '@', '_'];

pub struct PatternProducer {
    slots: Vec<Slot>,
    capacity: u64,
    total: u64,
}

impl PatternProducer {
    pub fn new(pattern: &str) -> PatternProducer {
        debug_assert_eq!(SPECIALS.iter().collect::<String>(), SPECIAL_CHARS);
        let slots: Vec<Slot> = pattern
            .chars()
            .map(|c| match c {
                'A' => Slot::Class(&LARGE),
                'a' => Slot::Class(&SMALL),
                '0' => Slot::Class(&DIGITS),
                '#' => Slot::Class(&SPECIALS),
                other => Slot::Literal(other),
            })
            .collect();
        let capacity = slots
            .iter()
            .fold(1u64, |acc, slot| match slot {
                Slot::Class(chars) => acc.saturating_mul(chars.len() as u64),
                Slot::Literal(_) => acc,
            })
            .min(MAX_PRODUCER_VALUES);
        PatternProducer {
            slots,
            capacity,
            total: 1,
        }
    }
}

impl ValueProducer for PatternProducer {
    fn values_count(&self) -> u64 {
        self.capacity
    }

    fn set_total_count(&mut self, total: u64) {
        self.total = total.max(1);
    }

    fn value(&self, number: f64, _row: &RowValues) -> Result<Value> {
        let mut walk = FracWalk::new(number, self.total);
        let out: String = self
            .slots
            .iter()
            .map(|slot| match slot {
                Slot::Literal(c) => *c,
                Slot::Class(chars) => chars[walk.next(chars.len())],
            })
            .collect();
        Ok(Value::String(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_pass_through() {
        let mut p = PatternProducer::new("ID-00");
        p.set_total_count(100);
        let row = RowValues::new();
        let Value::String(s) = p.value(42.0, &row).unwrap() else {
            panic!("expected string")
        };
        assert!(s.starts_with("ID-"));
        assert_eq!(s.len(), 5);
        assert!(s[3..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_classes_substituted() {
        let mut p = PatternProducer::new("Aa0#");
        p.set_total_count(p.values_count());
        let row = RowValues::new();
        for i in [0u64, 17, 3000, 60000] {
            let Value::String(s) = p.value(i as f64, &row).unwrap() else {
                panic!("expected string")
            };
            let chars: Vec<char> = s.chars().collect();
            assert!(chars[0].is_ascii_uppercase());
            assert!(chars[1].is_ascii_lowercase());
            assert!(chars[2].is_ascii_digit());
            assert!(SPECIAL_CHARS.contains(chars[3]));
        }
    }

    #[test]
    fn test_capacity_is_class_product() {
        let p = PatternProducer::new("A0");
        assert_eq!(p.values_count(), 260);
    }

    #[test]
    fn test_ordered_in_position() {
        let mut p = PatternProducer::new("aaa");
        p.set_total_count(p.values_count());
        let row = RowValues::new();
        let at = |i: u64| match p.value(i as f64, &row).unwrap() {
            Value::String(s) => s,
            _ => unreachable!(),
        };
        assert!(at(0) < at(100));
        assert!(at(100) < at(17000));
    }
}
