//! String producers.
//!
//! Every family decodes a position into a deterministic, lexicographically
//! ordered string: rank-decoded alphabet strings (`simple`, `hex`,
//! `base64*`), the sorted-octet IPv4 table, ISBN digit placement, word-list
//! texts, locale name lists, digit-substituted phone numbers, character
//! patterns and row templates.

mod charset;
mod ipv4;
mod isbn;
mod names;
mod pattern;
pub mod template;
mod text;

pub use charset::CharsetProducer;
pub use ipv4::Ipv4Producer;
pub use isbn::IsbnProducer;
pub use names::{NameProducer, PhoneProducer};
pub use pattern::PatternProducer;
pub use template::TemplateProducer;
pub use text::TextProducer;

use base64::alphabet::{STANDARD, URL_SAFE};

use crate::config::{LogicalType, StringParams};
use crate::error::Result;
use crate::generate::producer::ValueProducer;
use crate::locale::locale;

/// Special characters of the `#` pattern class and the `simple` charset.
pub(crate) const SPECIAL_CHARS: &str = "!#$%&*+-=?@_";

/// The `simple` alphabet for the given exclusion flags, sorted by code
/// point. Validation guarantees at least one class survives.
pub(crate) fn simple_alphabet(params: &StringParams) -> Vec<char> {
    let mut alphabet = Vec::new();
    if !params.without_digits {
        alphabet.extend('0'..='9');
    }
    if !params.without_large_letters {
        alphabet.extend('A'..='Z');
    }
    if !params.without_small_letters {
        alphabet.extend('a'..='z');
    }
    if !params.without_special_chars {
        alphabet.extend(SPECIAL_CHARS.chars());
    }
    alphabet.sort_unstable();
    alphabet
}

fn sorted_chars(s: &str) -> Vec<char> {
    let mut chars: Vec<char> = s.chars().collect();
    chars.sort_unstable();
    chars
}

/// Build the producer for a string range, honoring the logical type and the
/// template/pattern overrides.
pub fn make_string_producer(
    column_name: &str,
    params: &StringParams,
) -> Result<Box<dyn ValueProducer>> {
    if let Some(template) = &params.template {
        return Ok(Box::new(TemplateProducer::new(column_name, template)?));
    }
    if let Some(pattern) = &params.pattern {
        return Ok(Box::new(PatternProducer::new(pattern)));
    }

    let tables = locale(params.locale);
    let min = params.min_length as usize;
    let max = params.max_length as usize;
    let producer: Box<dyn ValueProducer> = match params.logical_type {
        LogicalType::Simple => {
            Box::new(CharsetProducer::new(simple_alphabet(params), min, max))
        }
        LogicalType::Hex => Box::new(CharsetProducer::new(
            sorted_chars("0123456789abcdef"),
            min,
            max,
        )),
        LogicalType::Base64 => Box::new(CharsetProducer::new(
            sorted_chars(STANDARD.as_str()),
            min,
            max,
        )),
        LogicalType::Base64url | LogicalType::Base64rawurl => Box::new(CharsetProducer::new(
            sorted_chars(URL_SAFE.as_str()),
            min,
            max,
        )),
        LogicalType::FirstName => Box::new(NameProducer::new(tables.first_names)),
        LogicalType::LastName => Box::new(NameProducer::new(tables.last_names)),
        LogicalType::Phone => Box::new(PhoneProducer::new(tables.phone_pattern)),
        LogicalType::Text => Box::new(TextProducer::new(tables.words, min, max)),
        LogicalType::Ipv4 => Box::new(Ipv4Producer::new()),
        LogicalType::Isbn => Box::new(IsbnProducer::new()),
    };
    Ok(producer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocaleCode;
    use crate::generate::producer::RowValues;
    use crate::generate::value::Value;

    fn string_params(logical_type: LogicalType) -> StringParams {
        StringParams {
            logical_type,
            min_length: 2,
            max_length: 6,
            ..StringParams::default()
        }
    }

    #[test]
    fn test_simple_alphabet_respects_exclusions() {
        let params = StringParams {
            without_large_letters: true,
            without_special_chars: true,
            ..StringParams::default()
        };
        let alphabet = simple_alphabet(&params);
        assert!(alphabet.iter().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_dispatch_covers_every_logical_type() {
        for lt in [
            LogicalType::Simple,
            LogicalType::Hex,
            LogicalType::Base64,
            LogicalType::Base64url,
            LogicalType::Base64rawurl,
            LogicalType::FirstName,
            LogicalType::LastName,
            LogicalType::Phone,
            LogicalType::Text,
            LogicalType::Ipv4,
            LogicalType::Isbn,
        ] {
            let mut producer = make_string_producer("c", &string_params(lt)).unwrap();
            producer.set_total_count(producer.values_count().min(10));
            let row = RowValues::new();
            match producer.value(0.0, &row).unwrap() {
                Value::String(s) => assert!(!s.is_empty(), "{:?} produced empty", lt),
                other => panic!("{:?} produced {:?}", lt, other),
            }
        }
    }

    #[test]
    fn test_ru_locale_names() {
        let params = StringParams {
            logical_type: LogicalType::FirstName,
            locale: LocaleCode::Ru,
            ..StringParams::default()
        };
        let mut producer = make_string_producer("c", &params).unwrap();
        producer.set_total_count(5);
        let row = RowValues::new();
        let Value::String(name) = producer.value(0.0, &row).unwrap() else {
            panic!("expected string")
        };
        assert!(name.chars().next().unwrap() as u32 >= 0x400, "not cyrillic: {}", name);
    }
}
