//! Attribute-list parsing for `#EXT-X-STREAM-INF` style tags
//!
//! Accepts `KEY=value` and `KEY="quoted, value"` pairs separated by commas
//! or whitespace. A malformed pair is skipped up to the next comma outside
//! quotes and scanning resumes there.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, space0},
    sequence::{delimited, preceded, separated_pair},
    IResult, Parser,
};
use std::collections::HashMap;

/// Parsed attribute list with case-insensitive keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeList {
    values: HashMap<String, String>,
}

impl AttributeList {
    /// Parse the text following the tag's colon
    pub fn parse(input: &str) -> Self {
        let pairs = attribute_list(input);

        let mut values = HashMap::with_capacity(pairs.len());
        for (key, value) in pairs {
            // First occurrence wins
            values
                .entry(key.to_ascii_uppercase())
                .or_insert_with(|| value.trim().trim_matches('"').to_string());
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_ascii_uppercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        let value = self.get(key)?;
        value
            .parse::<u64>()
            .ok()
            .or_else(|| value.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)?.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn attribute_key(input: &str) -> IResult<&str, &str> {
    preceded(
        space0,
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
    )
    .parse(input)
}

fn quoted_value(input: &str) -> IResult<&str, &str> {
    delimited(
        preceded(space0, char('"')),
        take_while(|c: char| c != '"'),
        char('"'),
    )
    .parse(input)
}

fn bare_value(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| !is_separator(c)).parse(input)
}

fn attribute(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(
        attribute_key,
        delimited(space0, char('='), space0),
        alt((quoted_value, bare_value)),
    )
    .parse(input)
}

fn is_separator(c: char) -> bool {
    c == ',' || c.is_ascii_whitespace()
}

fn attribute_list(mut input: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    loop {
        input = input.trim_start_matches(is_separator);
        if input.is_empty() {
            return pairs;
        }
        match attribute(input) {
            Ok((rest, pair)) if rest.is_empty() || rest.starts_with(is_separator) => {
                pairs.push(pair);
                input = rest;
            }
            _ => input = skip_pair(input),
        }
    }
}

/// Rest of the input after the next comma that is not inside quotes
fn skip_pair(input: &str) -> &str {
    let mut quoted = false;
    for (i, c) in input.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => return &input[i + 1..],
            _ => {}
        }
    }
    ""
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_attributes() {
        let attrs = AttributeList::parse("BANDWIDTH=1500000,RESOLUTION=1280x720");
        assert_eq!(attrs.get_u64("BANDWIDTH"), Some(1_500_000));
        assert_eq!(attrs.get("RESOLUTION"), Some("1280x720"));
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_quoted_value_keeps_commas() {
        let attrs = AttributeList::parse(
            r#"BANDWIDTH=800000,CODECS="avc1.4d401f,mp4a.40.2",FRAME-RATE=29.97"#,
        );
        assert_eq!(attrs.get("CODECS"), Some("avc1.4d401f,mp4a.40.2"));
        assert_eq!(attrs.get_f64("FRAME-RATE"), Some(29.97));
    }

    #[test]
    fn test_keys_are_case_insensitive_and_spaces_tolerated() {
        let attrs = AttributeList::parse("bandwidth=640000, Resolution=640x360");
        assert_eq!(attrs.get_u64("BANDWIDTH"), Some(640_000));
        assert_eq!(attrs.get("resolution"), Some("640x360"));
    }

    #[test]
    fn test_scanning_resumes_after_malformed_pair() {
        let attrs = AttributeList::parse("BANDWIDTH=500000,garbage,RESOLUTION=640x360");
        assert_eq!(attrs.get_u64("BANDWIDTH"), Some(500_000));
        assert_eq!(attrs.get("RESOLUTION"), Some("640x360"));

        // The stray token swallows its pair, the real BANDWIDTH still wins
        let attrs = AttributeList::parse("AVERAGE BANDWIDTH=1,BANDWIDTH=900000,RESOLUTION=854x480");
        assert_eq!(attrs.get_u64("BANDWIDTH"), Some(900_000));
        assert_eq!(attrs.get("RESOLUTION"), Some("854x480"));

        let attrs = AttributeList::parse(r#"CODECS="a,b"x,BANDWIDTH=700000"#);
        assert_eq!(attrs.get("CODECS"), None);
        assert_eq!(attrs.get_u64("BANDWIDTH"), Some(700_000));
    }

    #[test]
    fn test_whitespace_separated_pairs() {
        let attrs = AttributeList::parse("BANDWIDTH=1500000 RESOLUTION=1280x720");
        assert_eq!(attrs.get_u64("BANDWIDTH"), Some(1_500_000));
        assert_eq!(attrs.get("RESOLUTION"), Some("1280x720"));

        let attrs = AttributeList::parse("BANDWIDTH = 640000");
        assert_eq!(attrs.get_u64("BANDWIDTH"), Some(640_000));
    }

    #[test]
    fn test_empty_and_unparseable_values() {
        assert!(AttributeList::parse("").is_empty());
        let attrs = AttributeList::parse("BANDWIDTH=lots,RESOLUTION=");
        assert_eq!(attrs.get_u64("BANDWIDTH"), None);
        assert_eq!(attrs.get("RESOLUTION"), None);
    }
}
