//! Delimited-text import for study sets.
//!
//! # Format
//! One card per line, term and definition separated by a delimiter:
//! ```text
//! hello	你好
//! goodbye	再见
//! ```
//! Only the first delimiter on a line splits it; the rest of the line,
//! delimiters included, is the definition.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::TermPair;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImportError {
    #[error("delimiter cannot be empty")]
    EmptyDelimiter,

    #[error("delimiter cannot contain a line break")]
    MultilineDelimiter,

    #[error("nothing to import")]
    EmptyInput,

    #[error("no valid cards found ({dropped} invalid lines); each line needs a term and a definition separated by the delimiter")]
    NoValidLines { dropped: usize },
}

/// Field separator for imported lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delimiter {
    #[default]
    Tab,
    Comma,
    Semicolon,
    Custom(String),
}

impl Delimiter {
    /// Arbitrary separator such as `" - "`.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::EmptyDelimiter` or `ImportError::MultilineDelimiter`.
    pub fn custom(sep: impl Into<String>) -> Result<Self, ImportError> {
        let sep = sep.into();
        if sep.is_empty() {
            return Err(ImportError::EmptyDelimiter);
        }
        if sep.contains(['\n', '\r']) {
            return Err(ImportError::MultilineDelimiter);
        }
        Ok(Self::Custom(sep))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Delimiter::Tab => "\t",
            Delimiter::Comma => ",",
            Delimiter::Semicolon => ";",
            Delimiter::Custom(sep) => sep,
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Tab => f.write_str("tab"),
            Delimiter::Comma => f.write_str("comma"),
            Delimiter::Semicolon => f.write_str("semicolon"),
            Delimiter::Custom(sep) => write!(f, "{sep:?}"),
        }
    }
}

impl FromStr for Delimiter {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tab" | "\t" => Ok(Delimiter::Tab),
            "comma" | "," => Ok(Delimiter::Comma),
            "semicolon" | ";" => Ok(Delimiter::Semicolon),
            other => Delimiter::custom(other),
        }
    }
}

/// A non-blank line that did not yield a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedLine {
    /// 1-based line number in the input.
    pub line: usize,
    pub text: String,
}

/// Parsed cards plus the lines that were skipped, for a pre-commit preview.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPreview {
    pairs: Vec<TermPair>,
    dropped: Vec<DroppedLine>,
}

impl ImportPreview {
    #[must_use]
    pub fn pairs(&self) -> &[TermPair] {
        &self.pairs
    }

    #[must_use]
    pub fn dropped(&self) -> &[DroppedLine] {
        &self.dropped
    }

    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    /// Hand over the parsed cards for commit.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::NoValidLines` when nothing parsed.
    pub fn into_pairs(self) -> Result<Vec<TermPair>, ImportError> {
        if self.pairs.is_empty() {
            return Err(ImportError::NoValidLines {
                dropped: self.dropped.len(),
            });
        }
        Ok(self.pairs)
    }
}

/// Parse delimited text into term/definition pairs.
///
/// Blank lines are skipped silently. Lines without the delimiter, or with an
/// empty term or definition after trimming, are dropped and reported.
#[must_use]
pub fn parse_delimited(text: &str, delimiter: &Delimiter) -> ImportPreview {
    let sep = delimiter.as_str();
    let mut preview = ImportPreview::default();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed = line.split_once(sep).and_then(|(term, definition)| {
            let pair = TermPair::new(term.trim(), definition.trim());
            pair.is_complete().then_some(pair)
        });
        match parsed {
            Some(pair) => preview.pairs.push(pair),
            None => preview.dropped.push(DroppedLine {
                line: idx + 1,
                text: line.to_owned(),
            }),
        }
    }

    preview
}

/// Inverse of `parse_delimited` for pairs free of delimiters and newlines.
#[must_use]
pub fn serialize_pairs(pairs: &[TermPair], delimiter: &Delimiter) -> String {
    let sep = delimiter.as_str();
    pairs
        .iter()
        .map(|pair| format!("{}{sep}{}", pair.term, pair.definition))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_on_first_delimiter_only() {
        let preview = parse_delimited("你,nǐ,you\n好,hǎo", &Delimiter::Comma);
        assert_eq!(
            preview.pairs(),
            &[TermPair::new("你", "nǐ,you"), TermPair::new("好", "hǎo")]
        );
        assert_eq!(preview.dropped_count(), 0);
    }

    #[test]
    fn blank_lines_are_not_counted_as_dropped() {
        let preview = parse_delimited("\n  \nhello\t你好\n\n", &Delimiter::Tab);
        assert_eq!(preview.pairs().len(), 1);
        assert_eq!(preview.dropped_count(), 0);
    }

    #[test]
    fn reports_lines_missing_a_field() {
        let text = "hello;你好\nno delimiter here\n ; only definition\nterm only;  \r\nthanks;谢谢";
        let preview = parse_delimited(text, &Delimiter::Semicolon);

        assert_eq!(
            preview.pairs(),
            &[TermPair::new("hello", "你好"), TermPair::new("thanks", "谢谢")]
        );
        let lines: Vec<usize> = preview.dropped().iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![2, 3, 4]);
    }

    #[test]
    fn zero_valid_lines_is_a_hard_failure() {
        let preview = parse_delimited("a\nb", &Delimiter::Comma);
        assert_eq!(
            preview.into_pairs().unwrap_err(),
            ImportError::NoValidLines { dropped: 2 }
        );
    }

    #[test]
    fn custom_delimiter_may_be_multi_char() {
        let delim: Delimiter = " - ".parse().unwrap();
        let preview = parse_delimited("water - 水 - shuǐ", &delim);
        assert_eq!(preview.pairs(), &[TermPair::new("water", "水 - shuǐ")]);
    }

    #[test]
    fn delimiter_names_parse() {
        assert_eq!("tab".parse::<Delimiter>().unwrap(), Delimiter::Tab);
        assert_eq!(",".parse::<Delimiter>().unwrap(), Delimiter::Comma);
        assert_eq!("semicolon".parse::<Delimiter>().unwrap(), Delimiter::Semicolon);
        assert_eq!("".parse::<Delimiter>().unwrap_err(), ImportError::EmptyDelimiter);
        assert_eq!(
            Delimiter::custom("\n").unwrap_err(),
            ImportError::MultilineDelimiter
        );
    }

    #[test]
    fn serialize_then_parse_returns_the_pairs() {
        let pairs = vec![
            TermPair::new("你好", "hello"),
            TermPair::new("再见", "goodbye"),
            TermPair::new("谢谢", "thank you"),
        ];
        for delim in [Delimiter::Tab, Delimiter::Comma, Delimiter::Semicolon] {
            let text = serialize_pairs(&pairs, &delim);
            assert_eq!(parse_delimited(&text, &delim).into_pairs().unwrap(), pairs);
        }
    }
}
