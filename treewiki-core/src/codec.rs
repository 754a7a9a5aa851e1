//! Token-table conversion between stored markup and authoring markdown.
//!
//! The replacement table is an ordered list of `(markup, markdown)` pairs.
//! Substitution is literal and sequential: every pair is applied to the whole
//! string in table order, so later pairs see the output of earlier ones.
//! Reordering the table changes the result.

use chrono::{Local, NaiveDate};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Prefix of the edit datestamp appended by [`MarkupCodec::to_markup`]
pub const DATESTAMP_PREFIX: &str = "&date=";

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Replacement table not found: {}", .path.display())]
    Missing { path: PathBuf },

    #[error("Failed to read replacement table {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed replacement table line {line}: {text:?}")]
    Malformed { line: usize, text: String },
}

/// Markdown delimiters for an HTML-style tag keyword
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formatting {
    pub open: String,
    pub close: String,
}

impl Formatting {
    /// True when the table has no delimiters for the keyword
    pub fn is_empty(&self) -> bool {
        self.open.is_empty() && self.close.is_empty()
    }
}

/// Bidirectional markup/markdown converter
#[derive(Debug, Clone, Default)]
pub struct MarkupCodec {
    pairs: Vec<(String, String)>,
}

static DATESTAMP_REGEX: OnceLock<Regex> = OnceLock::new();

fn datestamp_regex() -> &'static Regex {
    DATESTAMP_REGEX.get_or_init(|| Regex::new(r"&date=\d{8}\s*$").unwrap())
}

impl MarkupCodec {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Parse a replacement table: one `<markup> <markdown>` pair per line.
    ///
    /// A line with a single token maps that token to the empty string,
    /// so it is removed by [`to_markdown`](Self::to_markdown).
    pub fn parse(table: &str) -> Result<Self, CodecError> {
        let mut pairs = Vec::new();

        for (idx, line) in table.lines().enumerate() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                [] => continue,
                [markup] => pairs.push((markup.to_string(), String::new())),
                [markup, markdown] => pairs.push((markup.to_string(), markdown.to_string())),
                _ => {
                    return Err(CodecError::Malformed {
                        line: idx + 1,
                        text: line.to_string(),
                    })
                }
            }
        }

        Ok(Self { pairs })
    }

    /// Load a replacement table from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CodecError> {
        let path = path.as_ref();
        let table = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CodecError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                CodecError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let codec = Self::parse(&table)?;
        tracing::debug!("Loaded {} replacement pairs from {:?}", codec.len(), path);
        Ok(codec)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Convert stored markup to markdown, dropping a trailing datestamp
    pub fn to_markdown(&self, text: &str) -> String {
        let mut out = strip_datestamp(text).to_string();
        for (markup, markdown) in &self.pairs {
            if !markup.is_empty() {
                out = out.replace(markup.as_str(), markdown);
            }
        }
        out
    }

    /// Convert markdown back to markup and stamp it with today's date
    pub fn to_markup(&self, text: &str) -> String {
        self.to_markup_on(text, Local::now().date_naive())
    }

    /// Convert markdown back to markup, stamping it with `date`.
    ///
    /// Pairs are applied in reverse table order, markdown to markup.
    pub fn to_markup_on(&self, text: &str, date: NaiveDate) -> String {
        let mut out = strip_datestamp(text).to_string();
        for (markup, markdown) in self.pairs.iter().rev() {
            if !markdown.is_empty() {
                out = out.replace(markdown.as_str(), markup);
            }
        }
        out.push_str(&datestamp(date));
        out
    }

    /// Look up the markdown delimiters for `<keyword>` and `</keyword>`
    pub fn find_formatting(&self, keyword: &str) -> Formatting {
        let open_tag = format!("<{}>", keyword);
        let close_tag = format!("</{}>", keyword);
        let lookup = |tag: &str| {
            self.pairs
                .iter()
                .find(|(markup, _)| markup == tag)
                .map(|(_, markdown)| markdown.clone())
                .unwrap_or_default()
        };

        Formatting {
            open: lookup(&open_tag),
            close: lookup(&close_tag),
        }
    }
}

/// Render the datestamp marker for `date`
pub fn datestamp(date: NaiveDate) -> String {
    format!("{}{}", DATESTAMP_PREFIX, date.format("%Y%m%d"))
}

/// Remove a trailing datestamp marker, if present
pub fn strip_datestamp(text: &str) -> &str {
    match datestamp_regex().find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    }
}
