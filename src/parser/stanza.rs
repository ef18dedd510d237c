//! Blank-line separated `key: value` records
//!
//! Both package managers store their database as stanzas of fields separated by
//! blank lines. A field line starting with whitespace continues the previous field.

use crate::error::ParseError;
use std::path::Path;
use tracing::warn;

/// One record of the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stanza {
    /// 1-based line the record starts on
    pub line: usize,
    /// Fields in file order, values trimmed
    pub fields: Vec<(String, String)>,
}

impl Stanza {
    /// First value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Split the database into stanzas
///
/// `name_key` identifies the field every complete record carries. A final record
/// that has its name but no terminating blank line is dropped with a warning; a final
/// record cut off before its name is a [`ParseError::Truncated`].
pub fn parse_stanzas(
    content: &str,
    path: &Path,
    name_key: &str,
) -> Result<Vec<Stanza>, ParseError> {
    let mut stanzas = Vec::new();
    let mut current: Option<Stanza> = None;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;

        if line.trim().is_empty() {
            if let Some(stanza) = current.take() {
                if stanza.get(name_key).is_none() {
                    return Err(ParseError::MissingName {
                        path: path.to_path_buf(),
                        line: stanza.line,
                    });
                }
                stanzas.push(stanza);
            }
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            match current.as_mut().and_then(|s| s.fields.last_mut()) {
                Some((_, value)) => {
                    if !value.is_empty() {
                        value.push('\n');
                    }
                    value.push_str(line.trim());
                    continue;
                }
                None => return Err(ParseError::malformed(path, line_no, line)),
            }
        }

        let (key, value) =
            split_field(line).ok_or_else(|| ParseError::malformed(path, line_no, line))?;
        current
            .get_or_insert_with(|| Stanza {
                line: line_no,
                fields: Vec::new(),
            })
            .fields
            .push((key.to_string(), value.trim().to_string()));
    }

    if let Some(stanza) = current {
        match stanza.get(name_key) {
            Some(name) => warn!(
                path = %path.display(),
                line = stanza.line,
                package = name,
                "ignoring unterminated trailing record"
            ),
            None => return Err(ParseError::truncated(path, stanza.line)),
        }
    }

    Ok(stanzas)
}

fn split_field(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let valid_key = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid_key {
        Some((key, value))
    } else {
        None
    }
}
