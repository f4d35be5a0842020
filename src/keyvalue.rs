//! Flat `key=value` text format
//!
//! Used for per-module summaries, the run-level summary and configuration
//! files. One pair per line, list values joined with commas.

use std::collections::BTreeMap;
use thiserror::Error;

/// Separator between key and value
pub const KEY_SEP: char = '=';

/// Separator between items of a list value
pub const ITEM_SEP: char = ',';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyValueError {
    #[error("line {line}: <{content}> does not contain separator <=>")]
    MissingSeparator { line: usize, content: String },

    #[error("line {line}: empty key")]
    EmptyKey { line: usize },

    #[error("key <{key}>: cannot parse <{value}> as {expected}")]
    BadValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

/// Parsed key-value pairs with typed accessors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValue {
    entries: BTreeMap<String, String>,
}

impl KeyValue {
    /// Parse text where every non-empty line holds `key=value`.
    ///
    /// Keys and values are trimmed. A repeated key keeps the last value.
    pub fn parse(text: &str) -> Result<Self, KeyValueError> {
        Self::parse_with(text, false)
    }

    /// Parse configuration-style text: like [`KeyValue::parse`] but `#`/`;`
    /// comment lines and `[section]` headers are skipped.
    pub fn parse_config(text: &str) -> Result<Self, KeyValueError> {
        Self::parse_with(text, true)
    }

    fn parse_with(text: &str, config_syntax: bool) -> Result<Self, KeyValueError> {
        let mut entries = BTreeMap::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if config_syntax
                && (line.starts_with('#')
                    || line.starts_with(';')
                    || (line.starts_with('[') && line.ends_with(']')))
            {
                continue;
            }
            let Some((key, value)) = line.split_once(KEY_SEP) else {
                return Err(KeyValueError::MissingSeparator {
                    line: index + 1,
                    content: line.to_string(),
                });
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(KeyValueError::EmptyKey { line: index + 1 });
            }
            entries.insert(key.to_string(), value.trim().to_string());
        }
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Integer value, `None` when the key is absent
    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, KeyValueError> {
        self.get_parsed(key, "an unsigned integer")
    }

    pub fn get_i32(&self, key: &str) -> Result<Option<i32>, KeyValueError> {
        self.get_parsed(key, "an integer")
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, KeyValueError> {
        self.get_parsed(key, "a number")
    }

    /// Boolean value accepting `true/false`, `yes/no`, `on/off`, `1/0`
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, KeyValueError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Some(true)),
            "false" | "no" | "off" | "0" => Ok(Some(false)),
            _ => Err(KeyValueError::BadValue {
                key: key.to_string(),
                value: value.to_string(),
                expected: "a boolean",
            }),
        }
    }

    /// Comma-separated list value; an empty value is an empty list
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key).map(split_list).unwrap_or_default()
    }

    fn get_parsed<T: std::str::FromStr>(
        &self,
        key: &str,
        expected: &'static str,
    ) -> Result<Option<T>, KeyValueError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|_| KeyValueError::BadValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    expected,
                }),
        }
    }
}

/// Split a comma-joined list value, dropping empty items
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(ITEM_SEP)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join list items for a list value
pub fn join_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| item.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(&ITEM_SEP.to_string())
}

/// Render pairs in the given order, one per line, with a trailing newline
pub fn to_text<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut text = String::new();
    for (key, value) in pairs {
        text.push_str(key.as_ref());
        text.push(KEY_SEP);
        text.push_str(value.as_ref());
        text.push('\n');
    }
    text
}
