//! Decoding of captured child output
//!
//! Tried in order: the locale's charset, UTF-8, Latin-1. Latin-1 maps every
//! byte to a character, so decoding never fails.

use encoding_rs::Encoding;
use std::env;
use tracing::debug;

/// Locale variables consulted for the charset, highest priority first
const LOCALE_VARS: &[&str] = &["LC_ALL", "LC_CTYPE", "LANG"];

/// Decode output bytes using the current locale
pub fn decode_output(bytes: &[u8]) -> String {
    let values: Vec<Option<String>> = LOCALE_VARS.iter().map(|v| env::var(v).ok()).collect();
    decode_with_locale(bytes, locale_encoding(&values))
}

/// Decode with an explicit locale encoding (`None` when unknown)
pub fn decode_with_locale(bytes: &[u8], locale: Option<&'static Encoding>) -> String {
    if let Some(encoding) = locale {
        let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
        if !had_errors {
            return text.into_owned();
        }
        debug!(encoding = encoding.name(), "output does not match locale encoding");
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("output is not UTF-8, decoding as Latin-1");
            decode_latin1(bytes)
        }
    }
}

/// Charset named by the first set locale variable, e.g. `UTF-8` in
/// `de_DE.UTF-8@euro`. The `C` and `POSIX` locales name none.
pub fn locale_encoding(values: &[Option<String>]) -> Option<&'static Encoding> {
    let locale = values
        .iter()
        .flatten()
        .find(|value| !value.is_empty())?;
    let (_, rest) = locale.split_once('.')?;
    let charset = rest.split('@').next().unwrap_or(rest);
    Encoding::for_label(charset.as_bytes())
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
