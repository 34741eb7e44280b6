//! Tokenizer for separator-delimited data
//!
//! Affiliate host lists (`a.com,b.com`), pointer files (`a.dat;b.dat`),
//! settings records and hostnames all go through [`split_tokens`].

/// Split `input` on `sep` into ordered segments.
///
/// Inner empty segments are kept; a single trailing empty segment (produced
/// by a trailing separator, or by empty input) is dropped.
pub fn split_tokens(input: &str, sep: char) -> Vec<String> {
    let mut tokens: Vec<String> = input.split(sep).map(str::to_string).collect();
    if tokens.last().is_some_and(|last| last.is_empty()) {
        tokens.pop();
    }
    tokens
}

/// Wildcard marker appended to a suffix key: "this suffix and any subdomain".
pub const WILDCARD_SUFFIX: &str = ".*";

/// Expand a host into the ordered rule-database lookup keys.
///
/// Keys run from the two-label suffix up to the full host. Every suffix
/// except the two-label one is followed by its wildcard variant, so a host
/// with `k` labels yields `2 * (k - 1) - 1` keys. A single-label host yields
/// none.
///
/// ```
/// use shields_core::tokens::lookup_keys;
///
/// assert_eq!(lookup_keys("a.b.com"), vec!["b.com", "a.b.com", "a.b.com.*"]);
/// ```
pub fn lookup_keys(host: &str) -> Vec<String> {
    let labels = split_tokens(host, '.');
    let count = labels.len();
    if count < 2 {
        return Vec::new();
    }

    let mut keys = Vec::with_capacity(2 * (count - 1) - 1);
    for start in (0..count - 1).rev() {
        let suffix = labels[start..].join(".");
        let is_shortest = start == count - 2;
        if is_shortest {
            keys.push(suffix);
        } else {
            let wildcard = format!("{suffix}{WILDCARD_SUFFIX}");
            keys.push(suffix);
            keys.push(wildcard);
        }
    }

    keys
}
