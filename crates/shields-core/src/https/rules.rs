//! HTTPS upgrade rule sets
//!
//! A rule-database value is a JSON array of rule groups:
//!
//! ```json
//! [
//!   {
//!     "e": [{ "p": "^http://insecure\\.example\\.com/.*" }],
//!     "r": [{ "f": "^http://(www\\.)?example\\.com/", "t": "https://$1example.com/" }, { "d": 1 }]
//!   }
//! ]
//! ```
//!
//! `e` holds exclusions (a full match on any of them vetoes the group), `r`
//! holds rules in order: `{ "d": .. }` upgrades the scheme in place,
//! `{ "f": .., "t": .. }` is a regex rewrite. The long names `exclusion`,
//! `pattern`, `rule`, `from` and `to` are accepted too.
//!
//! Values are decoded once into [`RuleSet`]. A root that is not an array is
//! an error; malformed groups, rules, exclusions and invalid regexes are
//! skipped and counted.

use log::warn;
use regex::Regex;
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{BlockerError, Result};

/// Character inserted by the scheme-upgrade rule.
const UPGRADE_CHAR: char = 's';
/// Position right after "http".
const UPGRADE_POS: usize = 4;

// =============================================================================
// Wire Format
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Entry<T> {
    Valid(T),
    Malformed(IgnoredAny),
}

#[derive(Deserialize)]
struct RawGroup {
    #[serde(default, alias = "exclusion")]
    e: Vec<Entry<RawExclusion>>,
    #[serde(default, alias = "rule")]
    r: Vec<Entry<RawRule>>,
}

#[derive(Deserialize)]
struct RawExclusion {
    #[serde(alias = "pattern")]
    p: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRule {
    Rewrite {
        #[serde(alias = "from")]
        f: String,
        #[serde(alias = "to")]
        t: String,
    },
    SchemeUpgrade {
        #[allow(dead_code)]
        d: IgnoredAny,
    },
}

// =============================================================================
// Decoded Rules
// =============================================================================

#[derive(Debug, Clone)]
pub enum Rule {
    /// Insert the upgrade character right after "http".
    SchemeUpgrade,
    /// Regex rewrite of the first match; `to` is already in the replacement
    /// engine's syntax.
    Rewrite { from: Regex, to: String },
}

impl Rule {
    /// Apply to `url`; `None` unless the result differs from `url`.
    pub fn apply(&self, url: &str) -> Option<String> {
        let rewritten = match self {
            Self::SchemeUpgrade => upgrade_scheme(url)?,
            Self::Rewrite { from, to } => from.replace(url, to.as_str()).into_owned(),
        };
        (rewritten != url).then_some(rewritten)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleGroup {
    pub exclusions: Vec<Regex>,
    pub rules: Vec<Rule>,
}

impl RuleGroup {
    pub fn is_excluded(&self, url: &str) -> bool {
        self.exclusions.iter().any(|exclusion| exclusion.is_match(url))
    }

    /// First rule producing a changed URL, unless an exclusion vetoes the group.
    pub fn apply(&self, url: &str) -> Option<String> {
        if self.is_excluded(url) {
            return None;
        }
        self.rules.iter().find_map(|rule| rule.apply(url))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    groups: Vec<RuleGroup>,
    skipped: usize,
}

impl RuleSet {
    /// Decode a rule-database value.
    pub fn decode(json: &str) -> Result<Self> {
        let values: Vec<Value> =
            serde_json::from_str(json).map_err(BlockerError::MalformedRuleSet)?;

        let mut set = RuleSet::default();
        for value in values {
            let raw = match RawGroup::deserialize(value) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Skipping malformed rule group: {}", e);
                    set.skipped += 1;
                    continue;
                }
            };
            let group = set.decode_group(raw);
            set.groups.push(group);
        }

        Ok(set)
    }

    fn decode_group(&mut self, raw: RawGroup) -> RuleGroup {
        let mut group = RuleGroup::default();

        for entry in raw.e {
            let compiled = match entry {
                Entry::Valid(exclusion) => compile_full_match(&exclusion.p),
                Entry::Malformed(_) => {
                    self.skipped += 1;
                    continue;
                }
            };
            match compiled {
                Ok(regex) => group.exclusions.push(regex),
                Err(e) => {
                    warn!("Skipping exclusion: {}", e);
                    self.skipped += 1;
                }
            }
        }

        for entry in raw.r {
            let rule = match entry {
                Entry::Valid(RawRule::SchemeUpgrade { .. }) => Ok(Rule::SchemeUpgrade),
                Entry::Valid(RawRule::Rewrite { f, t }) => compile(&f).map(|from| Rule::Rewrite {
                    from,
                    to: translate_replacement(&t),
                }),
                Entry::Malformed(_) => {
                    self.skipped += 1;
                    continue;
                }
            };
            match rule {
                Ok(rule) => group.rules.push(rule),
                Err(e) => {
                    warn!("Skipping rule: {}", e);
                    self.skipped += 1;
                }
            }
        }

        group
    }

    /// Rewrite from the first group that yields a changed URL.
    pub fn apply(&self, url: &str) -> Option<String> {
        self.groups.iter().find_map(|group| group.apply(url))
    }

    pub fn groups(&self) -> &[RuleGroup] {
        &self.groups
    }

    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|group| group.rules.len()).sum()
    }

    /// Entries dropped during decoding.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| BlockerError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Compile `pattern` so it only matches the whole input.
fn compile_full_match(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| BlockerError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Rewrite `$N` back-references as `${N}` so trailing literal characters are
/// not read as part of the group name; any other `$` becomes a literal `$$`.
pub fn translate_replacement(to: &str) -> String {
    let mut out = String::with_capacity(to.len() + 4);
    let mut chars = to.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let mut digits = String::new();
        while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(d);
            chars.next();
        }

        if digits.is_empty() {
            out.push_str("$$");
        } else {
            out.push_str("${");
            out.push_str(&digits);
            out.push('}');
        }
    }

    out
}

/// "http://x" -> "https://x".
fn upgrade_scheme(url: &str) -> Option<String> {
    if !url.is_char_boundary(UPGRADE_POS) || url.len() <= UPGRADE_POS {
        return None;
    }
    let mut upgraded = String::with_capacity(url.len() + 1);
    upgraded.push_str(&url[..UPGRADE_POS]);
    upgraded.push(UPGRADE_CHAR);
    upgraded.push_str(&url[UPGRADE_POS..]);
    Some(upgraded)
}
