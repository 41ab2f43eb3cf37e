//! Blocklist of sinkholed domains.
//!
//! Loaded once from a newline-delimited file of fully qualified names and
//! never modified afterwards.

use std::fs;
use std::io;
use std::path::Path;

use rustc_hash::FxHashSet;

/// A set of blocked domains for exact-match lookup.
#[derive(Debug, Default, Clone)]
pub struct Blocklist {
    domains: FxHashSet<String>,
}

impl Blocklist {
    /// An empty blocklist that blocks nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a blocklist file, one domain per line.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;

        Ok(Self::parse(&contents))
    }

    /// Build a blocklist from newline-delimited text.
    ///
    /// Entries are trimmed, lower-cased and stripped of a trailing dot.
    /// Blank lines are skipped; no comment or wildcard syntax exists.
    pub fn parse(contents: &str) -> Self {
        let domains = contents
            .lines()
            .filter_map(|line| {
                let domain = normalize(line);
                (!domain.is_empty()).then_some(domain)
            })
            .collect();

        Self { domains }
    }

    /// Check if a domain should be blocked.
    ///
    /// Only the exact name matches: blocking "ads.example.com" does not
    /// block "x.ads.example.com" or "example.com". Case is ignored.
    pub fn is_blocked(&self, domain: &str) -> bool {
        if self.domains.is_empty() {
            return false;
        }

        self.domains.contains(&normalize(domain))
    }

    /// Returns the number of domains in the blocklist.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Blocklist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let domains = iter
            .into_iter()
            .map(|domain| normalize(domain.as_ref()))
            .filter(|domain| !domain.is_empty())
            .collect();

        Self { domains }
    }
}

fn normalize(domain: &str) -> String {
    let domain = domain.trim();
    domain.strip_suffix('.').unwrap_or(domain).to_ascii_lowercase()
}
