use regex::Regex;
use std::fmt;

/// One split boundary for the recursive chunker, tried in priority order.
#[derive(Debug, Clone)]
pub enum Separator {
    Literal(String),
    Pattern(Regex),
}

impl Separator {
    /// Parse a configured separator string.
    ///
    /// Entries that start with `(` or contain a backslash are compiled as
    /// regular expressions; everything else is matched literally.
    pub fn parse(raw: &str) -> Result<Self, regex::Error> {
        if raw.starts_with('(') || raw.contains('\\') {
            Regex::new(raw).map(Separator::Pattern)
        } else {
            Ok(Separator::Literal(raw.to_string()))
        }
    }

    pub fn literal(s: impl Into<String>) -> Self {
        Separator::Literal(s.into())
    }

    /// Byte ranges of every non-empty match, left to right.
    pub fn matches(&self, text: &str) -> Vec<(usize, usize)> {
        match self {
            Separator::Literal(lit) if lit.is_empty() => Vec::new(),
            Separator::Literal(lit) => text
                .match_indices(lit.as_str())
                .map(|(start, m)| (start, start + m.len()))
                .collect(),
            Separator::Pattern(re) => re
                .find_iter(text)
                .filter(|m| !m.is_empty())
                .map(|m| (m.start(), m.end()))
                .collect(),
        }
    }

    /// Whether this separator occurs anywhere in `text`.
    pub fn occurs_in(&self, text: &str) -> bool {
        match self {
            Separator::Literal(lit) => !lit.is_empty() && text.contains(lit.as_str()),
            Separator::Pattern(re) => re.find_iter(text).any(|m| !m.is_empty()),
        }
    }
}

impl PartialEq for Separator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Separator::Literal(a), Separator::Literal(b)) => a == b,
            (Separator::Pattern(a), Separator::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Separator::Literal(lit) => write!(f, "{lit:?}"),
            Separator::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}
