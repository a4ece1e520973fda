//! Paths that skip authentication entirely.

use regex::Regex;

use crate::error::ConfigurationError;

/// A single exclusion rule, matched case-sensitively against the request path.
#[derive(Debug, Clone)]
pub enum ExclusionPattern {
    /// The path must equal the pattern.
    Exact(String),
    /// `*` matches any run of characters, including `/`.
    Glob(String),
    /// Unanchored regular expression search.
    Regex(Regex),
}

impl ExclusionPattern {
    /// Parse a pattern string: anything containing `*` is a glob, everything else is exact.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        if pattern.contains('*') {
            Self::Glob(pattern.to_string())
        } else {
            Self::Exact(pattern.to_string())
        }
    }

    /// Compile a regular expression pattern.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::InvalidExclusionPattern`] if the expression does not compile.
    pub fn regex(pattern: &str) -> Result<Self, ConfigurationError> {
        Regex::new(pattern).map(Self::Regex).map_err(|err| {
            ConfigurationError::InvalidExclusionPattern {
                pattern: pattern.to_string(),
                reason: err.to_string(),
            }
        })
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == exact,
            Self::Glob(glob) => glob_matches(glob, path),
            Self::Regex(regex) => regex.is_match(path),
        }
    }
}

impl From<&str> for ExclusionPattern {
    fn from(pattern: &str) -> Self {
        Self::parse(pattern)
    }
}

impl From<String> for ExclusionPattern {
    fn from(pattern: String) -> Self {
        Self::parse(&pattern)
    }
}

fn glob_matches(glob: &str, path: &str) -> bool {
    let mut parts = glob.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = path.strip_prefix(first) else {
        return false;
    };

    let mut parts: Vec<&str> = parts.collect();
    let Some(last) = parts.pop() else {
        return rest.is_empty();
    };

    for part in parts {
        match rest.find(part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }

    rest.ends_with(last)
}

/// The configured exclusion rules. A path is excluded if any rule matches.
#[derive(Debug, Clone, Default)]
pub struct ExclusionList {
    patterns: Vec<ExclusionPattern>,
}

impl ExclusionList {
    pub fn new<I, P>(patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ExclusionPattern>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push(&mut self, pattern: impl Into<ExclusionPattern>) {
        self.patterns.push(pattern.into());
    }

    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(path))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl<P: Into<ExclusionPattern>> FromIterator<P> for ExclusionList {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self::new(iter)
    }
}
