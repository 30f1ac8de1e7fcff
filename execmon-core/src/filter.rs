//! Token key filtering for the network view

use crate::error::PatternError;
use regex::Regex;

#[derive(Debug, Clone)]
enum Matcher {
    /// Nothing entered yet; everything passes
    Empty,
    Literal(String),
    Regex(Regex),
}

/// Substring or regular expression predicate over token keys
///
/// The pattern is compiled once per `set_pattern`, so `matches` is cheap
/// enough to run over every node of the network.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    text: String,
    use_regex: bool,
    active: bool,
    matcher: Matcher,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterEngine {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            use_regex: false,
            active: true,
            matcher: Matcher::Empty,
        }
    }

    /// Store a new pattern. Regex patterns are searched, not anchored.
    ///
    /// An invalid expression leaves the previous pattern in place.
    pub fn set_pattern(&mut self, text: &str, use_regex: bool) -> Result<(), PatternError> {
        let matcher = compile(text, use_regex)?;
        self.text = text.to_string();
        self.use_regex = use_regex;
        self.matcher = matcher;
        tracing::debug!(pattern = %text, use_regex, "filter pattern set");
        Ok(())
    }

    /// Switch between literal and regex matching for the current text
    pub fn set_use_regex(&mut self, use_regex: bool) -> Result<(), PatternError> {
        let text = self.text.clone();
        self.set_pattern(&text, use_regex)
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.matcher = Matcher::Empty;
    }

    pub fn pattern(&self) -> &str {
        &self.text
    }

    pub fn use_regex(&self) -> bool {
        self.use_regex
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the filter currently restricts anything
    pub fn is_restricting(&self) -> bool {
        self.active && !matches!(self.matcher, Matcher::Empty)
    }

    pub fn matches(&self, key: &str) -> bool {
        if !self.active {
            return true;
        }
        match &self.matcher {
            Matcher::Empty => true,
            Matcher::Literal(needle) => key.contains(needle.as_str()),
            Matcher::Regex(re) => re.is_match(key),
        }
    }
}

fn compile(text: &str, use_regex: bool) -> Result<Matcher, PatternError> {
    if text.is_empty() {
        return Ok(Matcher::Empty);
    }
    if !use_regex {
        return Ok(Matcher::Literal(text.to_string()));
    }
    Regex::new(text)
        .map(Matcher::Regex)
        .map_err(|e| PatternError {
            pattern: text.to_string(),
            message: e.to_string(),
        })
}

/// Pattern matching exactly one token key
pub fn exact_key_pattern(key: &str) -> String {
    format!("^{}$", regex::escape(key))
}
