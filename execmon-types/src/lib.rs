//! Shared types for execmon
//!
//! This crate provides the identifiers every view agrees on: ticks, reactor
//! names, token keys, view kinds and context action ids.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Discrete trace time index
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tick(pub u64);

impl Tick {
    pub fn new(tick: u64) -> Self {
        Self(tick)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Zero-padded form shown in the tick entry
    pub fn format(&self, width: usize) -> String {
        format!("{:0width$}", self.0, width = width)
    }

    /// Parse user input from the tick entry. Surrounding whitespace and
    /// leading zeros are accepted.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        trimmed.parse::<u64>().ok().map(Tick)
    }
}

impl From<u64> for Tick {
    fn from(tick: u64) -> Self {
        Tick(tick)
    }
}

impl From<Tick> for u64 {
    fn from(tick: Tick) -> Self {
        tick.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reactor identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactorName(pub String);

impl ReactorName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReactorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReactorName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Token key, unique within one assembly
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenKey(pub String);

impl TokenKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// The fixed set of surfaces the coordinator knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    DbReader,
    Timeline,
    TokenNetwork,
    NetworkFilter,
    ConflictList,
    PropertyInspector,
}

impl ViewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::DbReader => "db-reader",
            ViewKind::Timeline => "timeline",
            ViewKind::TokenNetwork => "token-network",
            ViewKind::NetworkFilter => "network-filter",
            ViewKind::ConflictList => "conflict-list",
            ViewKind::PropertyInspector => "property-inspector",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifier for a context action
///
/// Display labels are kept separately so renaming a menu entry never breaks
/// the binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub Cow<'static, str>);

impl ActionId {
    pub const OPEN_INSPECTOR: ActionId = ActionId(Cow::Borrowed("open-inspector"));
    pub const HIGHLIGHT_IN_NETWORK: ActionId = ActionId(Cow::Borrowed("highlight-in-network"));
    pub const JUMP_TO_TICK: ActionId = ActionId(Cow::Borrowed("jump-to-tick"));

    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque key identifying a listener source
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKey {
    /// Every update regardless of which reactor it concerns
    All,
    /// Updates concerning one reactor
    Reactor(ReactorName),
}

impl SourceKey {
    pub fn reactor(name: impl Into<String>) -> Self {
        SourceKey::Reactor(ReactorName::new(name))
    }
}

impl Default for SourceKey {
    fn default() -> Self {
        SourceKey::All
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKey::All => f.write_str("all"),
            SourceKey::Reactor(name) => write!(f, "reactor:{}", name),
        }
    }
}
