//! Entity model shared by every view: tokens, assemblies, cores and the
//! per-tick entity set.

use crate::error::{ActionError, ActionResult, ModelError};
use execmon_types::{ReactorName, Tick, TokenKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// An addressable entity within an assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub key: TokenKey,

    /// Predicate name shown in the timeline and inspector
    #[serde(default)]
    pub predicate: String,

    /// Object (timeline) the token is placed on
    #[serde(default)]
    pub timeline: String,

    /// Keys of related tokens in the same assembly
    #[serde(default)]
    pub relations: Vec<TokenKey>,

    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Token {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: TokenKey::new(key),
            predicate: String::new(),
            timeline: String::new(),
            relations: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_predicate(mut self, timeline: &str, predicate: &str) -> Self {
        self.timeline = timeline.to_string();
        self.predicate = predicate.to_string();
        self
    }

    pub fn related_to(mut self, key: impl Into<String>) -> Self {
        self.relations.push(TokenKey::new(key));
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }
}

/// A planning conflict recorded for a reactor at a tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub tick: Tick,
    pub reactor: ReactorName,
    #[serde(default)]
    pub token: Option<TokenKey>,
    pub message: String,
}

/// Container of the tokens belonging to one core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    reactor_name: ReactorName,
    tokens: BTreeMap<TokenKey, Token>,
}

impl Assembly {
    pub fn new(reactor_name: impl Into<ReactorName>) -> Self {
        Self {
            reactor_name: reactor_name.into(),
            tokens: BTreeMap::new(),
        }
    }

    /// Build an assembly from tokens. A later token with the same key
    /// replaces the earlier one.
    pub fn with_tokens(
        reactor_name: impl Into<ReactorName>,
        tokens: impl IntoIterator<Item = Token>,
    ) -> Self {
        let mut assembly = Self::new(reactor_name);
        for token in tokens {
            assembly.insert(token);
        }
        assembly
    }

    pub fn reactor_name(&self) -> &ReactorName {
        &self.reactor_name
    }

    pub fn insert(&mut self, token: Token) -> Option<Token> {
        self.tokens.insert(token.key.clone(), token)
    }

    /// Look up a token, failing with `UnknownToken` when the key is absent
    pub fn token(&self, key: &TokenKey) -> ActionResult<&Token> {
        self.tokens
            .get(key)
            .ok_or_else(|| ActionError::UnknownToken {
                reactor: self.reactor_name.clone(),
                key: key.clone(),
            })
    }

    pub fn get(&self, key: &TokenKey) -> Option<&Token> {
        self.tokens.get(key)
    }

    pub fn contains(&self, key: &TokenKey) -> bool {
        self.tokens.contains_key(key)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Snapshot of one reactor's assembly at a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Core {
    pub reactor_name: ReactorName,
    pub tick: Tick,
    pub assembly: Assembly,
    pub conflicts: Vec<Conflict>,
}

impl Core {
    pub fn new(tick: Tick, assembly: Assembly) -> Self {
        Self {
            reactor_name: assembly.reactor_name().clone(),
            tick,
            assembly,
            conflicts: Vec::new(),
        }
    }

    pub fn with_conflicts(mut self, conflicts: Vec<Conflict>) -> Self {
        self.conflicts = conflicts;
        self
    }
}

/// Mapping of reactor name to core delivered to views as one update
///
/// Sets are assembled once per tick query and then shared behind an `Arc`;
/// nothing mutates a published set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySet {
    tick: Tick,
    cores: BTreeMap<ReactorName, Arc<Core>>,
    active: Option<ReactorName>,
}

impl EntitySet {
    pub fn new(tick: Tick) -> Self {
        Self {
            tick,
            cores: BTreeMap::new(),
            active: None,
        }
    }

    /// Build a set keyed by each core's own reactor name
    pub fn from_cores(tick: Tick, cores: impl IntoIterator<Item = Arc<Core>>) -> Self {
        let mut set = Self::new(tick);
        for core in cores {
            set.cores.insert(core.reactor_name.clone(), core);
        }
        set
    }

    /// The set containing only `core`, with its reactor active
    pub fn single(core: Arc<Core>) -> Self {
        let name = core.reactor_name.clone();
        let mut set = Self::from_cores(core.tick, [core]);
        set.active = Some(name);
        set
    }

    /// Insert a core under an explicit key, which must match the core's
    /// reactor name.
    pub fn insert(&mut self, key: ReactorName, core: Arc<Core>) -> Result<(), ModelError> {
        if key != core.reactor_name {
            return Err(ModelError::ReactorMismatch {
                key,
                core: core.reactor_name.clone(),
            });
        }
        self.cores.insert(key, core);
        Ok(())
    }

    pub fn with_active(mut self, active: Option<ReactorName>) -> Self {
        self.active = active;
        self
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn active(&self) -> Option<&ReactorName> {
        self.active.as_ref()
    }

    pub fn get(&self, reactor: &ReactorName) -> Option<&Arc<Core>> {
        self.cores.get(reactor)
    }

    pub fn cores(&self) -> impl Iterator<Item = (&ReactorName, &Arc<Core>)> {
        self.cores.iter()
    }

    pub fn reactor_names(&self) -> impl Iterator<Item = &ReactorName> {
        self.cores.keys()
    }

    /// Conflicts of every core, in reactor order
    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.cores.values().flat_map(|core| core.conflicts.iter())
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }
}
