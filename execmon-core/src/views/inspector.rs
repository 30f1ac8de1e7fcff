//! Token property windows.

use crate::error::ActionResult;
use crate::model::{Core, Token};
use execmon_types::{ReactorName, Tick, TokenKey};
use std::fmt::Write;
use std::sync::Arc;

/// Property window bound to one token of one assembly
#[derive(Debug, Clone)]
pub struct PropertyInspector {
    core: Arc<Core>,
    key: TokenKey,
}

impl PropertyInspector {
    /// Bind to `key` in `core`'s assembly, failing with `UnknownToken` when
    /// the assembly has no such token
    pub fn open(core: Arc<Core>, key: &TokenKey) -> ActionResult<Self> {
        core.assembly.token(key)?;
        Ok(Self {
            core,
            key: key.clone(),
        })
    }

    pub fn reactor(&self) -> &ReactorName {
        &self.core.reactor_name
    }

    pub fn tick(&self) -> Tick {
        self.core.tick
    }

    pub fn key(&self) -> &TokenKey {
        &self.key
    }

    pub fn token(&self) -> Option<&Token> {
        self.core.assembly.get(&self.key)
    }

    pub fn render(&self, tick_width: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} in {} @ {}",
            self.key,
            self.core.reactor_name,
            self.core.tick.format(tick_width)
        );
        let Some(token) = self.token() else {
            return out;
        };
        let _ = writeln!(out, "  timeline:  {}", token.timeline);
        let _ = writeln!(out, "  predicate: {}", token.predicate);
        if !token.relations.is_empty() {
            let relations: Vec<&str> = token.relations.iter().map(|k| k.as_str()).collect();
            let _ = writeln!(out, "  relations: {}", relations.join(", "));
        }
        for (name, value) in &token.attributes {
            let _ = writeln!(out, "  {} = {}", name, value);
        }
        out
    }
}

/// Opens property inspectors and keeps the ones still showing
#[derive(Debug, Default)]
pub struct InspectorFactory {
    open: Vec<PropertyInspector>,
}

impl InspectorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, core: Arc<Core>, key: &TokenKey) -> ActionResult<&PropertyInspector> {
        let inspector = PropertyInspector::open(core, key)?;
        tracing::info!(
            reactor = %inspector.reactor(),
            token = %key,
            "property inspector opened"
        );
        self.open.push(inspector);
        Ok(&self.open[self.open.len() - 1])
    }

    pub fn inspectors(&self) -> &[PropertyInspector] {
        &self.open
    }

    pub fn latest(&self) -> Option<&PropertyInspector> {
        self.open.last()
    }

    pub fn close_all(&mut self) {
        self.open.clear();
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}
